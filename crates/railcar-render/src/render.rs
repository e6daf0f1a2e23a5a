//! Recursive diagram rendering: one depth-first pass over the layout tree,
//! drawing each node's own shapes and rails into its local frame and placing
//! children in translated sub-frames.
//!
//! All routing leans on the turn compensation rule from `path.rs`: a
//! turn/run/turn connector covering vertical distance `d` and horizontal
//! distance `h` runs `d - 2` and `h - 2` between its quarter turns.

use crate::canvas::{BoxClass, Canvas, LabelClass, MarkerKind, TextAnchor};
use crate::node::{LayoutNode, NodeKind, layout_expr, round_up_even};
use crate::path::{Heading, PathBuilder, RailClass};
use crate::svg::rule_anchor;
use crate::text::{TextMeasurer, TextStyle};
use crate::{Error, Result};
use railcar_core::{Grammar, RailcarConfig};
use serde::{Deserialize, Serialize};

/// Height of the rule-name heading band, grid units.
const HEADING_ROWS: i32 = 2;
/// Gap between the heading band and the rule's diagram.
const HEADING_GAP: i32 = 1;
/// Lead-in/lead-out rail length from the start/end markers to the root node.
const RULE_LEAD: i32 = 2;

/// One rule's placed diagram: the laid-out root plus the rule's frame within
/// the whole grammar diagram. All coordinates in grid units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleLayout {
    pub name: String,
    pub anchor: String,
    /// Vertical origin of this rule's frame.
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub root: LayoutNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarLayout {
    pub title: Option<String>,
    pub rules: Vec<RuleLayout>,
    /// Total diagram extent in grid units.
    pub width: i32,
    pub height: i32,
}

fn text_units(
    text: &str,
    font_size: f64,
    config: &RailcarConfig,
    measurer: &dyn TextMeasurer,
) -> Result<i32> {
    let style = TextStyle {
        font_family: Some(config.font_family.clone()),
        font_size,
        font_weight: None,
    };
    let metrics = measurer.measure(text, &style)?;
    Ok((metrics.width / config.scale).ceil().max(0.0) as i32)
}

/// Lays out every rule of a grammar, stacked vertically in rule order, each
/// with an independent layout.
pub fn layout_grammar(
    grammar: &Grammar,
    config: &RailcarConfig,
    measurer: &dyn TextMeasurer,
) -> Result<GrammarLayout> {
    let gap = config.rule_gap as i32;
    let mut width: i32 = 0;
    let mut y: i32 = 0;

    if let Some(title) = &grammar.title {
        width = width.max(text_units(title, config.title_font_size, config, measurer)?);
        y = HEADING_ROWS + gap;
    }

    let mut rules = Vec::with_capacity(grammar.rules.len());
    for (name, expr) in &grammar.rules {
        let root = layout_expr(expr, grammar, config, measurer)?;
        let heading = format!("{name}:");
        let heading_units = text_units(&heading, config.heading_font_size, config, measurer)?;
        let rule_width = (root.width + 2 * RULE_LEAD).max(heading_units);
        let rule_height = HEADING_ROWS + HEADING_GAP + root.height;
        width = width.max(rule_width);
        rules.push(RuleLayout {
            name: name.clone(),
            anchor: rule_anchor(name),
            y,
            width: rule_width,
            height: rule_height,
            root,
        });
        y += rule_height + gap;
    }

    let height = if rules.is_empty() {
        if grammar.title.is_some() { HEADING_ROWS } else { 0 }
    } else {
        y - gap
    };

    tracing::debug!(rules = rules.len(), width, height, "grammar layout computed");
    Ok(GrammarLayout {
        title: grammar.title.clone(),
        rules,
        width,
        height,
    })
}

/// Renders a laid-out grammar into a fresh canvas of drawing primitives.
///
/// Rendering is a pure function of the layout: the same layout rendered
/// twice yields identical canvases.
pub fn render_canvas(layout: &GrammarLayout) -> Result<Canvas> {
    let mut canvas = Canvas::new();
    if let Some(title) = &layout.title {
        canvas.push_label(
            layout.width / 2,
            1,
            title.clone(),
            LabelClass::Title,
            TextAnchor::Middle,
            None,
        );
    }
    for rule in &layout.rules {
        render_rule(rule, &mut canvas)?;
    }
    Ok(canvas)
}

fn render_rule(rule: &RuleLayout, canvas: &mut Canvas) -> Result<()> {
    canvas.group(0, rule.y, Some(rule.anchor.clone()), |c| {
        c.push_label(
            0,
            1,
            format!("{}:", rule.name),
            LabelClass::Heading,
            TextAnchor::Start,
            None,
        );
        c.group(0, HEADING_ROWS + HEADING_GAP, None, |frame| {
            let b = rule.root.baseline;
            let exit_x = RULE_LEAD + rule.root.width + RULE_LEAD;
            frame.push_marker(0, b, MarkerKind::Start);

            let mut pb = PathBuilder::new();
            pb.start(0, b, Heading::East)?;
            pb.forward(RULE_LEAD)?;
            pb.finish(frame, RailClass::Track, Some("lead-in"))?;

            frame.group(RULE_LEAD, 0, None, |inner| render_node(&rule.root, inner))?;

            pb.start(RULE_LEAD + rule.root.width, b, Heading::East)?;
            pb.forward(RULE_LEAD)?;
            pb.finish(frame, RailClass::Track, Some("lead-out"))?;

            frame.push_marker(exit_x, b, MarkerKind::End);
            Ok(())
        })
    })
}

/// Draws one layout node into a canvas bound to the node's local origin,
/// recursing into children via translated sub-frames.
pub fn render_node(node: &LayoutNode, canvas: &mut Canvas) -> Result<()> {
    match &node.kind {
        NodeKind::TextBox { text, class, href } => render_text_box(node, text, *class, href, canvas),
        NodeKind::Sequence { children } => render_sequence(node, children, canvas),
        NodeKind::Stack { children } => render_stack(node, children, canvas),
        NodeKind::Bypass { child } => render_detour(node, child, RailClass::Bypass, canvas),
        NodeKind::Loop { child } => render_detour(node, child, RailClass::Loop, canvas),
    }
}

fn render_text_box(
    node: &LayoutNode,
    text: &str,
    class: BoxClass,
    href: &Option<String>,
    canvas: &mut Canvas,
) -> Result<()> {
    let mut pb = PathBuilder::new();
    pb.start(0, node.baseline, Heading::East)?;
    pb.forward(1)?;
    pb.finish(canvas, RailClass::Track, None)?;
    pb.start(node.width - 1, node.baseline, Heading::East)?;
    pb.forward(1)?;
    pb.finish(canvas, RailClass::Track, None)?;

    canvas.push_rounded_rect(1, 0, node.width - 2, node.height, class);
    let label_class = match class {
        BoxClass::Terminal => LabelClass::Terminal,
        BoxClass::NonTerminal => LabelClass::NonTerminal,
        BoxClass::Error => LabelClass::Error,
    };
    canvas.push_label(
        node.width / 2,
        node.baseline,
        text,
        label_class,
        TextAnchor::Middle,
        href.clone(),
    );
    Ok(())
}

fn render_sequence(node: &LayoutNode, children: &[LayoutNode], canvas: &mut Canvas) -> Result<()> {
    let b = node.baseline;
    let mut x = 0;
    let mut pb = PathBuilder::new();
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            pb.start(x, b, Heading::East)?;
            pb.forward(2)?;
            pb.finish(canvas, RailClass::Track, None)?;
            x += 2;
        }
        // align the child's main line onto the sequence baseline
        canvas.group(x, b - child.baseline, None, |c| render_node(child, c))?;
        x += child.width;
    }
    Ok(())
}

fn render_stack(node: &LayoutNode, children: &[LayoutNode], canvas: &mut Canvas) -> Result<()> {
    let b = node.baseline;
    let max_child_width = round_up_even(children.iter().map(|c| c.width).max().unwrap_or(0));
    let mut y = 0;
    let mut pb = PathBuilder::new();

    for (i, child) in children.iter().enumerate() {
        let cx = 2 + (max_child_width - child.width) / 2;
        let right = cx + child.width;
        if i == 0 {
            // first alternative sits on the main line; straight rails suffice
            pb.start(0, b, Heading::East)?;
            pb.forward(cx)?;
            pb.finish(canvas, RailClass::Track, None)?;
            pb.start(right, b, Heading::East)?;
            pb.forward(node.width - right)?;
            pb.finish(canvas, RailClass::Track, None)?;
        } else {
            // two-turn connectors down to the alternative's own baseline
            let d = y + child.baseline - b;
            let left_label = format!("alt-{i}-left");
            pb.start(0, b, Heading::East)?;
            pb.turn_right()?;
            pb.forward(d - 2)?;
            pb.turn_left()?;
            pb.forward(cx - 2)?;
            pb.finish(canvas, RailClass::Track, Some(&left_label))?;

            let right_label = format!("alt-{i}-right");
            pb.start(node.width, b, Heading::West)?;
            pb.turn_left()?;
            pb.forward(d - 2)?;
            pb.turn_right()?;
            pb.forward(node.width - right - 2)?;
            pb.finish(canvas, RailClass::Track, Some(&right_label))?;
        }
        canvas.group(cx, y, None, |c| render_node(child, c))?;
        y += child.height + 1;
    }
    Ok(())
}

/// Shared geometry of bypass and loop: a centered child one row down plus a
/// rectangular detour lane across the top. Only the rail class and the
/// traversal direction differ; the drawn shape is identical.
fn render_detour(
    node: &LayoutNode,
    child: &LayoutNode,
    class: RailClass,
    canvas: &mut Canvas,
) -> Result<()> {
    let b = node.baseline;
    let cx = (node.width - child.width) / 2;
    let right = cx + child.width;
    let mut pb = PathBuilder::new();

    // through path, as a one-child sequence
    pb.start(0, b, Heading::East)?;
    pb.forward(cx)?;
    pb.finish(canvas, RailClass::Through, None)?;
    pb.start(right, b, Heading::East)?;
    pb.forward(node.width - right)?;
    pb.finish(canvas, RailClass::Through, None)?;

    match class {
        RailClass::Bypass => {
            // forward skip lane, left entry to right exit
            pb.start(0, b, Heading::East)?;
            pb.turn_left()?;
            pb.forward(b - 2)?;
            pb.turn_right()?;
            pb.forward(node.width - 4)?;
            pb.turn_right()?;
            pb.forward(b - 2)?;
            pb.turn_left()?;
            pb.finish(canvas, class, None)?;
        }
        RailClass::Loop => {
            // repeat lane walks the same rectangle from the exit back to the
            // entry, signaling re-entry to direction-aware styling
            pb.start(node.width, b, Heading::West)?;
            pb.turn_right()?;
            pb.forward(b - 2)?;
            pb.turn_left()?;
            pb.forward(node.width - 4)?;
            pb.turn_left()?;
            pb.forward(b - 2)?;
            pb.turn_right()?;
            pb.finish(canvas, class, None)?;
        }
        _ => {
            return Err(Error::InvalidModel {
                message: "detour rail must be bypass or loop".to_string(),
            });
        }
    }

    canvas.group(cx, 1, None, |c| render_node(child, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Primitive;
    use crate::node::{sequence, stack, text_box};
    use crate::path::PathCommand;
    use crate::text::{DeterministicTextMeasurer, TextMetrics};

    fn cfg() -> RailcarConfig {
        RailcarConfig::default()
    }

    fn term(text: &str) -> LayoutNode {
        text_box(
            text,
            BoxClass::Terminal,
            None,
            &cfg(),
            &DeterministicTextMeasurer::default(),
        )
        .unwrap()
    }

    fn endpoints(path: &crate::path::RailPath) -> ((i32, i32), (i32, i32)) {
        let Some(&PathCommand::MoveTo { x, y }) = path.commands.first() else {
            panic!("rail must begin with a move");
        };
        let end = match *path.commands.last().unwrap() {
            PathCommand::MoveTo { x, y } => (x, y),
            PathCommand::LineTo { x, y } => (x, y),
            PathCommand::QuarterTo { x, y, .. } => (x, y),
        };
        ((x, y), end)
    }

    #[test]
    fn sequence_gap_rails_are_straight_on_the_shared_baseline() {
        let node = sequence(vec![term("A"), term("LONGER"), term("B")]).unwrap();
        let mut canvas = Canvas::new();
        render_node(&node, &mut canvas).unwrap();

        // top-level rails of the sequence frame are the two gap rails
        let gap_rails: Vec<_> = canvas
            .primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Rail { path } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(gap_rails.len(), 2);
        for rail in gap_rails {
            let ((x0, y0), (x1, y1)) = endpoints(rail);
            assert_eq!(y0, node.baseline);
            assert_eq!(y1, node.baseline);
            assert_eq!(x1 - x0, 2);
            assert_eq!(rail.commands.len(), 2, "gap rail must be a single segment");
        }

        // children are shifted so their main lines coincide with the baseline
        for p in canvas.primitives() {
            if let Primitive::Group { dy, .. } = p {
                assert_eq!(node.baseline - 1, *dy, "text boxes all have baseline 1");
            }
        }
    }

    #[test]
    fn sequence_children_shift_to_the_deepest_baseline() {
        // bypass raises the child baseline to 2; the plain box stays at 1
        let shallow = term("B");
        let deep = crate::node::bypass(term("A"));
        assert_eq!((shallow.baseline, deep.baseline), (1, 2));
        let node = sequence(vec![shallow, deep]).unwrap();
        assert_eq!(node.baseline, 2);

        let mut canvas = Canvas::new();
        render_node(&node, &mut canvas).unwrap();
        let dys: Vec<i32> = canvas
            .primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Group { dy, .. } => Some(*dy),
                _ => None,
            })
            .collect();
        // the shallow child drops one row, the deep child sits at the frame top
        assert_eq!(dys, vec![1, 0]);
    }

    #[test]
    fn stack_rails_share_the_entry_and_exit_points() {
        let node = stack(vec![term("A"), term("BB"), term("CCC")]).unwrap();
        let mut canvas = Canvas::new();
        render_node(&node, &mut canvas).unwrap();

        // top-level rails of the stack frame; child frames carry their own
        // box stub rails
        let rails: Vec<_> = canvas
            .primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Rail { path } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(rails.len(), 2 * 3);
        let entry = (0, node.baseline);
        let exit = (node.width, node.baseline);
        let touches = |point: (i32, i32)| {
            rails
                .iter()
                .filter(|&&r| {
                    let (start, end) = endpoints(r);
                    start == point || end == point
                })
                .count()
        };
        assert_eq!(touches(entry), 3, "every alternative joins the entry point");
        assert_eq!(touches(exit), 3, "every alternative joins the exit point");
    }

    #[test]
    fn stack_branch_connectors_land_on_child_baselines() {
        let children = vec![term("A"), term("B")];
        let node = stack(children).unwrap();
        let NodeKind::Stack { children } = &node.kind else {
            unreachable!();
        };
        let mut canvas = Canvas::new();
        render_node(&node, &mut canvas).unwrap();

        // second child's frame
        let (cx, cy) = canvas
            .primitives()
            .iter()
            .filter_map(|p| match p {
                Primitive::Group { dx, dy, .. } => Some((*dx, *dy)),
                _ => None,
            })
            .nth(1)
            .unwrap();
        let child = &children[1];
        let child_baseline_y = cy + child.baseline;

        let rails = canvas.rails();
        let left = rails
            .iter()
            .copied()
            .find(|r| r.label.as_deref() == Some("alt-1-left"))
            .unwrap();
        let right = rails
            .iter()
            .copied()
            .find(|r| r.label.as_deref() == Some("alt-1-right"))
            .unwrap();

        let (_, left_end) = endpoints(left);
        assert_eq!(left_end, (cx, child_baseline_y));
        let (_, right_end) = endpoints(right);
        assert_eq!(right_end, (cx + child.width, child_baseline_y));

        let turns = |r: &crate::path::RailPath| {
            r.commands
                .iter()
                .filter(|c| matches!(c, PathCommand::QuarterTo { .. }))
                .count()
        };
        assert_eq!(turns(left), 2);
        assert_eq!(turns(right), 2);
    }

    #[test]
    fn bypass_lane_runs_left_to_right_and_loop_lane_right_to_left() {
        let bypass_node = crate::node::bypass(term("X"));
        let loop_node = crate::node::loop_node(term("X"));

        let lane = |node: &LayoutNode, class: RailClass| {
            let mut canvas = Canvas::new();
            render_node(node, &mut canvas).unwrap();
            canvas
                .rails()
                .into_iter()
                .find(|r| r.class == class)
                .map(endpoints)
                .unwrap()
        };

        let b = bypass_node.baseline;
        let (start, end) = lane(&bypass_node, RailClass::Bypass);
        assert_eq!(start, (0, b));
        assert_eq!(end, (bypass_node.width, b));

        let (start, end) = lane(&loop_node, RailClass::Loop);
        assert_eq!(start, (loop_node.width, b));
        assert_eq!(end, (0, b));
    }

    #[test]
    fn detour_through_path_is_tagged_through() {
        let node = crate::node::bypass(term("X"));
        let mut canvas = Canvas::new();
        render_node(&node, &mut canvas).unwrap();
        let through: Vec<_> = canvas
            .rails()
            .into_iter()
            .filter(|r| r.class == RailClass::Through)
            .collect();
        assert_eq!(through.len(), 2);
    }

    #[test]
    fn rendering_is_idempotent() {
        let engine = railcar_core::Engine::new();
        let parsed = engine
            .parse_grammar_sync(
                "r: seq(\"A\", stack(\"B\", opt(\"C\"), loop(<r>)))",
                railcar_core::ParseOptions::strict(),
            )
            .unwrap()
            .unwrap();
        let measurer = DeterministicTextMeasurer::default();
        let layout =
            layout_grammar(&parsed.grammar, &parsed.effective_config, &measurer).unwrap();
        let first = render_canvas(&layout).unwrap();
        let second = render_canvas(&layout).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rule_frames_carry_anchor_markers_and_leads() {
        let engine = railcar_core::Engine::new();
        let parsed = engine
            .parse_grammar_sync("my-rule: \"X\"", railcar_core::ParseOptions::strict())
            .unwrap()
            .unwrap();
        let measurer = DeterministicTextMeasurer::default();
        let layout =
            layout_grammar(&parsed.grammar, &parsed.effective_config, &measurer).unwrap();
        assert_eq!(layout.rules.len(), 1);
        let rule = &layout.rules[0];
        assert_eq!(rule.anchor, "railcar-rule-my-rule");
        assert_eq!(rule.width, rule.root.width + 4);
        assert_eq!(rule.height, rule.root.height + 3);

        let canvas = render_canvas(&layout).unwrap();
        let Primitive::Group { id, children, .. } = &canvas.primitives()[0] else {
            panic!("expected rule group");
        };
        assert_eq!(id.as_deref(), Some("railcar-rule-my-rule"));
        assert_eq!(count_markers(children), 2);
    }

    fn count_markers(prims: &[Primitive]) -> usize {
        prims
            .iter()
            .map(|p| match p {
                Primitive::Marker { .. } => 1,
                Primitive::Group { children, .. } => count_markers(children),
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn measurement_failure_propagates() {
        struct Failing;
        impl crate::text::TextMeasurer for Failing {
            fn measure(
                &self,
                _text: &str,
                _style: &crate::text::TextStyle,
            ) -> crate::Result<TextMetrics> {
                Err(Error::Measurement {
                    message: "no rendering context".to_string(),
                })
            }
        }
        let engine = railcar_core::Engine::new();
        let parsed = engine
            .parse_grammar_sync("r: \"X\"", railcar_core::ParseOptions::strict())
            .unwrap()
            .unwrap();
        let err =
            layout_grammar(&parsed.grammar, &parsed.effective_config, &Failing).unwrap_err();
        assert!(matches!(err, Error::Measurement { .. }));
    }
}
