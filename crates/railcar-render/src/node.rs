//! The layout algebra: pure bottom-up computation of box extents.
//!
//! Every node carries `width`/`height`/`baseline` in grid units and
//! guarantees exactly one left entry point and one right exit point at
//! `y = baseline`. Widths are always even so any node can be centered
//! inside a stack with an integer offset; that invariant is what keeps
//! every rail on the grid with no fractional coordinates.

use crate::canvas::BoxClass;
use crate::svg::rule_anchor;
use crate::text::{TextMeasurer, TextStyle};
use crate::{Error, Result};
use railcar_core::{Expr, Grammar, RailcarConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    /// Horizontal extent in grid units; always even.
    pub width: i32,
    pub height: i32,
    /// Y offset of the main line within this node's own box.
    pub baseline: i32,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeKind {
    TextBox {
        text: String,
        class: BoxClass,
        /// Anchor of the referenced rule, when this is a nonterminal whose
        /// rule is defined in the same grammar.
        href: Option<String>,
    },
    Sequence {
        children: Vec<LayoutNode>,
    },
    Stack {
        children: Vec<LayoutNode>,
    },
    Bypass {
        child: Box<LayoutNode>,
    },
    Loop {
        child: Box<LayoutNode>,
    },
}

pub(crate) fn round_up_even(n: i32) -> i32 {
    if n % 2 == 0 { n } else { n + 1 }
}

/// Lays out a terminal/nonterminal box: measured content width plus a 1-unit
/// rail stub each side and 1 unit of padding, rounded up to the next even
/// width. The box is 2 units tall with the main line through its middle.
pub fn text_box(
    text: &str,
    class: BoxClass,
    href: Option<String>,
    config: &RailcarConfig,
    measurer: &dyn TextMeasurer,
) -> Result<LayoutNode> {
    let style = TextStyle {
        font_family: Some(config.font_family.clone()),
        font_size: config.font_size,
        font_weight: None,
    };
    let metrics = measurer.measure(text, &style)?;
    let content_units = (metrics.width / config.scale).ceil().max(0.0) as i32;
    Ok(LayoutNode {
        width: round_up_even(content_units + 3),
        height: 2,
        baseline: 1,
        kind: NodeKind::TextBox {
            text: text.to_string(),
            class,
            href,
        },
    })
}

/// Horizontal composition: children share one main line, pinned to the
/// deepest child baseline, with a 2-unit rail in each gap.
pub fn sequence(children: Vec<LayoutNode>) -> Result<LayoutNode> {
    if children.is_empty() {
        return Err(Error::InvalidModel {
            message: "sequence requires at least one child".to_string(),
        });
    }
    let width = children.iter().map(|c| c.width).sum::<i32>() + 2 * (children.len() as i32 - 1);
    let height = children.iter().map(|c| c.height).max().unwrap_or(0);
    let baseline = children.iter().map(|c| c.baseline).max().unwrap_or(0);
    Ok(LayoutNode {
        width,
        height,
        baseline,
        kind: NodeKind::Sequence { children },
    })
}

/// Vertical alternation: children stacked top to bottom with a 1-unit gap,
/// 2 units of routing margin each side, main line through the first child.
pub fn stack(children: Vec<LayoutNode>) -> Result<LayoutNode> {
    if children.is_empty() {
        return Err(Error::InvalidModel {
            message: "stack requires at least one child".to_string(),
        });
    }
    let max_child_width = round_up_even(children.iter().map(|c| c.width).max().unwrap_or(0));
    let height = children.iter().map(|c| c.height).sum::<i32>() + children.len() as i32;
    let baseline = children[0].baseline;
    Ok(LayoutNode {
        width: max_child_width + 4,
        height,
        baseline,
        kind: NodeKind::Stack { children },
    })
}

/// Optional content: the child is pushed down one unit and a skip lane is
/// routed across the top.
pub fn bypass(child: LayoutNode) -> LayoutNode {
    LayoutNode {
        width: round_up_even(child.width + 4),
        height: child.height + 1,
        baseline: child.baseline + 1,
        kind: NodeKind::Bypass {
            child: Box::new(child),
        },
    }
}

/// Repetition: identical extents to [`bypass`]; only the rail's traversal
/// direction and class differ.
pub fn loop_node(child: LayoutNode) -> LayoutNode {
    LayoutNode {
        width: round_up_even(child.width + 4),
        height: child.height + 1,
        baseline: child.baseline + 1,
        kind: NodeKind::Loop {
            child: Box::new(child),
        },
    }
}

/// Builds the layout tree for one grammar expression, bottom-up.
pub fn layout_expr(
    expr: &Expr,
    grammar: &Grammar,
    config: &RailcarConfig,
    measurer: &dyn TextMeasurer,
) -> Result<LayoutNode> {
    match expr {
        Expr::Terminal { text } => text_box(text, BoxClass::Terminal, None, config, measurer),
        Expr::NonTerminal { text } => {
            let href = grammar.defines(text).then(|| rule_anchor(text));
            text_box(text, BoxClass::NonTerminal, href, config, measurer)
        }
        Expr::Sequence { children } => {
            let laid = children
                .iter()
                .map(|c| layout_expr(c, grammar, config, measurer))
                .collect::<Result<Vec<_>>>()?;
            sequence(laid)
        }
        Expr::Stack { children } => {
            let laid = children
                .iter()
                .map(|c| layout_expr(c, grammar, config, measurer))
                .collect::<Result<Vec<_>>>()?;
            stack(laid)
        }
        Expr::Bypass { child } => Ok(bypass(layout_expr(child, grammar, config, measurer)?)),
        Expr::Loop { child } => Ok(loop_node(layout_expr(child, grammar, config, measurer)?)),
        Expr::Error { message } => text_box(message, BoxClass::Error, None, config, measurer),
    }
}
