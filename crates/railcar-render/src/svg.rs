//! SVG serialization of a rendered canvas.
//!
//! This is the single place where grid units become device units: every
//! coordinate is multiplied by the configured scale as it is written out.
//! Rails keep their advisory classes so a stylesheet can differentiate
//! track/through/bypass/loop without the geometry caring.

use crate::canvas::{Canvas, MarkerKind, Primitive, TextAnchor};
use crate::path::PathCommand;
use crate::Result;
use crate::render::{GrammarLayout, render_canvas};
use railcar_core::RailcarConfig;
use std::fmt::Write as _;

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    /// Adds extra space around the computed viewBox, in device pixels.
    pub viewbox_padding: f64,
    /// Optional id for the root `<svg>` element.
    pub diagram_id: Option<String>,
    /// When true, emit rail diagnostic labels as `data-rail` attributes.
    pub include_rail_labels: bool,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            viewbox_padding: 8.0,
            diagram_id: None,
            include_rail_labels: false,
        }
    }
}

/// Anchor id for a rule, shared by the rule's group and the nonterminal
/// boxes that reference it. Conservative tokens only, so multiple diagrams
/// can be inlined in one document without id collisions.
pub fn rule_anchor(raw: &str) -> String {
    format!("railcar-rule-{}", sanitize_id_token(raw))
}

fn sanitize_id_token(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "untitled".to_string();
    }
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.';
        out.push(if ok { ch } else { '-' });
    }
    while out.contains("--") {
        out = out.replace("--", "-");
    }
    let out = out.trim_matches('-');
    if out.is_empty() {
        return "untitled".to_string();
    }
    out.to_string()
}

/// Renders a laid-out grammar to a standalone SVG document string.
pub fn render_svg(
    layout: &GrammarLayout,
    config: &RailcarConfig,
    options: &SvgRenderOptions,
) -> Result<String> {
    let canvas = render_canvas(layout)?;
    Ok(serialize_canvas(&canvas, layout, config, options))
}

fn serialize_canvas(
    canvas: &Canvas,
    layout: &GrammarLayout,
    config: &RailcarConfig,
    options: &SvgRenderOptions,
) -> String {
    let scale = config.scale;
    let pad = options.viewbox_padding.max(0.0);
    let vb_w = (layout.width as f64 * scale + pad * 2.0).max(1.0);
    let vb_h = (layout.height as f64 * scale + pad * 2.0).max(1.0);

    let mut out = String::new();
    out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg""#);
    if let Some(id) = &options.diagram_id {
        let _ = write!(&mut out, r#" id="{}""#, xml_escape(id));
    }
    let _ = writeln!(
        &mut out,
        r#" class="railcar" viewBox="{} {} {} {}">"#,
        fmt(-pad),
        fmt(-pad),
        fmt(vb_w),
        fmt(vb_h)
    );

    let _ = writeln!(
        &mut out,
        r#"<style>
.rail-track, .rail-through, .rail-bypass, .rail-loop {{ fill: none; stroke: #1f2937; stroke-width: 2; stroke-linecap: round; }}
.box-terminal {{ fill: #eef2ff; stroke: #3730a3; stroke-width: 1.5; }}
.box-nonterminal {{ fill: #ffffff; stroke: #1f2937; stroke-width: 1.5; }}
.box-error {{ fill: #fef2f2; stroke: #b91c1c; stroke-width: 1.5; stroke-dasharray: 4 2; }}
.label-terminal, .label-nonterminal, .label-error {{ fill: #111827; font-family: {ff}; font-size: {fs}px; dominant-baseline: central; }}
.label-error {{ fill: #b91c1c; }}
.label-nonterminal {{ font-style: italic; }}
.label-heading {{ fill: #111827; font-family: {ff}; font-size: {hfs}px; font-weight: bold; dominant-baseline: central; }}
.label-title {{ fill: #111827; font-family: {ff}; font-size: {tfs}px; font-weight: bold; dominant-baseline: central; }}
.marker-start, .marker-end {{ fill: #1f2937; }}
</style>"#,
        ff = xml_escape(&config.font_family),
        fs = fmt(config.font_size),
        hfs = fmt(config.heading_font_size),
        tfs = fmt(config.title_font_size),
    );

    write_primitives(&mut out, canvas.primitives(), scale, config, options);
    out.push_str("</svg>\n");
    out
}

fn write_primitives(
    out: &mut String,
    prims: &[Primitive],
    scale: f64,
    config: &RailcarConfig,
    options: &SvgRenderOptions,
) {
    for prim in prims {
        match prim {
            Primitive::Rail { path } => {
                let mut d = String::new();
                for cmd in &path.commands {
                    if !d.is_empty() {
                        d.push(' ');
                    }
                    match *cmd {
                        PathCommand::MoveTo { x, y } => {
                            let _ = write!(&mut d, "M {} {}", fmt(x as f64 * scale), fmt(y as f64 * scale));
                        }
                        PathCommand::LineTo { x, y } => {
                            let _ = write!(&mut d, "L {} {}", fmt(x as f64 * scale), fmt(y as f64 * scale));
                        }
                        PathCommand::QuarterTo { cx, cy, x, y } => {
                            let _ = write!(
                                &mut d,
                                "Q {} {} {} {}",
                                fmt(cx as f64 * scale),
                                fmt(cy as f64 * scale),
                                fmt(x as f64 * scale),
                                fmt(y as f64 * scale)
                            );
                        }
                    }
                }
                let _ = write!(out, r#"<path class="{}" d="{}""#, path.class.css_class(), d);
                if options.include_rail_labels
                    && let Some(label) = &path.label
                {
                    let _ = write!(out, r#" data-rail="{}""#, xml_escape(label));
                }
                out.push_str(" />\n");
            }
            Primitive::RoundedRect {
                x,
                y,
                width,
                height,
                class,
            } => {
                let h_px = *height as f64 * scale;
                let rx = config.corner_radius.min(h_px / 2.0);
                let _ = writeln!(
                    out,
                    r#"<rect class="{}" x="{}" y="{}" width="{}" height="{}" rx="{}" />"#,
                    class.css_class(),
                    fmt(*x as f64 * scale),
                    fmt(*y as f64 * scale),
                    fmt(*width as f64 * scale),
                    fmt(h_px),
                    fmt(rx)
                );
            }
            Primitive::Label {
                x,
                y,
                text,
                class,
                anchor,
                href,
            } => {
                if let Some(href) = href {
                    let _ = write!(out, r##"<a href="#{}">"##, xml_escape(href));
                }
                let anchor_attr = match anchor {
                    TextAnchor::Start => "start",
                    TextAnchor::Middle => "middle",
                };
                let _ = writeln!(
                    out,
                    r#"<text class="{}" x="{}" y="{}" text-anchor="{}">{}</text>"#,
                    class.css_class(),
                    fmt(*x as f64 * scale),
                    fmt(*y as f64 * scale),
                    anchor_attr,
                    xml_escape(text)
                );
                if href.is_some() {
                    out.push_str("</a>\n");
                }
            }
            Primitive::Marker { x, y, kind } => {
                let class = match kind {
                    MarkerKind::Start => "marker-start",
                    MarkerKind::End => "marker-end",
                };
                let _ = writeln!(
                    out,
                    r#"<circle class="{}" cx="{}" cy="{}" r="{}" />"#,
                    class,
                    fmt(*x as f64 * scale),
                    fmt(*y as f64 * scale),
                    fmt(scale * 0.3)
                );
            }
            Primitive::Group { dx, dy, id, children } => {
                out.push_str("<g");
                if let Some(id) = id {
                    let _ = write!(out, r#" id="{}""#, xml_escape(id));
                }
                if *dx != 0 || *dy != 0 {
                    let _ = write!(
                        out,
                        r#" transform="translate({}, {})""#,
                        fmt(*dx as f64 * scale),
                        fmt(*dy as f64 * scale)
                    );
                }
                out.push_str(">\n");
                write_primitives(out, children, scale, config, options);
                out.push_str("</g>\n");
            }
        }
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut r = (v * 1000.0).round() / 1000.0;
    if r.abs() < 0.0005 {
        r = 0.0;
    }
    let mut s = format!("{r:.3}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" { "0".to_string() } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render;
    use crate::text::DeterministicTextMeasurer;
    use railcar_core::{Engine, ParseOptions};

    fn layout_of(text: &str) -> (GrammarLayout, RailcarConfig) {
        let engine = Engine::new();
        let parsed = engine
            .parse_grammar_sync(text, ParseOptions::strict())
            .unwrap()
            .unwrap();
        let measurer = DeterministicTextMeasurer::default();
        let layout = render::layout_grammar(&parsed.grammar, &parsed.effective_config, &measurer)
            .unwrap();
        (layout, parsed.effective_config)
    }

    #[test]
    fn rule_anchor_sanitizes_raw_names() {
        assert_eq!(rule_anchor("select-stmt"), "railcar-rule-select-stmt");
        assert_eq!(rule_anchor("weird name!"), "railcar-rule-weird-name");
        assert_eq!(rule_anchor("  "), "railcar-rule-untitled");
        assert_eq!(rule_anchor("--a--"), "railcar-rule-a");
    }

    #[test]
    fn svg_contains_viewbox_and_style() {
        let (layout, config) = layout_of("r: \"X\"");
        let svg = render_svg(&layout, &config, &SvgRenderOptions::default()).unwrap();
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.contains("viewBox=\"-8 -8 "));
        assert!(svg.contains(".rail-track"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn svg_quarter_turns_are_quadratic_beziers() {
        let (layout, config) = layout_of("r: stack(\"A\", \"B\")");
        let svg = render_svg(&layout, &config, &SvgRenderOptions::default()).unwrap();
        assert!(svg.contains("Q "), "stack connectors must emit arcs:\n{svg}");
    }

    #[test]
    fn svg_links_nonterminals_to_rule_groups() {
        let (layout, config) = layout_of("a: <b>\nb: \"B\"");
        let svg = render_svg(&layout, &config, &SvgRenderOptions::default()).unwrap();
        assert!(svg.contains(r##"<a href="#railcar-rule-b">"##));
        assert!(svg.contains(r#"<g id="railcar-rule-b""#));
    }

    #[test]
    fn svg_rail_labels_are_opt_in() {
        let (layout, config) = layout_of("r: stack(\"A\", \"B\")");
        let plain = render_svg(&layout, &config, &SvgRenderOptions::default()).unwrap();
        assert!(!plain.contains("data-rail"));
        let labeled = render_svg(
            &layout,
            &config,
            &SvgRenderOptions {
                include_rail_labels: true,
                ..SvgRenderOptions::default()
            },
        )
        .unwrap();
        assert!(labeled.contains(r#"data-rail="alt-1-left""#));
    }

    #[test]
    fn svg_shows_error_placeholder_for_failed_lenient_rules() {
        let engine = Engine::new();
        let parsed = engine
            .parse_grammar_sync("good: \"A\"\nbad: seq(\"A\",\n", ParseOptions::lenient())
            .unwrap()
            .unwrap();
        let measurer = DeterministicTextMeasurer::default();
        let layout = render::layout_grammar(&parsed.grammar, &parsed.effective_config, &measurer)
            .unwrap();
        assert_eq!(layout.rules.len(), 2);
        let svg = render_svg(&layout, &parsed.effective_config, &SvgRenderOptions::default())
            .unwrap();
        // the failed rule stays visible: its heading plus an error-styled box
        assert!(svg.contains("bad:"));
        assert!(svg.contains(r#"class="box-error""#));
        assert!(svg.contains(r#"class="label-error""#));
    }

    #[test]
    fn svg_escapes_label_text() {
        let (layout, config) = layout_of("r: \"<not-a-tag>\"");
        let svg = render_svg(&layout, &config, &SvgRenderOptions::default()).unwrap();
        assert!(svg.contains("&lt;not-a-tag&gt;"));
        assert!(!svg.contains("<not-a-tag>"));
    }

    #[test]
    fn svg_render_is_deterministic() {
        let (layout, config) = layout_of("r: seq(\"A\", opt(\"B\"), loop(\"C\"))");
        let a = render_svg(&layout, &config, &SvgRenderOptions::default()).unwrap();
        let b = render_svg(&layout, &config, &SvgRenderOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fmt_trims_trailing_zeros() {
        assert_eq!(fmt(16.0), "16");
        assert_eq!(fmt(1.5), "1.5");
        assert_eq!(fmt(-0.0001), "0");
        assert_eq!(fmt(2.0 / 3.0), "0.667");
    }
}
