#![forbid(unsafe_code)]

//! `railcar` is a headless railroad (syntax) diagram generator.
//!
//! A small declarative grammar DSL is parsed into an expression tree of five
//! combinators (terminal/nonterminal boxes, sequence, stack, bypass, loop),
//! laid out on an integer grid and rendered to SVG.
//!
//! # Features
//!
//! - `render`: enable layout + SVG rendering (`railcar::render`)

pub use railcar_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use railcar_render::render::{GrammarLayout, RuleLayout};
    pub use railcar_render::svg::{SvgRenderOptions, rule_anchor};
    pub use railcar_render::text::{DeterministicTextMeasurer, TextMeasurer};
    pub use railcar_render::{LayoutOptions, layout_parsed};

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Parse(#[from] railcar_core::Error),
        #[error(transparent)]
        Render(#[from] railcar_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Synchronous layout helper (executor-free).
    pub fn layout_grammar_sync(
        engine: &railcar_core::Engine,
        text: &str,
        parse_options: railcar_core::ParseOptions,
        layout_options: &LayoutOptions,
    ) -> Result<Option<GrammarLayout>> {
        let Some(parsed) = engine.parse_grammar_sync(text, parse_options)? else {
            return Ok(None);
        };
        Ok(Some(railcar_render::layout_parsed(&parsed, layout_options)?))
    }

    pub async fn layout_grammar(
        engine: &railcar_core::Engine,
        text: &str,
        parse_options: railcar_core::ParseOptions,
        layout_options: &LayoutOptions,
    ) -> Result<Option<GrammarLayout>> {
        layout_grammar_sync(engine, text, parse_options, layout_options)
    }

    /// Synchronous SVG render helper (executor-free).
    pub fn render_svg_sync(
        engine: &railcar_core::Engine,
        text: &str,
        parse_options: railcar_core::ParseOptions,
        layout_options: &LayoutOptions,
        svg_options: &SvgRenderOptions,
    ) -> Result<Option<String>> {
        let Some(parsed) = engine.parse_grammar_sync(text, parse_options)? else {
            return Ok(None);
        };
        let layout = railcar_render::layout_parsed(&parsed, layout_options)?;
        let svg = railcar_render::svg::render_svg(&layout, &parsed.effective_config, svg_options)?;
        Ok(Some(svg))
    }

    pub async fn render_svg(
        engine: &railcar_core::Engine,
        text: &str,
        parse_options: railcar_core::ParseOptions,
        layout_options: &LayoutOptions,
        svg_options: &SvgRenderOptions,
    ) -> Result<Option<String>> {
        render_svg_sync(engine, text, parse_options, layout_options, svg_options)
    }

    /// Serializes an already-computed layout to SVG.
    pub fn render_layout_svg(
        layout: &GrammarLayout,
        config: &railcar_core::RailcarConfig,
        svg_options: &SvgRenderOptions,
    ) -> Result<String> {
        Ok(railcar_render::svg::render_svg(layout, config, svg_options)?)
    }

    /// Convenience wrapper that bundles an [`Engine`](railcar_core::Engine)
    /// and common options for headless rendering.
    ///
    /// All work is CPU-bound and performs no I/O, so this stays
    /// runtime-agnostic.
    #[derive(Clone, Default)]
    pub struct HeadlessRenderer {
        pub engine: railcar_core::Engine,
        pub parse: railcar_core::ParseOptions,
        pub layout: LayoutOptions,
        pub svg: SvgRenderOptions,
    }

    impl HeadlessRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_site_config(
            mut self,
            overrides: &serde_json::Value,
        ) -> std::result::Result<Self, railcar_core::Error> {
            self.engine = self.engine.with_site_config(overrides)?;
            Ok(self)
        }

        pub fn parse_grammar_sync(
            &self,
            text: &str,
        ) -> Result<Option<railcar_core::ParsedGrammar>> {
            Ok(self.engine.parse_grammar_sync(text, self.parse)?)
        }

        pub fn layout_grammar_sync(&self, text: &str) -> Result<Option<GrammarLayout>> {
            layout_grammar_sync(&self.engine, text, self.parse, &self.layout)
        }

        pub fn render_svg_sync(&self, text: &str) -> Result<Option<String>> {
            render_svg_sync(&self.engine, text, self.parse, &self.layout, &self.svg)
        }

        pub fn render_svg_sync_with_diagram_id(
            &self,
            text: &str,
            diagram_id: &str,
        ) -> Result<Option<String>> {
            let mut svg = self.svg.clone();
            svg.diagram_id = Some(rule_anchor(diagram_id));
            render_svg_sync(&self.engine, text, self.parse, &self.layout, &svg)
        }
    }
}
