#![forbid(unsafe_code)]

//! Headless layout + SVG renderer for railroad syntax diagrams.
//!
//! The pipeline is: grammar expression tree (from `railcar-core`) →
//! [`render::GrammarLayout`] (integer-grid layout algebra) → canvas of
//! drawing primitives → SVG string. Layout is a pure function of the tree
//! plus config; rendering is a single depth-first traversal. Nothing here
//! blocks, retries or shares state between renders.

pub mod canvas;
pub mod node;
pub mod path;
pub mod render;
pub mod svg;
pub mod text;

use crate::path::Heading;
use crate::render::GrammarLayout;
use crate::text::{DeterministicTextMeasurer, TextMeasurer};
use railcar_core::ParsedGrammar;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path operation was invoked out of sequence (forward/turn before
    /// start, start before finish, finish with no open path).
    #[error("path builder used out of sequence: {message}")]
    InvalidState { message: String },
    /// A turn between a heading pair with no defined quarter-circle arc.
    /// Unreachable through `turn_left`/`turn_right`, but checked.
    #[error("no quarter-circle arc from {from:?} to {to:?}")]
    UnsupportedTransition { from: Heading, to: Heading },
    /// The text-measurement collaborator could not be consulted.
    #[error("text measurement failed: {message}")]
    Measurement { message: String },
    #[error("invalid layout model: {message}")]
    InvalidModel { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct LayoutOptions {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

/// Lays out a parsed grammar with its effective config.
pub fn layout_parsed(parsed: &ParsedGrammar, options: &LayoutOptions) -> Result<GrammarLayout> {
    render::layout_grammar(
        &parsed.grammar,
        &parsed.effective_config,
        options.text_measurer.as_ref(),
    )
}
