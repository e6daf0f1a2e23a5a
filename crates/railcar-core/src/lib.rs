#![forbid(unsafe_code)]

//! Railroad syntax diagram grammar model + DSL parser (headless).
//!
//! Design goals:
//! - deterministic, testable outputs (the semantic model serializes to JSON)
//! - runtime-agnostic async APIs (no specific executor required)
//! - the layout/SVG engine lives in `railcar-render`; this crate only
//!   produces the expression tree it consumes

pub mod config;
pub mod error;
pub mod expr;
pub mod grammar;

pub use config::RailcarConfig;
pub use error::{Error, Result};
pub use expr::{Expr, Grammar};
pub use grammar::GrammarIssue;

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub suppress_errors: bool,
}

impl ParseOptions {
    /// Strict parsing (errors are returned).
    pub fn strict() -> Self {
        Self {
            suppress_errors: false,
        }
    }

    /// Lenient parsing: failed rules are dropped and reported as issues
    /// instead of aborting the whole grammar.
    pub fn lenient() -> Self {
        Self {
            suppress_errors: true,
        }
    }
}

/// A parsed grammar plus the config it should be laid out with.
#[derive(Debug, Clone)]
pub struct ParsedGrammar {
    pub grammar: Grammar,
    /// Per-rule failures collected in lenient mode (always empty in strict
    /// mode, where the first failure is returned as an error).
    pub issues: Vec<GrammarIssue>,
    pub effective_config: RailcarConfig,
}

/// Entry point bundling site-level configuration with the parser.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    site_config: RailcarConfig,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges JSON config overrides onto the built-in defaults.
    pub fn with_site_config(mut self, overrides: &serde_json::Value) -> Result<Self> {
        self.site_config.deep_merge(overrides)?;
        Ok(self)
    }

    pub fn site_config(&self) -> &RailcarConfig {
        &self.site_config
    }

    /// Parses grammar source text. Returns `Ok(None)` when the input holds
    /// no rules at all (blank/comment-only input).
    pub fn parse_grammar_sync(
        &self,
        text: &str,
        options: ParseOptions,
    ) -> Result<Option<ParsedGrammar>> {
        let (grammar, issues) = grammar::parse_rules(text, options.suppress_errors)?;
        if grammar.is_empty() && issues.is_empty() && grammar.title.is_none() {
            return Ok(None);
        }
        tracing::debug!(
            rules = grammar.rules.len(),
            issues = issues.len(),
            "parsed grammar"
        );
        Ok(Some(ParsedGrammar {
            grammar,
            issues,
            effective_config: self.site_config.clone(),
        }))
    }

    pub async fn parse_grammar(
        &self,
        text: &str,
        options: ParseOptions,
    ) -> Result<Option<ParsedGrammar>> {
        self.parse_grammar_sync(text, options)
    }
}

#[cfg(test)]
mod tests;
