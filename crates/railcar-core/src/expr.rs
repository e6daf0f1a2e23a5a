use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A grammar expression: the five-combinator input contract of the layout
/// engine. Leaves are terminal/nonterminal boxes; internal nodes are the
/// sequence/stack/bypass/loop combinators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expr {
    /// A literal token, drawn as a terminal box.
    Terminal { text: String },
    /// A reference to another rule, drawn as a nonterminal box.
    NonTerminal { text: String },
    /// Horizontal composition: children drawn left to right on one main line.
    Sequence { children: Vec<Expr> },
    /// Vertical alternation: mutually exclusive children, first is the
    /// straight-through path.
    Stack { children: Vec<Expr> },
    /// Optional content: a skip lane is routed above the child.
    Bypass { child: Box<Expr> },
    /// Repeatable content: same routing as bypass, opposite rail direction.
    Loop { child: Box<Expr> },
    /// Placeholder for a rule that failed to parse in lenient mode, drawn
    /// as an error-styled box so the failure stays visible in the diagram.
    Error { message: String },
}

impl Expr {
    pub fn terminal(text: impl Into<String>) -> Self {
        Self::Terminal { text: text.into() }
    }

    pub fn nonterminal(text: impl Into<String>) -> Self {
        Self::NonTerminal { text: text.into() }
    }

    pub fn sequence(children: Vec<Expr>) -> Self {
        Self::Sequence { children }
    }

    pub fn stack(children: Vec<Expr>) -> Self {
        Self::Stack { children }
    }

    pub fn bypass(child: Expr) -> Self {
        Self::Bypass {
            child: Box::new(child),
        }
    }

    pub fn repeat(child: Expr) -> Self {
        Self::Loop {
            child: Box::new(child),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// An ordered set of named rules. Rule order is presentation order: the
/// renderer stacks rule diagrams vertically in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
    pub title: Option<String>,
    pub rules: IndexMap<String, Expr>,
}

impl Grammar {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True when `name` is defined by this grammar; used by the renderer to
    /// decide whether a nonterminal box gets a navigation anchor.
    pub fn defines(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }
}
