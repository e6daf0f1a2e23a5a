//! Drawing-surface abstraction: a tree of drawing primitives in grid units.
//!
//! The layout engine draws into a [`Canvas`]; nothing here knows about SVG.
//! Nested translated groups mirror the layout tree, so the emitted output
//! keeps each node's local coordinate frame intact. Device scaling happens
//! once, at serialization.

use crate::Result;
use crate::path::RailPath;
use serde::{Deserialize, Serialize};

/// Style tag distinguishing literal tokens from rule references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoxClass {
    Terminal,
    NonTerminal,
    /// Placeholder for a rule that failed to parse (lenient mode).
    Error,
}

impl BoxClass {
    pub fn css_class(self) -> &'static str {
        match self {
            BoxClass::Terminal => "box-terminal",
            BoxClass::NonTerminal => "box-nonterminal",
            BoxClass::Error => "box-error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelClass {
    Terminal,
    NonTerminal,
    Error,
    Heading,
    Title,
}

impl LabelClass {
    pub fn css_class(self) -> &'static str {
        match self {
            LabelClass::Terminal => "label-terminal",
            LabelClass::NonTerminal => "label-nonterminal",
            LabelClass::Error => "label-error",
            LabelClass::Heading => "label-heading",
            LabelClass::Title => "label-title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAnchor {
    Start,
    Middle,
}

/// Main-line endpoint markers at the far left/right of a rule diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerKind {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Primitive {
    Rail {
        path: RailPath,
    },
    RoundedRect {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        class: BoxClass,
    },
    Label {
        x: i32,
        y: i32,
        text: String,
        class: LabelClass,
        anchor: TextAnchor,
        /// Navigation target for nonterminal boxes that reference a defined
        /// rule.
        href: Option<String>,
    },
    Marker {
        x: i32,
        y: i32,
        kind: MarkerKind,
    },
    Group {
        dx: i32,
        dy: i32,
        id: Option<String>,
        children: Vec<Primitive>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    primitives: Vec<Primitive>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn push_rail(&mut self, path: RailPath) {
        self.primitives.push(Primitive::Rail { path });
    }

    pub fn push_rounded_rect(&mut self, x: i32, y: i32, width: i32, height: i32, class: BoxClass) {
        self.primitives.push(Primitive::RoundedRect {
            x,
            y,
            width,
            height,
            class,
        });
    }

    pub fn push_label(
        &mut self,
        x: i32,
        y: i32,
        text: impl Into<String>,
        class: LabelClass,
        anchor: TextAnchor,
        href: Option<String>,
    ) {
        self.primitives.push(Primitive::Label {
            x,
            y,
            text: text.into(),
            class,
            anchor,
            href,
        });
    }

    pub fn push_marker(&mut self, x: i32, y: i32, kind: MarkerKind) {
        self.primitives.push(Primitive::Marker { x, y, kind });
    }

    /// Runs `draw` inside a translated child frame and appends the result as
    /// a nested group.
    pub fn group<F>(&mut self, dx: i32, dy: i32, id: Option<String>, draw: F) -> Result<()>
    where
        F: FnOnce(&mut Canvas) -> Result<()>,
    {
        let mut child = Canvas::new();
        draw(&mut child)?;
        self.primitives.push(Primitive::Group {
            dx,
            dy,
            id,
            children: child.primitives,
        });
        Ok(())
    }

    /// All rails in the tree, depth-first. Primarily for tests and tooling.
    pub fn rails(&self) -> Vec<&RailPath> {
        fn walk<'a>(prims: &'a [Primitive], out: &mut Vec<&'a RailPath>) {
            for p in prims {
                match p {
                    Primitive::Rail { path } => out.push(path),
                    Primitive::Group { children, .. } => walk(children, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.primitives, &mut out);
        out
    }
}
