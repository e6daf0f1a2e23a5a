//! Turtle-graphics rail path builder.
//!
//! Rails are modeled as relative motion on the integer grid: a cursor with a
//! position and a compass heading emits straight segments and radius-1
//! quarter-circle corners into one open path at a time. Keeping the motion
//! relative is what lets the layout combinators express their routing purely
//! in travel distances derived from the boxes being connected.
//!
//! A quarter turn consumes 1 grid unit of travel along the old heading and 1
//! along the new one, so a turn/run/turn connector covering a displacement of
//! `(h, d)` runs `d - 2` and `h - 2` between its turns. That "-2
//! compensation" is relied on throughout `render.rs`.

use crate::canvas::Canvas;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Heading {
    North,
    South,
    East,
    West,
}

impl Heading {
    /// Unit vector, y growing downwards (screen coordinates).
    pub fn unit(self) -> (i32, i32) {
        match self {
            Heading::North => (0, -1),
            Heading::South => (0, 1),
            Heading::East => (1, 0),
            Heading::West => (-1, 0),
        }
    }

    pub fn left(self) -> Heading {
        match self {
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
            Heading::East => Heading::North,
        }
    }

    pub fn right(self) -> Heading {
        match self {
            Heading::North => Heading::East,
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
        }
    }
}

/// Advisory styling category for a finished rail (structural track vs the
/// through/bypass/loop routes of the optional combinators).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RailClass {
    Track,
    Through,
    Bypass,
    Loop,
}

impl RailClass {
    pub fn css_class(self) -> &'static str {
        match self {
            RailClass::Track => "rail-track",
            RailClass::Through => "rail-through",
            RailClass::Bypass => "rail-bypass",
            RailClass::Loop => "rail-loop",
        }
    }
}

/// Absolute-coordinate draw commands, still in grid units. Scaling to device
/// units happens at SVG emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PathCommand {
    MoveTo { x: i32, y: i32 },
    LineTo { x: i32, y: i32 },
    /// Quarter-circle corner: control point, then end point.
    QuarterTo { cx: i32, cy: i32, x: i32, y: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RailPath {
    pub class: RailClass,
    /// Diagnostic tag for tooling; never semantic.
    pub label: Option<String>,
    pub commands: Vec<PathCommand>,
}

#[derive(Debug)]
struct OpenPath {
    x: i32,
    y: i32,
    heading: Heading,
    commands: Vec<PathCommand>,
}

/// Stateful cursor emitting one connected rail path at a time.
///
/// Short-lived and never shared: every render gets fresh builders, so a
/// failed render cannot leak open-path state into a later one.
#[derive(Debug, Default)]
pub struct PathBuilder {
    open: Option<OpenPath>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_mut(&mut self, op: &str) -> Result<&mut OpenPath> {
        self.open.as_mut().ok_or_else(|| Error::InvalidState {
            message: format!("`{op}` called with no open path"),
        })
    }

    /// Begins a path at the given grid position and heading.
    pub fn start(&mut self, x: i32, y: i32, heading: Heading) -> Result<()> {
        if self.open.is_some() {
            return Err(Error::InvalidState {
                message: "`start` called while a path is already open".to_string(),
            });
        }
        self.open = Some(OpenPath {
            x,
            y,
            heading,
            commands: vec![PathCommand::MoveTo { x, y }],
        });
        Ok(())
    }

    /// Emits a straight segment of `distance` grid units along the current
    /// heading. Zero is a legal no-op; the routing formulas produce it in
    /// degenerate cases.
    pub fn forward(&mut self, distance: i32) -> Result<()> {
        if distance < 0 {
            return Err(Error::InvalidState {
                message: format!("negative travel distance: {distance}"),
            });
        }
        let path = self.open_mut("forward")?;
        if distance == 0 {
            return Ok(());
        }
        let (dx, dy) = path.heading.unit();
        path.x += dx * distance;
        path.y += dy * distance;
        path.commands.push(PathCommand::LineTo {
            x: path.x,
            y: path.y,
        });
        Ok(())
    }

    pub fn turn_left(&mut self) -> Result<()> {
        let to = self.open_mut("turnLeft")?.heading.left();
        self.turn(to)
    }

    pub fn turn_right(&mut self) -> Result<()> {
        let to = self.open_mut("turnRight")?.heading.right();
        self.turn(to)
    }

    /// Emits the quarter-circle corner from the current heading to `to`.
    ///
    /// The arc is derived, not free-form: one unit along the old heading
    /// gives the control point, one unit along the new heading from there
    /// gives the end point. Only the 8 quarter-turn heading pairs are legal.
    fn turn(&mut self, to: Heading) -> Result<()> {
        let path = self.open_mut("turn")?;
        let from = path.heading;
        if to != from.left() && to != from.right() {
            return Err(Error::UnsupportedTransition { from, to });
        }
        let (odx, ody) = from.unit();
        let (ndx, ndy) = to.unit();
        let cx = path.x + odx;
        let cy = path.y + ody;
        path.x = cx + ndx;
        path.y = cy + ndy;
        path.heading = to;
        path.commands.push(PathCommand::QuarterTo {
            cx,
            cy,
            x: path.x,
            y: path.y,
        });
        Ok(())
    }

    /// Read-only cursor snapshot; `None` when no path is open.
    pub fn position(&self) -> Option<(i32, i32, Heading)> {
        self.open.as_ref().map(|p| (p.x, p.y, p.heading))
    }

    /// Closes the open path and attaches it to the canvas as a single
    /// rail-classed path, clearing the in-progress state.
    pub fn finish(&mut self, canvas: &mut Canvas, class: RailClass, label: Option<&str>) -> Result<()> {
        let path = self.open.take().ok_or_else(|| Error::InvalidState {
            message: "`finish` called with no open path".to_string(),
        })?;
        canvas.push_rail(RailPath {
            class,
            label: label.map(str::to_string),
            commands: path.commands,
        });
        Ok(())
    }
}
