//! The turtle: walks an expanded string and yields a colored point for
//! every pixel-sized step it takes.

use crate::coloring::Coloring;
use crate::geometry::Pose;
use crate::grammar::{Grammar, Symbol, TURN_LEFT, TURN_RIGHT};
use crate::raster::Rgb;

/// One plotted point, in canvas units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointEvent {
    /// Column, before rounding.
    pub x: f64,
    /// Row, before rounding.
    pub y: f64,
    /// Color chosen for this point.
    pub color: Rgb,
}

/// Where a walk sits within the whole curve, for coloring.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    /// How many characters of the curve come before this walk.
    pub offset: u64,
    /// How long the whole curve is taken to be.
    pub total: u64,
}

/// Yields the start point, then `scale` points per forward move.
/// Events come out in drawing order and the iterator cannot be
/// restarted.
pub struct Turtle<'a> {
    grammar: &'a Grammar,
    path: &'a [Symbol],
    coloring: &'a dyn Coloring,
    progress: Progress,
    pose: Pose,
    scale: u32,
    cursor: usize,
    drawing: usize,
    steps_left: u32,
    started: bool,
}

impl<'a> Turtle<'a> {
    /// A turtle about to walk `path` from `start`, which must already
    /// be in canvas units.
    pub fn new(
        grammar: &'a Grammar,
        path: &'a [Symbol],
        start: Pose,
        scale: u32,
        coloring: &'a dyn Coloring,
        progress: Progress,
    ) -> Self {
        Turtle {
            grammar,
            path,
            coloring,
            progress,
            pose: start,
            scale,
            cursor: 0,
            drawing: 0,
            steps_left: 0,
            started: false,
        }
    }

    fn event(&self, index: usize) -> PointEvent {
        let progress = self.progress.offset.saturating_add(index as u64);
        PointEvent {
            x: self.pose.x,
            y: self.pose.y,
            color: self.coloring.color(progress, self.progress.total),
        }
    }
}

impl<'a> Iterator for Turtle<'a> {
    type Item = PointEvent;

    fn next(&mut self) -> Option<PointEvent> {
        if !self.started {
            self.started = true;
            return Some(self.event(0));
        }
        loop {
            if self.steps_left > 0 {
                self.steps_left -= 1;
                self.pose.advance();
                return Some(self.event(self.drawing));
            }
            let symbol = *self.path.get(self.cursor)?;
            if self.grammar.is_forward(symbol) {
                self.drawing = self.cursor;
                self.steps_left = self.scale;
            } else if symbol == TURN_LEFT {
                self.pose.heading += self.grammar.angle();
            } else if symbol == TURN_RIGHT {
                self.pose.heading -= self.grammar.angle();
            }
            self.cursor += 1;
        }
    }
}
