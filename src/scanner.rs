//! The scanner walks a string the way the turtle would, except that
//! any symbol with a rule can be swallowed whole: instead of expanding
//! it, the scanner looks up what the expansion would have done (from
//! the previous layer of the table) and applies that in one step.
//!
//! The same walk builds table rows (scan a rule body against the layer
//! below) and finds split points for the partitioner (scan the
//! bootstrap string against the layer for the remaining depth, taking
//! snapshots, or "polls", at the requested offsets).

use crate::error::{RenderError, Result};
use crate::geometry::{rotate, BoundingBox, Pose};
use crate::grammar::{Grammar, Symbol, TURN_LEFT, TURN_RIGHT};
use crate::table::{Layer, Summary};

/// The result of a scan: the net effect of the whole string, and the
/// turtle's pose at each requested offset.
#[derive(Clone, Debug, PartialEq)]
pub struct Scan {
    /// What walking the whole string does.
    pub summary: Summary,
    /// One pose per requested offset, in the order requested.  Each is
    /// the state *before* the character at that offset is processed;
    /// offsets at or past the end of the string see the final state.
    pub polls: Vec<Pose>,
}

/// Walk `string` with the turtle starting at the origin facing 0.
///
/// When `expand` is set, symbols with a rule are replaced by their
/// summary from `prior`, rotated into the current frame.  Otherwise
/// every symbol is taken literally, which is what depth 1 needs since
/// there is nothing below it to expand into.
///
/// `polls` must be non-decreasing.
pub fn scan(
    grammar: &Grammar,
    string: &[Symbol],
    prior: &Layer,
    expand: bool,
    polls: &[usize],
) -> Result<Scan> {
    if let Some(w) = polls.windows(2).find(|w| w[1] < w[0]) {
        return Err(RenderError::UnorderedPolls {
            previous: w[0],
            offset: w[1],
        });
    }

    let mut pose = Pose::ORIGIN;
    let mut bbox = BoundingBox::ORIGIN;
    let mut snapshots = Vec::with_capacity(polls.len());
    let mut pending = polls.iter().peekable();

    for (offset, symbol) in string.iter().enumerate() {
        while pending.peek().map_or(false, |p| **p <= offset) {
            pending.next();
            snapshots.push(pose.normalized());
        }

        match prior.get(symbol).filter(|_| expand) {
            Some(child) => {
                bbox.union(&child.bbox.placed_at(&pose));
                let (dx, dy) = rotate(child.x, child.y, pose.heading);
                pose.x += dx;
                pose.y += dy;
                pose.heading += child.heading;
            }
            None if grammar.is_forward(*symbol) => {
                pose.advance();
                bbox.include(pose.x, pose.y);
            }
            None if *symbol == TURN_LEFT => pose.heading += grammar.angle(),
            None if *symbol == TURN_RIGHT => pose.heading -= grammar.angle(),
            None => {}
        }
    }

    let end = pose.normalized();
    snapshots.extend(pending.map(|_| end));

    Ok(Scan {
        summary: Summary {
            x: end.x,
            y: end.y,
            heading: end.heading,
            bbox,
        },
        polls: snapshots,
    })
}
