#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Lindenmayer renderer
//!
//! An L-system is a string-rewriting grammar: every round, each symbol
//! of a string is replaced by its rule (symbols without a rule stay as
//! they are).  Start from a short string, rewrite it a number of times,
//! and read the result as instructions for a turtle (`F` walks forward
//! one unit, `+` and `-` turn by a fixed angle) and you get a fractal
//! curve: a dragon, a Koch island, a Sierpinski triangle.
//!
//! The string grows exponentially with the number of rounds, so
//! drawing a deep curve is a lot of work, and it is all sequential: to
//! know where the turtle is at character one billion you would have to
//! walk the first billion characters.  Unless you remember, for every
//! symbol and every depth, what drawing its expansion *does*: where it
//! leaves the turtle, which way it leaves it facing, and what box it
//! stays inside.  Those summaries compose, so a small table of them
//! (built bottom-up, one depth at a time) answers both questions the
//! renderer needs: how big the image must be, and where the turtle is
//! at any point of a lightly-expanded string.  The second answer lets
//! the curve be cut into pieces that are drawn independently, on
//! threads sharing an image or on workers that only send pixels back,
//! and merged with a blend (per-channel max) that does not care what
//! order the pixels arrive in.

pub mod backend;
pub mod coloring;
pub mod error;
pub mod geometry;
pub mod grammar;
pub mod partition;
pub mod planes;
pub mod raster;
pub mod render;
pub mod scanner;
pub mod table;
pub mod turtle;

pub use backend::{Backend, MessagePassing, Rendered, SharedMemory, Transfer};
pub use coloring::{Coloring, Palette};
pub use error::{GrammarError, RenderError};
pub use grammar::{Curve, Grammar};
pub use raster::{Raster, Rgb};
pub use render::{RenderConfig, Renderer};
