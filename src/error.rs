// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Everything that can go wrong between reading a grammar and handing
//! a finished raster to a sink.  A render either succeeds completely
//! or returns one of these; there is no partial result.

use failure::Fail;
use std::io;

/// A grammar that cannot be rendered.  These are all detected by
/// `GrammarBuilder::build`, before any table is constructed.
#[derive(Debug, Fail, PartialEq)]
pub enum GrammarError {
    /// There is nothing to rewrite.
    #[fail(display = "the start string is empty")]
    EmptyStart,

    /// Symbols are single bytes.
    #[fail(display = "symbol {:?} is not a single-byte ASCII character", _0)]
    NonAsciiSymbol(char),

    /// The turn angle is not finite, or turning by it is the same as
    /// not turning at all.
    #[fail(display = "turn angle {} is degenerate", _0)]
    DegenerateAngle(f64),

    /// `+` and `-` always mean "turn"; they cannot be rewritten.
    #[fail(display = "the turn symbol {:?} cannot have a rule", _0)]
    TurnSymbolRewritten(char),

    /// The same symbol was given two rules.
    #[fail(display = "symbol {:?} has more than one rule", _0)]
    DuplicateRule(char),

    /// A symbol appears in the start string or a rule body, but the
    /// grammar says nothing about what it means.
    #[fail(display = "symbol {:?} is used but never defined", _0)]
    UndefinedSymbol(char),

    /// The symbol only ever rewrites into other rule symbols that lead
    /// back to it, without ever drawing or turning.
    #[fail(display = "rule for {:?} is part of a cycle that never draws", _0)]
    CyclicRule(char),
}

/// Failures of the parallel machinery itself.
#[derive(Debug, Fail, PartialEq)]
pub enum ConcurrencyError {
    /// A worker died before finishing its job.
    #[fail(display = "worker for unit {} terminated abnormally", unit)]
    WorkerPanicked {
        /// The job index the worker was running.
        unit: usize,
    },

    /// Every sender went away, but some units never sent their
    /// end-of-stream marker.
    #[fail(display = "units {:?} never signalled end of stream", units)]
    MissingEndOfStream {
        /// The units still outstanding.
        units: Vec<usize>,
    },

    /// A unit sent something the coordinator cannot accept.
    #[fail(display = "unit {} violated the merge protocol: {}", unit, reason)]
    ProtocolViolation {
        /// The offending unit.
        unit: usize,
        /// What it did.
        reason: String,
    },
}

/// The top-level error for the library.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// The grammar was malformed.
    #[fail(display = "invalid grammar: {}", _0)]
    Configuration(#[cause] GrammarError),

    /// A caller supplied a value the renderer cannot work with.
    #[fail(display = "invalid {}: {}", name, reason)]
    InvalidParameter {
        /// The parameter.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A buffer could not be sized or allocated.
    #[fail(display = "could not allocate {} ({} bytes)", what, bytes)]
    Resource {
        /// What we were trying to allocate.
        what: &'static str,
        /// How much of it, saturated at `usize::MAX` on overflow.
        bytes: usize,
    },

    /// A parallel unit failed.
    #[fail(display = "{}", _0)]
    Concurrency(#[cause] ConcurrencyError),

    /// Scanner poll offsets must be supplied in non-decreasing order.
    #[fail(display = "poll offset {} follows {}", offset, previous)]
    UnorderedPolls {
        /// The offset before the bad one.
        previous: usize,
        /// The bad one.
        offset: usize,
    },

    /// A raster sink rejected the image.
    #[fail(display = "could not write image: {}", _0)]
    Output(String),

    /// Plain I/O failure while writing.
    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<GrammarError> for RenderError {
    fn from(e: GrammarError) -> Self {
        RenderError::Configuration(e)
    }
}

impl From<ConcurrencyError> for RenderError {
    fn from(e: ConcurrencyError) -> Self {
        RenderError::Concurrency(e)
    }
}

impl From<io::Error> for RenderError {
    fn from(e: io::Error) -> Self {
        RenderError::Io(e)
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, RenderError>;
