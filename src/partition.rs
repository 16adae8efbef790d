//! Splits a render into independent jobs.
//!
//! The start string is rewritten a few times by hand (the bootstrap),
//! until it has at least one character per unit of work.  The
//! bootstrap is cut into contiguous ranges, and one scan over it
//! against the table layer for the remaining depth tells us exactly
//! where the turtle will be, and which way it will face, when it gets
//! to the start of each range.  Nothing is drawn to find that out.

use crate::error::{RenderError, Result};
use crate::geometry::Pose;
use crate::grammar::{Grammar, Symbol};
use crate::scanner::scan;
use crate::table::{DpTable, Summary};
use itertools::Itertools;
use std::iter::once;
use std::ops::Range;
use tracing::info;

/// Rounds of plain rewriting done before splitting, at minimum.
pub const DEFAULT_BOOTSTRAP_DEPTH: usize = 3;

/// One unit of work: a slice of the bootstrap string, to be rewritten
/// `remaining_depth` more times and drawn from `start`.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    /// Position of this job in the partition.
    pub index: usize,
    /// The characters of the bootstrap string this job owns.
    pub range: Range<usize>,
    /// Rewriting rounds still to do.
    pub remaining_depth: usize,
    /// Where the turtle is when this job begins, in turtle units.
    pub start: Pose,
    /// Characters of the finished curve taken to precede this job.
    pub progress_offset: u64,
    /// Length the finished curve is taken to have.  This is the job's
    /// own expanded length times the number of jobs, so when jobs
    /// differ in size colors only roughly line up across them.
    pub progress_total: u64,
}

/// The bootstrap string and the jobs cut from it.
#[derive(Clone, Debug)]
pub struct Partition {
    /// The start string after `bootstrap_depth` rounds of rewriting.
    pub bootstrap: Vec<Symbol>,
    /// How many rounds produced the bootstrap.
    pub bootstrap_depth: usize,
    /// What drawing the whole curve does, from the origin.
    pub summary: Summary,
    /// One per unit, in string order.  Together the ranges cover the
    /// bootstrap string exactly once.
    pub jobs: Vec<Job>,
}

/// Split a render of `total_depth` rounds into `units` jobs, using the
/// default bootstrap depth.
pub fn partition(grammar: &Grammar, table: &DpTable, total_depth: usize, units: usize) -> Result<Partition> {
    partition_with(grammar, table, total_depth, units, DEFAULT_BOOTSTRAP_DEPTH)
}

/// Split a render of `total_depth` rounds into `units` jobs.  The
/// bootstrap begins at `bootstrap_depth` rounds (never more than
/// `total_depth`) and goes deeper while it is shorter than `units`.
pub fn partition_with(
    grammar: &Grammar,
    table: &DpTable,
    total_depth: usize,
    units: usize,
    bootstrap_depth: usize,
) -> Result<Partition> {
    if units == 0 {
        return Err(RenderError::InvalidParameter {
            name: "units",
            reason: "at least one unit of work is needed".to_string(),
        });
    }
    if total_depth > table.depth() {
        return Err(RenderError::InvalidParameter {
            name: "depth",
            reason: format!("{} is deeper than the table ({})", total_depth, table.depth()),
        });
    }

    let mut depth = bootstrap_depth.min(total_depth);
    let mut bootstrap = grammar.expand_start(depth)?;
    while bootstrap.len() < units && depth < total_depth {
        bootstrap = grammar.expand_path(&bootstrap)?;
        depth += 1;
    }

    let remaining_depth = total_depth - depth;
    let layer = table.layer(remaining_depth).ok_or_else(|| RenderError::InvalidParameter {
        name: "depth",
        reason: format!("no table layer for depth {}", remaining_depth),
    })?;

    let len = bootstrap.len();
    let offsets: Vec<usize> = (0..units).map(|i| i * len / units).collect();
    let scanned = scan(grammar, &bootstrap, layer, remaining_depth > 0, &offsets)?;

    let jobs: Vec<Job> = offsets
        .iter()
        .cloned()
        .chain(once(len))
        .tuple_windows()
        .zip(scanned.polls)
        .enumerate()
        .map(|(index, ((start, end), pose))| {
            let local_len = grammar.expanded_len(&bootstrap[start..end], remaining_depth);
            Job {
                index,
                range: start..end,
                remaining_depth,
                start: pose,
                progress_offset: (index as u64).saturating_mul(local_len),
                progress_total: local_len.saturating_mul(units as u64),
            }
        })
        .collect();

    info!(
        units,
        bootstrap_depth = depth,
        bootstrap_len = len,
        remaining_depth,
        "partitioned render"
    );

    Ok(Partition {
        bootstrap,
        bootstrap_depth: depth,
        summary: scanned.summary,
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Curve;

    const EPS: f64 = 1e-6;

    fn koch_table(depth: usize) -> (Grammar, DpTable) {
        let g = Curve::Koch.grammar().unwrap();
        let t = DpTable::build(&g, depth).unwrap();
        (g, t)
    }

    #[test]
    fn ranges_cover_the_bootstrap_exactly_once() {
        let (g, t) = koch_table(6);
        for units in 1..12 {
            let p = partition(&g, &t, 6, units).unwrap();
            assert_eq!(p.jobs.len(), units);
            assert_eq!(p.jobs[0].range.start, 0);
            assert_eq!(p.jobs[units - 1].range.end, p.bootstrap.len());
            for pair in p.jobs.windows(2) {
                assert_eq!(pair[0].range.end, pair[1].range.start);
            }
        }
    }

    #[test]
    fn offsets_are_i_len_over_n() {
        let (g, t) = koch_table(4);
        let p = partition_with(&g, &t, 4, 3, 1).unwrap();
        assert_eq!(p.bootstrap.len(), 9);
        let starts: Vec<usize> = p.jobs.iter().map(|j| j.range.start).collect();
        assert_eq!(starts, vec![0, 3, 6]);
        assert!(p.jobs.iter().all(|j| j.remaining_depth == 3));
    }

    #[test]
    fn the_bootstrap_deepens_until_every_unit_has_a_character() {
        let (g, t) = koch_table(5);
        let p = partition_with(&g, &t, 5, 20, 1).unwrap();
        assert_eq!(p.bootstrap_depth, 2);
        assert_eq!(p.bootstrap.len(), 49);
    }

    #[test]
    fn the_bootstrap_never_passes_the_total_depth() {
        let (g, t) = koch_table(1);
        let p = partition(&g, &t, 1, 100).unwrap();
        assert_eq!(p.bootstrap_depth, 1);
        assert_eq!(p.jobs.len(), 100);
        assert!(p.jobs.iter().filter(|j| j.range.is_empty()).count() > 0);
    }

    #[test]
    fn job_starts_match_a_literal_walk() {
        let (g, t) = koch_table(5);
        let p = partition_with(&g, &t, 5, 4, 2).unwrap();
        let remaining = 3;
        let mut pose = Pose::ORIGIN;
        for (i, symbol) in p.bootstrap.iter().enumerate() {
            if let Some(job) = p.jobs.iter().find(|j| j.range.start == i) {
                assert!((job.start.x - pose.x).abs() < EPS, "job {}", job.index);
                assert!((job.start.y - pose.y).abs() < EPS, "job {}", job.index);
            }
            for s in g.expand(&[*symbol], remaining).unwrap() {
                if g.is_forward(s) {
                    pose.advance();
                } else if s == b'+' {
                    pose.heading += g.angle();
                } else if s == b'-' {
                    pose.heading -= g.angle();
                }
            }
        }
        assert!((p.summary.x - pose.x).abs() < EPS);
        assert!((p.summary.y - pose.y).abs() < EPS);
    }

    #[test]
    fn progress_is_local_length_times_units() {
        let (g, t) = koch_table(4);
        let p = partition_with(&g, &t, 4, 3, 1).unwrap();
        let local = g.expanded_len(&p.bootstrap[3..6], 3);
        assert_eq!(local, 251);
        assert_eq!(p.jobs[1].progress_offset, local);
        assert_eq!(p.jobs[1].progress_total, local * 3);
    }

    #[test]
    fn zero_units_and_deep_renders_are_rejected() {
        let (g, t) = koch_table(2);
        assert!(partition(&g, &t, 2, 0).is_err());
        assert!(partition(&g, &t, 3, 1).is_err());
    }

    #[test]
    fn depth_zero_is_a_single_literal_job() {
        let (g, t) = koch_table(0);
        let p = partition(&g, &t, 0, 1).unwrap();
        assert_eq!(p.bootstrap, b"F".to_vec());
        assert_eq!(p.jobs[0].remaining_depth, 0);
        assert_eq!(p.jobs[0].start, Pose::ORIGIN);
    }
}
