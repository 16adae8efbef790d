// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Execution backends.
//!
//! Every backend gets the same jobs and the same drawing context, and
//! must produce the same raster: each job rewrites its slice of the
//! bootstrap string, walks it with the turtle, and every point the
//! turtle yields is lightened into the image.  Backends differ only in
//! how jobs are handed out and how points travel to the raster.
//!
//! * `SharedMemory` runs a pool of threads that all write into one
//!   `SharedRaster`.
//! * `MessagePassing` gives every job its own thread that never touches
//!   the raster.  Workers send pixels to a coordinator, which is the
//!   only writer.  In `Batch` mode a worker sends everything it drew
//!   as one message; in `Streaming` mode it sends one message per
//!   point and finishes with an end-of-stream marker.

use crate::coloring::Coloring;
use crate::error::{ConcurrencyError, RenderError, Result};
use crate::grammar::{Grammar, Symbol};
use crate::partition::Job;
use crate::planes::{Pixel, PlaneMapper};
use crate::raster::{Raster, Rgb, SharedRaster};
use crate::turtle::{PointEvent, Progress, Turtle};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use std::fmt;
use std::iter::Enumerate;
use std::slice::Iter;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Messages a streaming coordinator can have in flight before workers
/// block.
pub const STREAM_CAPACITY: usize = 4096;

type JobQueue<'a> = Arc<Mutex<Enumerate<Iter<'a, Job>>>>;

/// Everything a job needs besides itself.  Shared, read-only, by all
/// workers.
#[derive(Clone, Copy)]
pub struct DrawContext<'a> {
    /// The grammar being drawn.
    pub grammar: &'a Grammar,
    /// The string the jobs' ranges index into.
    pub bootstrap: &'a [Symbol],
    /// Turtle plane to image.
    pub mapper: &'a PlaneMapper,
    /// Pixels per unit of turtle movement.
    pub scale: u32,
    /// Colors for the points.
    pub coloring: &'a dyn Coloring,
}

impl<'a> DrawContext<'a> {
    /// The job's slice of the bootstrap, fully rewritten.
    pub fn expand(&self, job: &Job) -> Result<Vec<Symbol>> {
        self.grammar
            .expand(&self.bootstrap[job.range.clone()], job.remaining_depth)
    }

    /// A turtle walking an expanded job, in canvas units.
    pub fn walk<'p>(&'p self, job: &Job, path: &'p [Symbol]) -> Turtle<'p> {
        Turtle::new(
            self.grammar,
            path,
            self.mapper.to_canvas(&job.start),
            self.scale,
            self.coloring,
            Progress {
                offset: job.progress_offset,
                total: job.progress_total,
            },
        )
    }

    /// Draw one job, handing every point that lands on the image to
    /// `plot`.  Returns how many did.
    pub fn draw<F>(&self, job: &Job, mut plot: F) -> Result<u64>
    where
        F: FnMut(Pixel, Rgb),
    {
        let path = self.expand(job)?;
        let mut plotted = 0;
        let mut missed = 0u64;
        for PointEvent { x, y, color } in self.walk(job, &path) {
            match self.mapper.point_to_pixel(x, y) {
                Some(pixel) => {
                    plot(pixel, color);
                    plotted += 1;
                }
                None => missed += 1,
            }
        }
        if missed > 0 {
            warn!(unit = job.index, missed, "points fell outside the image");
        }
        debug!(unit = job.index, chars = path.len(), points = plotted, "job drawn");
        Ok(plotted)
    }
}

/// How one unit fared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitReport {
    /// Points this unit blended into the raster.
    pub events: u64,
    /// Whether the unit's work arrived in full.
    pub finished: bool,
}

/// A finished render.
#[derive(Debug)]
pub struct Rendered {
    /// The image.
    pub raster: Raster,
    /// One report per job, in job order.
    pub units: Vec<UnitReport>,
}

/// A way of running jobs.  A backend returns a raster only when every
/// job has completed; otherwise it returns an error and no image.
pub trait Backend {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    /// Run every job and merge the results.
    fn execute(&self, jobs: &[Job], ctx: &DrawContext) -> Result<Rendered>;
}

fn panicked(unit: usize) -> RenderError {
    ConcurrencyError::WorkerPanicked { unit }.into()
}

/// A fixed pool of threads sharing one raster.  Each thread pulls jobs
/// from a common queue until it is empty.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SharedMemory {
    /// Threads in the pool.  Zero means one per job.
    pub threads: usize,
}

impl Backend for SharedMemory {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn execute(&self, jobs: &[Job], ctx: &DrawContext) -> Result<Rendered> {
        let raster = SharedRaster::new(ctx.mapper.width(), ctx.mapper.height())?;
        let threads = match self.threads {
            0 => jobs.len(),
            n => n.min(jobs.len()),
        };
        let queue: JobQueue = Arc::new(Mutex::new(jobs.iter().enumerate()));

        let outcomes = crossbeam::scope(|spawner| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let queue = queue.clone();
                    let raster = &raster;
                    spawner.spawn(move |_| -> Result<Vec<(usize, u64)>> {
                        let mut done = Vec::new();
                        loop {
                            let job = { queue.lock().ok().and_then(|mut jobs| jobs.next()) };
                            match job {
                                Some((unit, job)) => {
                                    let events = ctx.draw(job, |pixel, color| {
                                        raster.blend(pixel, color);
                                    })?;
                                    done.push((unit, events));
                                }
                                None => break,
                            }
                        }
                        Ok(done)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        })
        .map_err(|_| panicked(0))?;

        if let Some(worker) = outcomes.iter().position(|o| o.is_err()) {
            return Err(panicked(worker));
        }
        let mut units = vec![UnitReport::default(); jobs.len()];
        for (worker, outcome) in outcomes.into_iter().enumerate() {
            for (unit, events) in outcome.map_err(|_| panicked(worker))?? {
                if let Some(report) = units.get_mut(unit) {
                    *report = UnitReport {
                        events,
                        finished: true,
                    };
                }
            }
        }
        if let Some(unit) = units.iter().position(|u| !u.finished) {
            return Err(ConcurrencyError::ProtocolViolation {
                unit,
                reason: "job was never picked up".to_string(),
            }
            .into());
        }

        Ok(Rendered {
            raster: raster.into_raster(),
            units,
        })
    }
}

/// How a message-passing worker ships its points.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Everything at once, when the job is done.
    Batch,
    /// One message per point, then an end-of-stream marker.
    Streaming,
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Transfer::Batch => "batch",
            Transfer::Streaming => "streaming",
        })
    }
}

impl FromStr for Transfer {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "batch" => Ok(Transfer::Batch),
            "streaming" => Ok(Transfer::Streaming),
            _ => Err(format!("unknown transfer mode '{}'", s)),
        }
    }
}

/// A pixel on the wire.  Coordinates are signed so that the end of a
/// stream can be marked with a position no raster has.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlotPoint {
    /// Column.
    pub x: i64,
    /// Row.
    pub y: i64,
    /// Color to blend.
    pub color: Rgb,
}

impl PlotPoint {
    /// Sent once by a streaming worker after its last point.
    pub const END_OF_STREAM: PlotPoint = PlotPoint {
        x: -1,
        y: -1,
        color: Rgb::BLACK,
    };

    /// Is this the end-of-stream marker?
    pub fn is_end_of_stream(&self) -> bool {
        self.x < 0 || self.y < 0
    }

    fn from_pixel(pixel: Pixel, color: Rgb) -> Self {
        PlotPoint {
            x: pixel.0 as i64,
            y: pixel.1 as i64,
            color,
        }
    }

    fn pixel(&self) -> Option<Pixel> {
        if self.is_end_of_stream() {
            None
        } else {
            Some(Pixel(self.x as usize, self.y as usize))
        }
    }
}

/// Units that never sent anything to the raster directly.  The
/// coordinator is the only writer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MessagePassing {
    /// How points travel.
    pub transfer: Transfer,
}

impl Backend for MessagePassing {
    fn name(&self) -> &'static str {
        match self.transfer {
            Transfer::Batch => "batch",
            Transfer::Streaming => "streaming",
        }
    }

    fn execute(&self, jobs: &[Job], ctx: &DrawContext) -> Result<Rendered> {
        let mut raster = Raster::new(ctx.mapper.width(), ctx.mapper.height())?;
        let mut units = vec![UnitReport::default(); jobs.len()];

        let (merged, joined) = match self.transfer {
            Transfer::Batch => {
                let (tx, rx) = unbounded();
                crossbeam::scope(|spawner| {
                    let handles: Vec<_> = jobs
                        .iter()
                        .enumerate()
                        .map(|(unit, job)| {
                            let tx: Sender<(usize, Vec<PlotPoint>)> = tx.clone();
                            spawner.spawn(move |_| -> Result<()> {
                                let mut batch = Vec::new();
                                ctx.draw(job, |pixel, color| batch.push(PlotPoint::from_pixel(pixel, color)))?;
                                // The coordinator is gone only if it already failed.
                                let _ = tx.send((unit, batch));
                                Ok(())
                            })
                        })
                        .collect();
                    drop(tx);
                    let merged = collect_batches(&rx, &mut raster, &mut units);
                    drop(rx);
                    let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
                    (merged, joined)
                })
                .map_err(|_| panicked(0))?
            }
            Transfer::Streaming => {
                let (tx, rx) = bounded(STREAM_CAPACITY);
                crossbeam::scope(|spawner| {
                    let handles: Vec<_> = jobs
                        .iter()
                        .enumerate()
                        .map(|(unit, job)| {
                            let tx: Sender<(usize, PlotPoint)> = tx.clone();
                            spawner.spawn(move |_| stream_job(ctx, unit, job, &tx))
                        })
                        .collect();
                    drop(tx);
                    let merged = collect_stream(&rx, &mut raster, &mut units);
                    drop(rx);
                    let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
                    (merged, joined)
                })
                .map_err(|_| panicked(0))?
            }
        };

        if let Some(unit) = joined.iter().position(|j| j.is_err()) {
            return Err(panicked(unit));
        }
        // A worker's own error explains the coordinator's missing end of stream.
        for outcome in joined {
            if let Ok(Err(e)) = outcome {
                return Err(e);
            }
        }
        merged?;
        Ok(Rendered { raster, units })
    }
}

fn stream_job(ctx: &DrawContext, unit: usize, job: &Job, tx: &Sender<(usize, PlotPoint)>) -> Result<()> {
    let path = ctx.expand(job)?;
    let mut sent = 0u64;
    for PointEvent { x, y, color } in ctx.walk(job, &path) {
        if let Some(pixel) = ctx.mapper.point_to_pixel(x, y) {
            if tx.send((unit, PlotPoint::from_pixel(pixel, color))).is_err() {
                return Ok(());
            }
            sent += 1;
        }
    }
    debug!(unit, chars = path.len(), points = sent, "job streamed");
    // The coordinator is gone only if it already failed.
    let _ = tx.send((unit, PlotPoint::END_OF_STREAM));
    Ok(())
}

fn unfinished(units: &[UnitReport]) -> Vec<usize> {
    units
        .iter()
        .enumerate()
        .filter(|(_, u)| !u.finished)
        .map(|(i, _)| i)
        .collect()
}

fn report_for(units: &mut [UnitReport], unit: usize) -> Result<&mut UnitReport> {
    let report = units.get_mut(unit).ok_or_else(|| ConcurrencyError::ProtocolViolation {
        unit,
        reason: "no such unit".to_string(),
    })?;
    if report.finished {
        return Err(ConcurrencyError::ProtocolViolation {
            unit,
            reason: "sent more after finishing".to_string(),
        }
        .into());
    }
    Ok(report)
}

fn plot(raster: &mut Raster, unit: usize, point: &PlotPoint) -> Result<()> {
    match point.pixel() {
        Some(pixel) if raster.blend(pixel, point.color) => Ok(()),
        _ => Err(ConcurrencyError::ProtocolViolation {
            unit,
            reason: format!("pixel ({}, {}) is not on the image", point.x, point.y),
        }
        .into()),
    }
}

// Blend whole batches in the order they arrive, whichever unit sent them.
fn collect_batches(
    rx: &Receiver<(usize, Vec<PlotPoint>)>,
    raster: &mut Raster,
    units: &mut [UnitReport],
) -> Result<()> {
    let mut outstanding = units.len();
    while outstanding > 0 {
        let (unit, batch) = rx.recv().map_err(|_| ConcurrencyError::MissingEndOfStream {
            units: unfinished(units),
        })?;
        let report = report_for(units, unit)?;
        for point in &batch {
            plot(raster, unit, point)?;
        }
        report.events = batch.len() as u64;
        report.finished = true;
        outstanding -= 1;
    }
    Ok(())
}

// Blend points as they arrive.  A unit is done when its end-of-stream
// marker has been seen; the render is done when every unit's has.
fn collect_stream(
    rx: &Receiver<(usize, PlotPoint)>,
    raster: &mut Raster,
    units: &mut [UnitReport],
) -> Result<()> {
    let mut outstanding = units.len();
    while outstanding > 0 {
        let (unit, point) = rx.recv().map_err(|_| ConcurrencyError::MissingEndOfStream {
            units: unfinished(units),
        })?;
        let report = report_for(units, unit)?;
        if point.is_end_of_stream() {
            report.finished = true;
            outstanding -= 1;
        } else {
            plot(raster, unit, &point)?;
            report.events += 1;
        }
    }
    Ok(())
}
