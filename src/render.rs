// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Renderer
//!
//! Ties the pieces together.  A render builds the transform-summary
//! table up to the requested depth, uses it to size the image and to
//! split the curve into jobs, throws the table away, and hands the jobs
//! to a backend.  The sequential renderer skips the split: it rewrites
//! the whole start string and draws it in one pass, which is slow and
//! memory-hungry but makes a good reference.

use crate::backend::{Backend, DrawContext, Rendered, UnitReport};
use crate::coloring::Coloring;
use crate::error::{RenderError, Result};
use crate::geometry::Pose;
use crate::grammar::Grammar;
use crate::partition::{partition_with, Partition, DEFAULT_BOOTSTRAP_DEPTH};
use crate::planes::PlaneMapper;
use crate::raster::Raster;
use crate::table::DpTable;
use crate::turtle::{Progress, Turtle};
use tracing::{info, instrument};

/// The knobs of a render.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Rounds of rewriting.
    pub depth: usize,
    /// Pixels per unit of turtle movement.
    pub scale: u32,
    /// Jobs to split the curve into.
    pub units: usize,
    /// Rounds of plain rewriting before splitting, at minimum.
    pub bootstrap_depth: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            depth: 10,
            scale: 1,
            units: num_cpus::get(),
            bootstrap_depth: DEFAULT_BOOTSTRAP_DEPTH,
        }
    }
}

/// Everything decided before any drawing starts.
#[derive(Clone, Debug)]
pub struct Plan {
    /// The bootstrap string and its jobs.
    pub partition: Partition,
    /// The image the jobs draw into.
    pub mapper: PlaneMapper,
}

/// Renders one grammar with one configuration.
pub struct Renderer {
    grammar: Grammar,
    config: RenderConfig,
}

impl Renderer {
    /// Checks the configuration.  The grammar has already been checked
    /// by its builder.
    pub fn new(grammar: Grammar, config: RenderConfig) -> Result<Self> {
        if config.scale == 0 {
            return Err(RenderError::InvalidParameter {
                name: "scale",
                reason: "must be positive".to_string(),
            });
        }
        if config.units == 0 {
            return Err(RenderError::InvalidParameter {
                name: "units",
                reason: "must be positive".to_string(),
            });
        }
        Ok(Renderer { grammar, config })
    }

    /// The grammar being rendered.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The configuration in use.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Build the table, size the image, and split the work.  The table
    /// is only needed for this and is dropped before returning.
    #[instrument(skip(self))]
    pub fn plan(&self) -> Result<Plan> {
        let depth = self.config.depth;
        let table = DpTable::build(&self.grammar, depth)?;
        let partition = partition_with(
            &self.grammar,
            &table,
            depth,
            self.config.units,
            self.config.bootstrap_depth,
        )?;
        for job in &partition.jobs {
            let chars = self
                .grammar
                .expanded_len(&partition.bootstrap[job.range.clone()], job.remaining_depth);
            if chars > isize::max_value() as u64 {
                return Err(RenderError::Resource {
                    what: "expanded job",
                    bytes: usize::max_value(),
                });
            }
        }
        let mapper = PlaneMapper::new(partition.summary.bbox, self.config.scale)?;
        info!(
            width = mapper.width(),
            height = mapper.height(),
            jobs = partition.jobs.len(),
            "planned render"
        );
        Ok(Plan { partition, mapper })
    }

    /// Plan the render and run it on `backend`.
    #[instrument(skip(self, backend, coloring), fields(using = backend.name()))]
    pub fn render<B: Backend + ?Sized>(&self, backend: &B, coloring: &dyn Coloring) -> Result<Rendered> {
        let plan = self.plan()?;
        let ctx = DrawContext {
            grammar: &self.grammar,
            bootstrap: &plan.partition.bootstrap,
            mapper: &plan.mapper,
            scale: self.config.scale,
            coloring,
        };
        let rendered = backend.execute(&plan.partition.jobs, &ctx)?;
        info!(
            points = rendered.units.iter().map(|u| u.events).sum::<u64>(),
            lit = rendered.raster.lit(),
            "render complete"
        );
        Ok(rendered)
    }

    /// Rewrite the whole start string and draw it from the origin in
    /// one pass, with no partitioning.
    #[instrument(skip(self, coloring))]
    pub fn render_sequential(&self, coloring: &dyn Coloring) -> Result<Rendered> {
        let depth = self.config.depth;
        let table = DpTable::build(&self.grammar, depth)?;
        let summary = table.summarize(&self.grammar, self.grammar.start(), depth)?;
        drop(table);

        let mapper = PlaneMapper::new(summary.bbox, self.config.scale)?;
        let mut raster = Raster::new(mapper.width(), mapper.height())?;
        let path = self.grammar.expand_start(depth)?;
        let turtle = Turtle::new(
            &self.grammar,
            &path,
            mapper.to_canvas(&Pose::ORIGIN),
            self.config.scale,
            coloring,
            Progress {
                offset: 0,
                total: path.len() as u64,
            },
        );

        let mut events = 0;
        for point in turtle {
            if let Some(pixel) = mapper.point_to_pixel(point.x, point.y) {
                raster.blend(pixel, point.color);
                events += 1;
            }
        }
        info!(points = events, lit = raster.lit(), "sequential render complete");
        Ok(Rendered {
            raster,
            units: vec![UnitReport {
                events,
                finished: true,
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MessagePassing, SharedMemory, Transfer};
    use crate::coloring::Palette;
    use crate::grammar::Curve;
    use crate::raster::Rgb;

    fn white(_: u64, _: u64) -> Rgb {
        Rgb::WHITE
    }

    fn renderer(curve: Curve, depth: usize, units: usize) -> Renderer {
        let config = RenderConfig {
            depth,
            units,
            ..RenderConfig::default()
        };
        Renderer::new(curve.grammar().unwrap(), config).unwrap()
    }

    #[test]
    fn default_config() {
        let config = RenderConfig::default();
        assert_eq!(config.depth, 10);
        assert_eq!(config.scale, 1);
        assert_eq!(config.bootstrap_depth, 3);
        assert!(config.units >= 1);
    }

    #[test]
    fn bad_configurations_are_rejected() {
        let g = Curve::Koch.grammar().unwrap();
        let zero_scale = RenderConfig {
            scale: 0,
            ..RenderConfig::default()
        };
        assert!(Renderer::new(g.clone(), zero_scale).is_err());
        let zero_units = RenderConfig {
            units: 0,
            ..RenderConfig::default()
        };
        assert!(Renderer::new(g, zero_units).is_err());
    }

    #[test]
    fn koch_depth_one_image_size() {
        let r = renderer(Curve::Koch, 1, 1);
        let plan = r.plan().unwrap();
        assert_eq!(plan.mapper.width(), 13);
        assert_eq!(plan.mapper.height(), 11);
    }

    #[test]
    fn a_single_unit_reproduces_the_reference_colors() {
        let r = renderer(Curve::Dragon, 7, 1);
        let reference = r.render_sequential(&Palette::Hsv).unwrap();
        let streamed = r
            .render(
                &MessagePassing {
                    transfer: Transfer::Streaming,
                },
                &Palette::Hsv,
            )
            .unwrap();
        assert_eq!(reference.raster, streamed.raster);
    }

    #[test]
    fn scale_multiplies_the_points() {
        let one = renderer(Curve::Koch, 2, 1).render_sequential(&white).unwrap();
        let mut config = r_config(2, 1);
        config.scale = 3;
        let three = Renderer::new(Curve::Koch.grammar().unwrap(), config)
            .unwrap()
            .render_sequential(&white)
            .unwrap();
        assert_eq!(one.units[0].events, 26);
        assert_eq!(three.units[0].events, 76);
        assert_eq!(three.raster.width(), 3 * one.raster.width());
    }

    #[test]
    fn renders_too_large_to_hold_are_resource_errors() {
        let r = renderer(Curve::Koch, 32, 4);
        match r.render_sequential(&white) {
            Err(RenderError::Resource { .. }) => {}
            other => panic!("expected a resource error, got {:?}", other.map(|r| r.units)),
        }
        match r.render(&SharedMemory { threads: 0 }, &white) {
            Err(RenderError::Resource { .. }) => {}
            other => panic!("expected a resource error, got {:?}", other.map(|r| r.units)),
        }
    }

    #[test]
    fn partitioned_render_matches_the_sequential_one() {
        for curve in Curve::ALL.iter() {
            let g = curve.grammar().unwrap();
            let depth = (3..=6)
                .take_while(|d| g.expanded_len(g.start(), *d) < 300_000)
                .last()
                .unwrap_or(3);
            let r = renderer(*curve, depth, 5);
            let reference = r.render_sequential(&white).unwrap();
            let threaded = r.render(&SharedMemory { threads: 3 }, &white).unwrap();
            assert_eq!(reference.raster, threaded.raster, "{}", curve);
        }
    }

    fn r_config(depth: usize, units: usize) -> RenderConfig {
        RenderConfig {
            depth,
            units,
            ..RenderConfig::default()
        }
    }
}
