//! The transform-summary table.
//!
//! For every symbol with a rule and every depth `0..=n`, the table
//! records what drawing that symbol's depth-`k` expansion would do:
//! where the turtle ends up, which way it ends up facing, and a box
//! around everything it visits.  Depth `k` is computed from depth
//! `k - 1` alone, so the layers are built bottom-up, once each, and
//! never change afterwards.  None of this touches the expanded string,
//! whose length is exponential in `n`; the table is
//! `O(n × rules × rule length)`.

use crate::error::{RenderError, Result};
use crate::geometry::BoundingBox;
use crate::grammar::{Grammar, Symbol};
use crate::scanner::scan;
use std::collections::HashMap;
use tracing::debug;

/// The net geometric effect of drawing one expansion, in its own frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Summary {
    /// Net displacement along x.
    pub x: f64,
    /// Net displacement along y.
    pub y: f64,
    /// Net change in heading, in `(-2π, 2π)`.
    pub heading: f64,
    /// Covers every point visited, starting from the origin.
    pub bbox: BoundingBox,
}

impl Summary {
    /// Nothing drawn, nothing moved.
    pub const IDENTITY: Summary = Summary {
        x: 0.0,
        y: 0.0,
        heading: 0.0,
        bbox: BoundingBox::ORIGIN,
    };
}

/// One depth of the table.
pub type Layer = HashMap<Symbol, Summary>;

/// Summaries for every rule symbol at every depth up to `depth()`.
#[derive(Clone, Debug)]
pub struct DpTable {
    layers: Vec<Layer>,
}

impl DpTable {
    /// Build layers `0..=max_depth`.  Layer 0 is the identity for every
    /// rule symbol; layer 1 scans each rule body literally; every later
    /// layer scans the rule body against the layer beneath it.
    pub fn build(grammar: &Grammar, max_depth: usize) -> Result<DpTable> {
        let mut layers: Vec<Layer> = Vec::with_capacity(max_depth + 1);
        layers.push(grammar.rule_symbols().map(|s| (s, Summary::IDENTITY)).collect());

        for depth in 1..=max_depth {
            let below = &layers[depth - 1];
            let mut layer = Layer::with_capacity(below.len());
            for symbol in grammar.rule_symbols() {
                let body = grammar.rule(symbol).unwrap_or(&[]);
                let summary = scan(grammar, body, below, depth > 1, &[])?.summary;
                layer.insert(symbol, summary);
            }
            layers.push(layer);
        }

        debug!(
            depth = max_depth,
            symbols = layers[0].len(),
            "built transform-summary table"
        );
        Ok(DpTable { layers })
    }

    /// The deepest layer in the table.
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    /// All summaries at one depth.
    pub fn layer(&self, depth: usize) -> Option<&Layer> {
        self.layers.get(depth)
    }

    /// The summary of `symbol` expanded `depth` times.
    pub fn get(&self, symbol: Symbol, depth: usize) -> Option<&Summary> {
        self.layer(depth).and_then(|layer| layer.get(&symbol))
    }

    /// What drawing `string` expanded `depth` more times would do.
    pub fn summarize(&self, grammar: &Grammar, string: &[Symbol], depth: usize) -> Result<Summary> {
        let layer = self.layer(depth).ok_or_else(|| RenderError::InvalidParameter {
            name: "depth",
            reason: format!("table only reaches depth {}", self.depth()),
        })?;
        Ok(scan(grammar, string, layer, depth > 0, &[])?.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Pose;
    use crate::grammar::Curve;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-9;

    // Walk a string literally, collecting every point the turtle visits.
    fn walk(grammar: &Grammar, path: &[Symbol]) -> Vec<Pose> {
        let mut pose = Pose::ORIGIN;
        let mut points = vec![pose];
        for s in path {
            if grammar.is_forward(*s) {
                pose.advance();
                points.push(pose);
            } else if *s == b'+' {
                pose.heading += grammar.angle();
            } else if *s == b'-' {
                pose.heading -= grammar.angle();
            }
        }
        points
    }

    #[test]
    fn depth_zero_is_identity() {
        for curve in Curve::ALL.iter() {
            let g = curve.grammar().unwrap();
            let table = DpTable::build(&g, 0).unwrap();
            assert_eq!(table.depth(), 0);
            for symbol in g.rule_symbols() {
                assert_eq!(table.get(symbol, 0), Some(&Summary::IDENTITY));
            }
        }
    }

    #[test]
    fn every_rule_symbol_has_a_summary_at_every_depth() {
        let g = Curve::QuadraticGosper.grammar().unwrap();
        let table = DpTable::build(&g, 4).unwrap();
        for depth in 0..=4 {
            assert_eq!(table.layer(depth).unwrap().len(), 2);
        }
        assert!(table.layer(5).is_none());
    }

    #[test]
    fn koch_depth_one() {
        let g = Curve::Koch.grammar().unwrap();
        let table = DpTable::build(&g, 1).unwrap();
        let f = table.get(b'F', 1).unwrap();
        assert!((f.x - 3.0).abs() < EPS);
        assert!(f.y.abs() < EPS);
        assert!((f.bbox.max_y - 1.0).abs() < EPS);
    }

    #[test]
    fn koch_scales_by_three_per_round() {
        let g = Curve::Koch.grammar().unwrap();
        let table = DpTable::build(&g, 5).unwrap();
        for depth in 1..=5 {
            let f = table.get(b'F', depth).unwrap();
            assert!((f.x - 3f64.powi(depth as i32)).abs() < 1e-6, "depth {}", depth);
            assert!(f.y.abs() < 1e-6);
        }
    }

    #[test]
    fn summaries_match_literal_expansion() {
        for curve in Curve::ALL.iter() {
            let g = curve.grammar().unwrap();
            let table = DpTable::build(&g, 5).unwrap();
            let depths = (0..=5).take_while(|d| g.expanded_len(g.start(), *d) < 200_000);
            for depth in depths {
                let summary = table.summarize(&g, g.start(), depth).unwrap();
                let points = walk(&g, &g.expand_start(depth).unwrap());
                let last = points.last().unwrap();
                assert!((summary.x - last.x).abs() < 1e-6, "{} depth {}", curve, depth);
                assert!((summary.y - last.y).abs() < 1e-6, "{} depth {}", curve, depth);
                for p in &points {
                    assert!(
                        summary.bbox.contains(p.x, p.y, 1e-6),
                        "{} depth {}: {:?} escapes {:?}",
                        curve,
                        depth,
                        p,
                        summary.bbox
                    );
                }
            }
        }
    }

    #[test]
    fn dragon_heading_is_normalized() {
        let g = Curve::Dragon.grammar().unwrap();
        let table = DpTable::build(&g, 12).unwrap();
        for depth in 0..=12 {
            for symbol in g.rule_symbols() {
                let h = table.get(symbol, depth).unwrap().heading;
                assert!(h > -2.0 * PI && h < 2.0 * PI);
            }
        }
    }

    #[test]
    fn summarize_rejects_depths_beyond_the_table() {
        let g = Curve::Levy.grammar().unwrap();
        let table = DpTable::build(&g, 2).unwrap();
        assert!(table.summarize(&g, g.start(), 3).is_err());
    }
}
