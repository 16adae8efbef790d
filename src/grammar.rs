//! An L-system is an alphabet, a rule for some of the symbols in it, a
//! start string, and an angle.  Rewriting replaces every symbol that
//! has a rule with the rule's body, all at once; symbols without a
//! rule are copied through unchanged.  Repeat `n` times, then hand the
//! string to a turtle.
//!
//! The turtle understands three things: symbols marked "forward" move
//! it one unit, `+` turns it left by the angle, and `-` turns it right.
//! Everything else is silent.

use crate::error::{self, GrammarError, RenderError};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// One element of the alphabet.
pub type Symbol = u8;

/// Turn left (counter-clockwise) by the grammar's angle.
pub const TURN_LEFT: Symbol = b'+';

/// Turn right (clockwise) by the grammar's angle.
pub const TURN_RIGHT: Symbol = b'-';

const FULL_TURN: f64 = 2.0 * PI;

/// An immutable, validated L-system.
#[derive(Clone, Debug, PartialEq)]
pub struct Grammar {
    rules: BTreeMap<Symbol, Vec<Symbol>>,
    forward: BTreeSet<Symbol>,
    constants: BTreeSet<Symbol>,
    start: Vec<Symbol>,
    angle: f64,
}

impl Grammar {
    /// Begin describing a grammar with the given start string and turn
    /// angle, in radians.
    pub fn builder(start: &str, angle: f64) -> GrammarBuilder {
        GrammarBuilder {
            start: start.to_string(),
            angle,
            rules: vec![],
            forward: vec![],
            constants: vec![],
        }
    }

    /// The rewrite string for `symbol`, if it has one.
    pub fn rule(&self, symbol: Symbol) -> Option<&[Symbol]> {
        self.rules.get(&symbol).map(|r| r.as_slice())
    }

    /// Does drawing `symbol` move the turtle forward one unit?
    pub fn is_forward(&self, symbol: Symbol) -> bool {
        self.forward.contains(&symbol)
    }

    /// Every symbol that has a rule, in byte order.
    pub fn rule_symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.rules.keys().cloned()
    }

    /// The string rewriting begins from.
    pub fn start(&self) -> &[Symbol] {
        &self.start
    }

    /// The turn angle, in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// One round of rewriting.  The buffer is reserved up front, and
    /// a reservation the allocator refuses is an error rather than an
    /// abort.
    pub fn expand_path(&self, path: &[Symbol]) -> error::Result<Vec<Symbol>> {
        let size = path.iter().fold(0usize, |total, s| {
            total.saturating_add(self.rule(*s).map_or(1, |r| r.len()))
        });
        let mut expanded = Vec::new();
        expanded
            .try_reserve_exact(size)
            .map_err(|_| RenderError::Resource {
                what: "expanded path",
                bytes: size,
            })?;
        for symbol in path {
            match self.rule(*symbol) {
                Some(body) => expanded.extend_from_slice(body),
                None => expanded.push(*symbol),
            }
        }
        Ok(expanded)
    }

    /// `rounds` rounds of rewriting, applied to an arbitrary string.
    /// Fails before doing any work when the result could never be held
    /// in memory.
    pub fn expand(&self, path: &[Symbol], rounds: usize) -> error::Result<Vec<Symbol>> {
        if self.expanded_len(path, rounds) > isize::max_value() as u64 {
            return Err(RenderError::Resource {
                what: "expanded path",
                bytes: usize::max_value(),
            });
        }
        let mut path = path.to_vec();
        for _ in 0..rounds {
            path = self.expand_path(&path)?;
        }
        Ok(path)
    }

    /// The start string, rewritten `rounds` times.
    pub fn expand_start(&self, rounds: usize) -> error::Result<Vec<Symbol>> {
        self.expand(&self.start, rounds)
    }

    /// The length `path` would have after `rounds` rounds of rewriting,
    /// without building it.  Saturates at `u64::MAX`.
    pub fn expanded_len(&self, path: &[Symbol], rounds: usize) -> u64 {
        let mut lengths: BTreeMap<Symbol, u64> = self.rules.keys().map(|s| (*s, 1)).collect();
        for _ in 0..rounds {
            lengths = self
                .rules
                .iter()
                .map(|(symbol, body)| (*symbol, self.measure(body, &lengths)))
                .collect();
        }
        self.measure(path, &lengths)
    }

    fn measure(&self, path: &[Symbol], lengths: &BTreeMap<Symbol, u64>) -> u64 {
        path.iter().fold(0u64, |total, s| {
            total.saturating_add(lengths.get(s).cloned().unwrap_or(1))
        })
    }
}

/// Collects the pieces of a grammar; `build` checks that they make
/// sense together.
#[derive(Clone, Debug)]
pub struct GrammarBuilder {
    start: String,
    angle: f64,
    rules: Vec<(char, String)>,
    forward: Vec<char>,
    constants: Vec<char>,
}

impl GrammarBuilder {
    /// Rewrite `symbol` as `body` on every round.
    pub fn rule(mut self, symbol: char, body: &str) -> Self {
        self.rules.push((symbol, body.to_string()));
        self
    }

    /// Mark `symbol` as a unit forward move.
    pub fn forward(mut self, symbol: char) -> Self {
        self.forward.push(symbol);
        self
    }

    /// Declare `symbol` as part of the alphabet with no rule and no
    /// drawing effect.
    pub fn constant(mut self, symbol: char) -> Self {
        self.constants.push(symbol);
        self
    }

    /// Validate and freeze the grammar.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        if self.start.is_empty() {
            return Err(GrammarError::EmptyStart);
        }
        let turn = self.angle % FULL_TURN;
        if !self.angle.is_finite() || turn.abs() < 1e-12 || (FULL_TURN - turn.abs()) < 1e-12 {
            return Err(GrammarError::DegenerateAngle(self.angle));
        }

        let mut rules = BTreeMap::new();
        for (symbol, body) in &self.rules {
            let symbol = byte(*symbol)?;
            if symbol == TURN_LEFT || symbol == TURN_RIGHT {
                return Err(GrammarError::TurnSymbolRewritten(symbol as char));
            }
            let body = bytes(body)?;
            if rules.insert(symbol, body).is_some() {
                return Err(GrammarError::DuplicateRule(symbol as char));
            }
        }
        let forward = self
            .forward
            .iter()
            .map(|c| byte(*c))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let constants = self
            .constants
            .iter()
            .map(|c| byte(*c))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let grammar = Grammar {
            rules,
            forward,
            constants,
            start: bytes(&self.start)?,
            angle: self.angle,
        };
        grammar.check_defined()?;
        grammar.check_productive()?;
        Ok(grammar)
    }
}

fn byte(c: char) -> Result<Symbol, GrammarError> {
    if c.is_ascii() {
        Ok(c as Symbol)
    } else {
        Err(GrammarError::NonAsciiSymbol(c))
    }
}

fn bytes(s: &str) -> Result<Vec<Symbol>, GrammarError> {
    s.chars().map(byte).collect()
}

impl Grammar {
    fn is_defined(&self, symbol: Symbol) -> bool {
        symbol == TURN_LEFT
            || symbol == TURN_RIGHT
            || self.rules.contains_key(&symbol)
            || self.forward.contains(&symbol)
            || self.constants.contains(&symbol)
    }

    fn check_defined(&self) -> Result<(), GrammarError> {
        let used = self.start.iter().chain(self.rules.values().flatten());
        for symbol in used {
            if !self.is_defined(*symbol) {
                return Err(GrammarError::UndefinedSymbol(*symbol as char));
            }
        }
        Ok(())
    }

    // A rule symbol is productive if its body can eventually emit a
    // forward move or a turn.  Unproductive symbols are harmless unless
    // they refer to each other in a loop.
    fn check_productive(&self) -> Result<(), GrammarError> {
        let mut productive: BTreeSet<Symbol> = BTreeSet::new();
        loop {
            let before = productive.len();
            for (symbol, body) in &self.rules {
                let emits = body.iter().any(|s| {
                    *s == TURN_LEFT
                        || *s == TURN_RIGHT
                        || self.forward.contains(s)
                        || productive.contains(s)
                });
                if emits {
                    productive.insert(*symbol);
                }
            }
            if productive.len() == before {
                break;
            }
        }

        let barren: BTreeSet<Symbol> = self
            .rules
            .keys()
            .filter(|s| !productive.contains(*s))
            .cloned()
            .collect();
        let mut finished = BTreeSet::new();
        for symbol in &barren {
            let mut on_path = BTreeSet::new();
            if let Some(cycle) = self.find_cycle(*symbol, &barren, &mut on_path, &mut finished) {
                return Err(GrammarError::CyclicRule(cycle as char));
            }
        }
        Ok(())
    }

    fn find_cycle(
        &self,
        symbol: Symbol,
        barren: &BTreeSet<Symbol>,
        on_path: &mut BTreeSet<Symbol>,
        finished: &mut BTreeSet<Symbol>,
    ) -> Option<Symbol> {
        if finished.contains(&symbol) {
            return None;
        }
        if !on_path.insert(symbol) {
            return Some(symbol);
        }
        let body = self.rules.get(&symbol).map(|b| b.as_slice()).unwrap_or(&[]);
        for child in body.iter().filter(|c| barren.contains(*c)) {
            if let Some(cycle) = self.find_cycle(*child, barren, on_path, finished) {
                return Some(cycle);
            }
        }
        on_path.remove(&symbol);
        finished.insert(symbol);
        None
    }
}

/// The curves the renderer knows by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Curve {
    /// Heighway dragon.
    Dragon,
    /// Quadratic Koch curve.
    Koch,
    /// Sierpinski triangle, drawn with two forward symbols.
    Sierpinski,
    /// Quadratic Gosper (flowsnake on a square grid).
    QuadraticGosper,
    /// Lévy C curve, four copies around a square.
    Levy,
    /// Penrose-style pentaplexity.
    Pentaplexity,
}

impl Curve {
    /// All of them, in their traditional numbering.
    pub const ALL: [Curve; 6] = [
        Curve::Dragon,
        Curve::Koch,
        Curve::Sierpinski,
        Curve::QuadraticGosper,
        Curve::Levy,
        Curve::Pentaplexity,
    ];

    /// The name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Curve::Dragon => "dragon",
            Curve::Koch => "koch",
            Curve::Sierpinski => "sierpinski",
            Curve::QuadraticGosper => "gosper",
            Curve::Levy => "levy",
            Curve::Pentaplexity => "pentaplexity",
        }
    }

    /// The grammar for this curve.
    pub fn grammar(self) -> Result<Grammar, GrammarError> {
        let builder = match self {
            Curve::Dragon => Grammar::builder("FX", PI / 2.0)
                .rule('X', "X+YF+")
                .rule('Y', "-FX-Y")
                .forward('F'),
            Curve::Koch => Grammar::builder("F", PI / 2.0)
                .rule('F', "F+F-F-F+F")
                .forward('F'),
            Curve::Sierpinski => Grammar::builder("F-G-G", PI * 2.0 / 3.0)
                .rule('F', "F-G+F+G-F")
                .rule('G', "GG")
                .forward('F')
                .forward('G'),
            Curve::QuadraticGosper => Grammar::builder("-YF", PI / 2.0)
                .rule(
                    'X',
                    "XFX-YF-YF+FX+FX-YF-YFFX+YF+FXFXYF-FX+YF+FXFX+YF-FXYF-YF-FX+FX+YFYF-",
                )
                .rule(
                    'Y',
                    "+FXFX-YF-YF+FX+FXYF+FX-YFYF-FX-YF+FXYFYF-FX-YFFX+FX+YF-YF-FX+FX+YFY",
                )
                .forward('F'),
            Curve::Levy => Grammar::builder("F++F++F++F", PI / 4.0)
                .rule('F', "-F++F-")
                .forward('F'),
            Curve::Pentaplexity => Grammar::builder("F++F++F++F++F", PI / 5.0)
                .rule('F', "F++F++F+++++F-F++F")
                .forward('F'),
        };
        builder.build()
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Curve {
    type Err = String;

    /// Accepts either the curve's name or its index in `Curve::ALL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = usize::from_str(s) {
            return Curve::ALL
                .get(index)
                .cloned()
                .ok_or_else(|| format!("There is no curve number {}", index));
        }
        Curve::ALL
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .cloned()
            .ok_or_else(|| format!("Unknown curve '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn koch() -> Grammar {
        Curve::Koch.grammar().unwrap()
    }

    #[test]
    fn koch_expands_once() {
        assert_eq!(koch().expand_start(1).unwrap(), b"F+F-F-F+F".to_vec());
    }

    #[test]
    fn koch_second_round_substitutes_every_f() {
        let g = koch();
        let once = String::from_utf8(g.expand_start(1).unwrap()).unwrap();
        let by_hand = once.replace("F", "F+F-F-F+F");
        assert_eq!(g.expand_start(2).unwrap(), by_hand.into_bytes());
    }

    #[test]
    fn zero_rounds_is_the_start_string() {
        let g = Curve::Dragon.grammar().unwrap();
        assert_eq!(g.expand_start(0).unwrap(), b"FX".to_vec());
    }

    #[test]
    fn a_start_without_rules_is_a_fixed_point() {
        let g = Grammar::builder("F+F", PI / 3.0)
            .rule('X', "XF")
            .forward('F')
            .build()
            .unwrap();
        for n in 0..6 {
            assert_eq!(g.expand_start(n).unwrap(), b"F+F".to_vec());
        }
    }

    #[test]
    fn expanded_len_matches_real_expansion() {
        for curve in Curve::ALL.iter() {
            let g = curve.grammar().unwrap();
            for n in 0..5 {
                assert_eq!(
                    g.expanded_len(g.start(), n),
                    g.expand_start(n).unwrap().len() as u64,
                    "{} at depth {}",
                    curve,
                    n
                );
            }
        }
    }

    #[test]
    fn expanded_len_saturates() {
        let g = Curve::Levy.grammar().unwrap();
        assert_eq!(g.expanded_len(g.start(), 200), u64::MAX);
    }

    #[test]
    fn expansion_too_large_to_hold_is_a_resource_error() {
        let g = koch();
        match g.expand_start(32) {
            Err(RenderError::Resource { what, .. }) => assert_eq!(what, "expanded path"),
            other => panic!("expected a resource error, got {:?}", other.map(|p| p.len())),
        }
        match g.expand(b"F+F", 40) {
            Err(RenderError::Resource { .. }) => {}
            other => panic!("expected a resource error, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn rejects_empty_start() {
        let e = Grammar::builder("", PI / 2.0).build().unwrap_err();
        assert_eq!(e, GrammarError::EmptyStart);
    }

    #[test]
    fn rejects_degenerate_angles() {
        for angle in [0.0, 2.0 * PI, -4.0 * PI, std::f64::NAN, std::f64::INFINITY].iter() {
            let e = Grammar::builder("F", *angle).forward('F').build();
            assert!(e.is_err(), "angle {} accepted", angle);
        }
    }

    #[test]
    fn rejects_rewriting_turns() {
        let e = Grammar::builder("F", PI / 2.0)
            .rule('+', "++")
            .forward('F')
            .build()
            .unwrap_err();
        assert_eq!(e, GrammarError::TurnSymbolRewritten('+'));
    }

    #[test]
    fn rejects_duplicate_rules() {
        let e = Grammar::builder("F", PI / 2.0)
            .rule('F', "FF")
            .rule('F', "F+F")
            .forward('F')
            .build()
            .unwrap_err();
        assert_eq!(e, GrammarError::DuplicateRule('F'));
    }

    #[test]
    fn rejects_missing_rule_references() {
        let e = Grammar::builder("F", PI / 2.0)
            .rule('F', "F+Q")
            .forward('F')
            .build()
            .unwrap_err();
        assert_eq!(e, GrammarError::UndefinedSymbol('Q'));
    }

    #[test]
    fn constants_are_defined() {
        let g = Grammar::builder("F", PI / 2.0)
            .rule('F', "F+Q")
            .forward('F')
            .constant('Q')
            .build();
        assert!(g.is_ok());
    }

    #[test]
    fn rejects_non_ascii() {
        let e = Grammar::builder("F", PI / 2.0)
            .rule('F', "Fλ")
            .forward('F')
            .build()
            .unwrap_err();
        assert_eq!(e, GrammarError::NonAsciiSymbol('λ'));
    }

    #[test]
    fn rejects_cycles_that_never_draw() {
        let e = Grammar::builder("AF", PI / 2.0)
            .rule('A', "B")
            .rule('B', "A")
            .forward('F')
            .build()
            .unwrap_err();
        assert!(matches!(e, GrammarError::CyclicRule(_)));
    }

    #[test]
    fn accepts_erasing_rules() {
        let g = Grammar::builder("AF", PI / 2.0)
            .rule('A', "B")
            .rule('B', "")
            .forward('F')
            .build()
            .unwrap();
        assert_eq!(g.expand_start(2).unwrap(), b"F".to_vec());
    }

    #[test]
    fn every_preset_builds() {
        for curve in Curve::ALL.iter() {
            let g = curve.grammar().unwrap();
            assert!(!g.start().is_empty());
            assert!(g.rule_symbols().count() > 0);
        }
    }

    #[test]
    fn curves_parse_by_name_and_number() {
        assert_eq!("koch".parse::<Curve>(), Ok(Curve::Koch));
        assert_eq!("Dragon".parse::<Curve>(), Ok(Curve::Dragon));
        assert_eq!("3".parse::<Curve>(), Ok(Curve::QuadraticGosper));
        assert!("6".parse::<Curve>().is_err());
        assert!("hilbert".parse::<Curve>().is_err());
    }
}
