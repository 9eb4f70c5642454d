//! Dice expressions, rolls and deterministic dice sources.
//!
//! A [`DiceExpr`] is parsed once from notation such as `2d6+3` and rolled any
//! number of times against a [`DiceRoller`]. Every evaluation yields an
//! immutable [`DieRoll`] that remembers the individual faces, the flat modifier
//! and the advantage mode it was rolled with.
//!
//! # Determinism
//!
//! All randomness flows through [`DiceRoller`]. [`PcgRng`] is a seeded
//! generator, so the same seed replays the same battle. [`ScriptedDice`] pops
//! forced faces first and is what tests use to pin a natural 20 or a natural 1.

use std::collections::VecDeque;
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::error::{ErrorSeverity, GameError};

/// Source of die faces.
pub trait DiceRoller {
    /// Roll a die with N sides (1-N inclusive). Zero-sided dice yield 0.
    fn roll_die(&mut self, sides: u32) -> u32;
}

/// PCG random number generator (PCG-XSH-RR, 64-bit state, 32-bit output).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PcgRng {
    state: u64,
}

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    /// Creates a generator whose sequence is fully determined by `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            state: mix_seed(seed),
        }
    }

    /// Advances the state and returns the next 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
        let state = self.state;
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl DiceRoller for PcgRng {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        (self.next_u32() % sides) + 1
    }
}

/// SplitMix-style avalanche so nearby seeds diverge immediately.
fn mix_seed(seed: u64) -> u64 {
    let mut hash = seed ^ 0x9e3779b97f4a7c15;
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xc4ceb9fe1a85ec53);
    hash ^ (hash >> 33)
}

/// Dice source that replays forced faces before falling back to a seeded PCG.
///
/// Forced faces are clamped into `1..=sides` of whatever die consumes them.
#[derive(Clone, Debug)]
pub struct ScriptedDice {
    forced: VecDeque<u32>,
    fallback: PcgRng,
}

impl ScriptedDice {
    pub fn new(forced: impl IntoIterator<Item = u32>) -> Self {
        Self {
            forced: forced.into_iter().collect(),
            fallback: PcgRng::seeded(0),
        }
    }

    pub fn with_fallback_seed(mut self, seed: u64) -> Self {
        self.fallback = PcgRng::seeded(seed);
        self
    }

    /// Appends more forced faces to the back of the script.
    pub fn push(&mut self, faces: impl IntoIterator<Item = u32>) {
        self.forced.extend(faces);
    }

    /// Number of forced faces not yet consumed.
    pub fn remaining(&self) -> usize {
        self.forced.len()
    }
}

impl DiceRoller for ScriptedDice {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        match self.forced.pop_front() {
            Some(face) => face.clamp(1, sides),
            None => self.fallback.roll_die(sides),
        }
    }
}

/// How a roll treats duplicate dice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum RollMode {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl RollMode {
    /// Maps a net advantage balance (+1, 0, -1) onto a roll mode.
    pub fn from_balance(balance: i8) -> Self {
        match balance.signum() {
            1 => Self::Advantage,
            -1 => Self::Disadvantage,
            _ => Self::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    #[error("empty dice expression")]
    Empty,

    #[error("invalid dice term `{0}`")]
    InvalidTerm(String),

    #[error("dice terms cannot be subtracted: `{0}`")]
    NegativeDice(String),

    #[error("dice expression out of range: `{0}`")]
    Overflow(String),
}

impl GameError for DiceError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "DICE_EMPTY",
            Self::InvalidTerm(_) => "DICE_INVALID_TERM",
            Self::NegativeDice(_) => "DICE_NEGATIVE_DICE",
            Self::Overflow(_) => "DICE_OVERFLOW",
        }
    }
}

/// `count` dice with `sides` faces each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiceTerm {
    pub count: u32,
    pub sides: u32,
}

/// Parsed dice notation: a sum of dice terms plus a flat modifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct DiceExpr {
    terms: Vec<DiceTerm>,
    modifier: i32,
}

impl DiceExpr {
    pub fn new(terms: Vec<DiceTerm>, modifier: i32) -> Self {
        Self { terms, modifier }
    }

    /// A single d20 plus `modifier`, the shape of every check and attack roll.
    pub fn d20(modifier: i32) -> Self {
        Self::new(vec![DiceTerm { count: 1, sides: 20 }], modifier)
    }

    /// A constant with no dice.
    pub fn flat(modifier: i32) -> Self {
        Self::new(Vec::new(), modifier)
    }

    pub fn terms(&self) -> &[DiceTerm] {
        &self.terms
    }

    pub fn modifier(&self) -> i32 {
        self.modifier
    }

    /// Returns a copy with `bonus` added to the flat modifier.
    pub fn plus(&self, bonus: i32) -> Self {
        Self::new(self.terms.clone(), self.modifier.saturating_add(bonus))
    }

    pub fn roll(&self, dice: &mut dyn DiceRoller) -> DieRoll {
        self.roll_with(dice, RollMode::Normal)
    }

    /// Rolls every die twice under advantage/disadvantage, keeping max/min.
    pub fn roll_with(&self, dice: &mut dyn DiceRoller, mode: RollMode) -> DieRoll {
        let components = self
            .terms
            .iter()
            .map(|term| roll_term(dice, term.sides, term.count, mode))
            .collect();
        DieRoll {
            components,
            modifier: self.modifier,
            mode,
        }
    }

    /// Critical damage: every dice term rolls twice as many dice.
    pub fn roll_critical(&self, dice: &mut dyn DiceRoller) -> DieRoll {
        let components = self
            .terms
            .iter()
            .map(|term| roll_term(dice, term.sides, term.count.saturating_mul(2), RollMode::Normal))
            .collect();
        DieRoll {
            components,
            modifier: self.modifier,
            mode: RollMode::Normal,
        }
    }
}

fn roll_term(dice: &mut dyn DiceRoller, sides: u32, count: u32, mode: RollMode) -> RolledDice {
    let mut kept = Vec::with_capacity(count as usize);
    let mut dropped = Vec::new();
    for _ in 0..count {
        let first = dice.roll_die(sides);
        match mode {
            RollMode::Normal => kept.push(first),
            RollMode::Advantage | RollMode::Disadvantage => {
                let second = dice.roll_die(sides);
                let (keep, drop) = match (mode, first >= second) {
                    (RollMode::Advantage, true) | (RollMode::Disadvantage, false) => {
                        (first, second)
                    }
                    _ => (second, first),
                };
                kept.push(keep);
                dropped.push(drop);
            }
        }
    }
    RolledDice {
        sides,
        kept,
        dropped,
    }
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(DiceError::Empty);
        }

        let mut terms = Vec::new();
        let mut modifier = 0i32;
        let mut sign = 1i32;
        let mut rest = compact.as_str();
        if let Some(stripped) = rest.strip_prefix('-') {
            sign = -1;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix('+') {
            rest = stripped;
        }

        loop {
            let end = rest.find(['+', '-']).unwrap_or(rest.len());
            let token = &rest[..end];
            if token.is_empty() {
                return Err(DiceError::InvalidTerm(compact.clone()));
            }

            if let Some((count, sides)) = token.split_once(['d', 'D']) {
                if sign < 0 {
                    return Err(DiceError::NegativeDice(token.to_owned()));
                }
                let count = if count.is_empty() {
                    1
                } else {
                    count
                        .parse::<u32>()
                        .map_err(|_| DiceError::InvalidTerm(token.to_owned()))?
                };
                let sides = sides
                    .parse::<u32>()
                    .map_err(|_| DiceError::InvalidTerm(token.to_owned()))?;
                if sides == 0 {
                    return Err(DiceError::InvalidTerm(token.to_owned()));
                }
                // criticals roll twice the count
                if count.checked_mul(2).is_none() {
                    return Err(DiceError::Overflow(token.to_owned()));
                }
                terms.push(DiceTerm { count, sides });
            } else {
                let value = token
                    .parse::<i32>()
                    .map_err(|_| DiceError::InvalidTerm(token.to_owned()))?;
                modifier = modifier
                    .checked_add(sign * value)
                    .ok_or_else(|| DiceError::Overflow(compact.clone()))?;
            }

            if end == rest.len() {
                break;
            }
            sign = if rest.as_bytes()[end] == b'-' { -1 } else { 1 };
            rest = &rest[end + 1..];
        }

        Ok(Self { terms, modifier })
    }
}

impl TryFrom<String> for DiceExpr {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiceExpr> for String {
    fn from(expr: DiceExpr) -> Self {
        expr.to_string()
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for term in &self.terms {
            if !first {
                f.write_str("+")?;
            }
            write!(f, "{}d{}", term.count, term.sides)?;
            first = false;
        }
        match (first, self.modifier) {
            (true, m) => write!(f, "{m}"),
            (false, 0) => Ok(()),
            (false, m) if m > 0 => write!(f, "+{m}"),
            (false, m) => write!(f, "{m}"),
        }
    }
}

/// Faces rolled for one dice term.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RolledDice {
    pub sides: u32,
    pub kept: Vec<u32>,
    /// Faces discarded by advantage or disadvantage.
    pub dropped: Vec<u32>,
}

/// One evaluated dice expression. The numeric result never changes after
/// construction; combining rolls produces a new value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DieRoll {
    components: Vec<RolledDice>,
    modifier: i32,
    mode: RollMode,
}

impl DieRoll {
    /// A roll with no dice, only a flat value.
    pub fn flat(value: i32) -> Self {
        Self {
            components: Vec::new(),
            modifier: value,
            mode: RollMode::Normal,
        }
    }

    pub fn result(&self) -> i32 {
        let faces: i32 = self
            .components
            .iter()
            .flat_map(|c| c.kept.iter())
            .map(|&face| face as i32)
            .sum();
        faces + self.modifier
    }

    pub fn components(&self) -> &[RolledDice] {
        &self.components
    }

    pub fn modifier(&self) -> i32 {
        self.modifier
    }

    pub fn mode(&self) -> RollMode {
        self.mode
    }

    /// The kept face of the first d20 in this roll, if any.
    pub fn natural(&self) -> Option<u32> {
        self.components
            .iter()
            .find(|c| c.sides == 20)
            .and_then(|c| c.kept.first().copied())
    }

    pub fn is_natural_20(&self) -> bool {
        self.natural() == Some(20)
    }

    pub fn is_natural_1(&self) -> bool {
        self.natural() == Some(1)
    }
}

impl Add for DieRoll {
    type Output = DieRoll;

    fn add(mut self, rhs: DieRoll) -> DieRoll {
        self.components.extend(rhs.components);
        self.modifier = self.modifier.saturating_add(rhs.modifier);
        self
    }
}

impl fmt::Display for DieRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            let faces: Vec<String> = component.kept.iter().map(u32::to_string).collect();
            write!(
                f,
                "{}d{}[{}]",
                component.kept.len(),
                component.sides,
                faces.join(",")
            )?;
        }
        if self.modifier != 0 || self.components.is_empty() {
            if self.modifier >= 0 && !self.components.is_empty() {
                f.write_str("+")?;
            }
            write!(f, "{}", self.modifier)?;
        }
        write!(f, "={}", self.result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_notation() {
        let expr: DiceExpr = "2d6+3".parse().unwrap();
        assert_eq!(expr.terms(), &[DiceTerm { count: 2, sides: 6 }]);
        assert_eq!(expr.modifier(), 3);

        let expr: DiceExpr = "1d6 + d4 - 1".parse().unwrap();
        assert_eq!(expr.terms().len(), 2);
        assert_eq!(expr.terms()[1], DiceTerm { count: 1, sides: 4 });
        assert_eq!(expr.modifier(), -1);
        assert_eq!(expr.to_string(), "1d6+1d4-1");

        let flat: DiceExpr = "7".parse().unwrap();
        assert!(flat.terms().is_empty());
        assert_eq!(flat.to_string(), "7");
    }

    #[test]
    fn rejects_malformed_notation() {
        assert_eq!("".parse::<DiceExpr>(), Err(DiceError::Empty));
        assert!(matches!(
            "2d".parse::<DiceExpr>(),
            Err(DiceError::InvalidTerm(_))
        ));
        assert!(matches!(
            "1d0".parse::<DiceExpr>(),
            Err(DiceError::InvalidTerm(_))
        ));
        assert!(matches!(
            "5-1d4".parse::<DiceExpr>(),
            Err(DiceError::NegativeDice(_))
        ));
        assert!(matches!(
            "1d8++2".parse::<DiceExpr>(),
            Err(DiceError::InvalidTerm(_))
        ));
    }

    #[test]
    fn oversized_expressions_are_rejected() {
        assert!(matches!(
            "2000000000+2000000000".parse::<DiceExpr>(),
            Err(DiceError::Overflow(_))
        ));
        assert!(matches!(
            "-2000000000-2000000000".parse::<DiceExpr>(),
            Err(DiceError::Overflow(_))
        ));
        assert!(matches!(
            "3000000000d6".parse::<DiceExpr>(),
            Err(DiceError::Overflow(_))
        ));
        let big: DiceExpr = "2147483647".parse().unwrap();
        assert_eq!(big.plus(1).modifier(), i32::MAX);
    }

    #[test]
    fn advantage_keeps_the_higher_face() {
        let mut dice = ScriptedDice::new([4, 17]);
        let roll = DiceExpr::d20(2).roll_with(&mut dice, RollMode::Advantage);
        assert_eq!(roll.result(), 19);
        assert_eq!(roll.components()[0].dropped, vec![4]);

        let mut dice = ScriptedDice::new([4, 17]);
        let roll = DiceExpr::d20(2).roll_with(&mut dice, RollMode::Disadvantage);
        assert_eq!(roll.result(), 6);
    }

    #[test]
    fn natural_detection_ignores_modifier() {
        let mut dice = ScriptedDice::new([20, 1]);
        let hit = DiceExpr::d20(-5).roll(&mut dice);
        assert!(hit.is_natural_20());
        assert_eq!(hit.result(), 15);

        let miss = DiceExpr::d20(30).roll(&mut dice);
        assert!(miss.is_natural_1());
        assert!(!miss.is_natural_20());
    }

    #[test]
    fn critical_doubles_dice_not_modifier() {
        let mut dice = ScriptedDice::new([3, 5, 2, 6]);
        let roll = "2d6+4".parse::<DiceExpr>().unwrap().roll_critical(&mut dice);
        assert_eq!(roll.components()[0].kept.len(), 4);
        assert_eq!(roll.result(), 3 + 5 + 2 + 6 + 4);
    }

    #[test]
    fn rolls_combine_by_summing() {
        let mut dice = ScriptedDice::new([6, 2]);
        let base = "1d6+2".parse::<DiceExpr>().unwrap().roll(&mut dice);
        let bonus = "1d4".parse::<DiceExpr>().unwrap().roll(&mut dice);
        let total = base.clone() + bonus;
        assert_eq!(total.result(), 10);
        assert_eq!(base.result(), 8);
    }

    #[test]
    fn pcg_is_deterministic_per_seed() {
        let mut a = PcgRng::seeded(42);
        let mut b = PcgRng::seeded(42);
        let mut c = PcgRng::seeded(43);
        let seq_a: Vec<u32> = (0..8).map(|_| a.roll_die(20)).collect();
        let seq_b: Vec<u32> = (0..8).map(|_| b.roll_die(20)).collect();
        let seq_c: Vec<u32> = (0..8).map(|_| c.roll_die(20)).collect();
        assert_eq!(seq_a, seq_b);
        assert_ne!(seq_a, seq_c);
        assert!(seq_a.iter().all(|&face| (1..=20).contains(&face)));
    }

    #[test]
    fn scripted_dice_clamps_and_falls_back() {
        let mut dice = ScriptedDice::new([25]);
        assert_eq!(dice.roll_die(20), 20);
        assert_eq!(dice.remaining(), 0);
        let face = dice.roll_die(6);
        assert!((1..=6).contains(&face));
    }
}
