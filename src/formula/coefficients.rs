//! Named coefficients for the reimbursement formula.
//!
//! The formula consumes a fixed set of 25 coefficients. They live in a
//! named-field record so the formula reads them by name, while the search
//! code addresses them through [`Coefficient`], an enum whose variants follow
//! the canonical ordering:
//!
//! | Group            | Coefficients                                          |
//! |------------------|-------------------------------------------------------|
//! | Per diem         | BASE_PD, BONUS_DAY5                                   |
//! | Mileage tiers    | RATE_0_100, RATE_101_500, RATE_501_800, RATE_801P     |
//! | Receipt caps     | REC_CAP_LOW, REC_CAP_HIGH                             |
//! | Rounding         | ROUND_OFFSET                                          |
//! | Receipt curve    | CURVE_A, PEAK_SPEND, CURVE_B                          |
//! | Efficiency bonus | EFF_CTR, EFF_WDTH, EFF_AMPL                           |
//! | Adjustments      | RCPT_BUMP, SECOND_WEEK_PENALTY                        |
//! | Quirks and caps  | CENTS_BUG_F, MILE_CAP_RATE, REC_CAP_RATE              |
//! | Trip multipliers | MULT_1D, MULT_5D, MULT_7D, MULT_9D, MULT_14D          |
//!
//! Some coefficients carry declared [`Bounds`]; the annealer clips proposals
//! for those into range. The rest are unconstrained.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed interval a bounded coefficient must stay within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

const MULTIPLIER_BOUNDS: Bounds = Bounds::new(0.7, 1.5);
const CAP_RATE_BOUNDS: Bounds = Bounds::new(0.05, 0.9);

/// Identifies one coefficient by its position in the canonical ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Coefficient {
    BasePd,
    BonusDay5,
    Rate0To100,
    Rate101To500,
    Rate501To800,
    Rate801Plus,
    RecCapLow,
    RecCapHigh,
    RoundOffset,
    CurveA,
    PeakSpend,
    CurveB,
    EffCtr,
    EffWdth,
    EffAmpl,
    RcptBump,
    SecondWeekPenalty,
    CentsBugF,
    MileCapRate,
    RecCapRate,
    Mult1d,
    Mult5d,
    Mult7d,
    Mult9d,
    Mult14d,
}

impl Coefficient {
    /// Every coefficient in canonical order.
    pub const ALL: [Coefficient; 25] = [
        Coefficient::BasePd,
        Coefficient::BonusDay5,
        Coefficient::Rate0To100,
        Coefficient::Rate101To500,
        Coefficient::Rate501To800,
        Coefficient::Rate801Plus,
        Coefficient::RecCapLow,
        Coefficient::RecCapHigh,
        Coefficient::RoundOffset,
        Coefficient::CurveA,
        Coefficient::PeakSpend,
        Coefficient::CurveB,
        Coefficient::EffCtr,
        Coefficient::EffWdth,
        Coefficient::EffAmpl,
        Coefficient::RcptBump,
        Coefficient::SecondWeekPenalty,
        Coefficient::CentsBugF,
        Coefficient::MileCapRate,
        Coefficient::RecCapRate,
        Coefficient::Mult1d,
        Coefficient::Mult5d,
        Coefficient::Mult7d,
        Coefficient::Mult9d,
        Coefficient::Mult14d,
    ];

    /// Number of coefficients in the vector.
    pub const COUNT: usize = Self::ALL.len();

    /// Canonical constant name, as written to the coefficients file.
    pub fn name(self) -> &'static str {
        match self {
            Coefficient::BasePd => "BASE_PD",
            Coefficient::BonusDay5 => "BONUS_DAY5",
            Coefficient::Rate0To100 => "RATE_0_100",
            Coefficient::Rate101To500 => "RATE_101_500",
            Coefficient::Rate501To800 => "RATE_501_800",
            Coefficient::Rate801Plus => "RATE_801P",
            Coefficient::RecCapLow => "REC_CAP_LOW",
            Coefficient::RecCapHigh => "REC_CAP_HIGH",
            Coefficient::RoundOffset => "ROUND_OFFSET",
            Coefficient::CurveA => "CURVE_A",
            Coefficient::PeakSpend => "PEAK_SPEND",
            Coefficient::CurveB => "CURVE_B",
            Coefficient::EffCtr => "EFF_CTR",
            Coefficient::EffWdth => "EFF_WDTH",
            Coefficient::EffAmpl => "EFF_AMPL",
            Coefficient::RcptBump => "RCPT_BUMP",
            Coefficient::SecondWeekPenalty => "SECOND_WEEK_PENALTY",
            Coefficient::CentsBugF => "CENTS_BUG_F",
            Coefficient::MileCapRate => "MILE_CAP_RATE",
            Coefficient::RecCapRate => "REC_CAP_RATE",
            Coefficient::Mult1d => "MULT_1D",
            Coefficient::Mult5d => "MULT_5D",
            Coefficient::Mult7d => "MULT_7D",
            Coefficient::Mult9d => "MULT_9D",
            Coefficient::Mult14d => "MULT_14D",
        }
    }

    /// Declared range, if the coefficient is constrained.
    pub fn bounds(self) -> Option<Bounds> {
        match self {
            Coefficient::CentsBugF => Some(Bounds::new(0.3, 0.9)),
            Coefficient::MileCapRate | Coefficient::RecCapRate => Some(CAP_RATE_BOUNDS),
            Coefficient::Mult1d
            | Coefficient::Mult5d
            | Coefficient::Mult7d
            | Coefficient::Mult9d
            | Coefficient::Mult14d => Some(MULTIPLIER_BOUNDS),
            _ => None,
        }
    }

    /// Look a coefficient up by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The parameter vector consumed by [`crate::formula::reimburse`].
///
/// Serialized with the canonical upper-case constant names so a persisted
/// `[coefficients]` table reads like the constant block it replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Coefficients {
    // === Per diem ===
    pub base_pd: f64,
    pub bonus_day5: f64,

    // === Mileage tiers ===
    pub rate_0_100: f64,
    pub rate_101_500: f64,
    pub rate_501_800: f64,
    pub rate_801p: f64,

    // === Receipt caps ===
    pub rec_cap_low: f64,
    pub rec_cap_high: f64,

    /// Added to every partial amount before rounding to cents.
    pub round_offset: f64,

    // === Receipt curve ===
    pub curve_a: f64,
    pub peak_spend: f64,
    /// Carried for compatibility with older constant blocks; unused by the formula.
    pub curve_b: f64,

    // === Efficiency bonus (gaussian over miles per day) ===
    pub eff_ctr: f64,
    pub eff_wdth: f64,
    pub eff_ampl: f64,

    pub rcpt_bump: f64,
    pub second_week_penalty: f64,

    // === Quirks and excess caps ===
    pub cents_bug_f: f64,
    pub mile_cap_rate: f64,
    pub rec_cap_rate: f64,

    // === Trip-length multipliers ===
    pub mult_1d: f64,
    pub mult_5d: f64,
    pub mult_7d: f64,
    pub mult_9d: f64,
    pub mult_14d: f64,
}

impl Default for Coefficients {
    /// Hand-tuned starting point for calibration.
    fn default() -> Self {
        Self {
            base_pd: 99.9158,
            bonus_day5: 44.08837,
            rate_0_100: 0.446456,
            rate_101_500: 0.3182,
            rate_501_800: 0.24,
            rate_801p: 0.18,
            rec_cap_low: 300.0,
            rec_cap_high: 1150.77,
            round_offset: -3.23459,
            curve_a: -0.0002,
            peak_spend: 700.0,
            curve_b: 150.0,
            eff_ctr: 200.0,
            eff_wdth: 150.0,
            eff_ampl: 25.0,
            rcpt_bump: 2.50,
            second_week_penalty: 12.0,
            cents_bug_f: 0.457,
            mile_cap_rate: 0.25,
            rec_cap_rate: 0.15,
            mult_1d: 1.15,
            mult_5d: 0.92,
            mult_7d: 1.25,
            mult_9d: 0.85,
            mult_14d: 1.20,
        }
    }
}

impl Coefficients {
    pub fn get(&self, coefficient: Coefficient) -> f64 {
        match coefficient {
            Coefficient::BasePd => self.base_pd,
            Coefficient::BonusDay5 => self.bonus_day5,
            Coefficient::Rate0To100 => self.rate_0_100,
            Coefficient::Rate101To500 => self.rate_101_500,
            Coefficient::Rate501To800 => self.rate_501_800,
            Coefficient::Rate801Plus => self.rate_801p,
            Coefficient::RecCapLow => self.rec_cap_low,
            Coefficient::RecCapHigh => self.rec_cap_high,
            Coefficient::RoundOffset => self.round_offset,
            Coefficient::CurveA => self.curve_a,
            Coefficient::PeakSpend => self.peak_spend,
            Coefficient::CurveB => self.curve_b,
            Coefficient::EffCtr => self.eff_ctr,
            Coefficient::EffWdth => self.eff_wdth,
            Coefficient::EffAmpl => self.eff_ampl,
            Coefficient::RcptBump => self.rcpt_bump,
            Coefficient::SecondWeekPenalty => self.second_week_penalty,
            Coefficient::CentsBugF => self.cents_bug_f,
            Coefficient::MileCapRate => self.mile_cap_rate,
            Coefficient::RecCapRate => self.rec_cap_rate,
            Coefficient::Mult1d => self.mult_1d,
            Coefficient::Mult5d => self.mult_5d,
            Coefficient::Mult7d => self.mult_7d,
            Coefficient::Mult9d => self.mult_9d,
            Coefficient::Mult14d => self.mult_14d,
        }
    }

    fn slot_mut(&mut self, coefficient: Coefficient) -> &mut f64 {
        match coefficient {
            Coefficient::BasePd => &mut self.base_pd,
            Coefficient::BonusDay5 => &mut self.bonus_day5,
            Coefficient::Rate0To100 => &mut self.rate_0_100,
            Coefficient::Rate101To500 => &mut self.rate_101_500,
            Coefficient::Rate501To800 => &mut self.rate_501_800,
            Coefficient::Rate801Plus => &mut self.rate_801p,
            Coefficient::RecCapLow => &mut self.rec_cap_low,
            Coefficient::RecCapHigh => &mut self.rec_cap_high,
            Coefficient::RoundOffset => &mut self.round_offset,
            Coefficient::CurveA => &mut self.curve_a,
            Coefficient::PeakSpend => &mut self.peak_spend,
            Coefficient::CurveB => &mut self.curve_b,
            Coefficient::EffCtr => &mut self.eff_ctr,
            Coefficient::EffWdth => &mut self.eff_wdth,
            Coefficient::EffAmpl => &mut self.eff_ampl,
            Coefficient::RcptBump => &mut self.rcpt_bump,
            Coefficient::SecondWeekPenalty => &mut self.second_week_penalty,
            Coefficient::CentsBugF => &mut self.cents_bug_f,
            Coefficient::MileCapRate => &mut self.mile_cap_rate,
            Coefficient::RecCapRate => &mut self.rec_cap_rate,
            Coefficient::Mult1d => &mut self.mult_1d,
            Coefficient::Mult5d => &mut self.mult_5d,
            Coefficient::Mult7d => &mut self.mult_7d,
            Coefficient::Mult9d => &mut self.mult_9d,
            Coefficient::Mult14d => &mut self.mult_14d,
        }
    }

    pub fn set(&mut self, coefficient: Coefficient, value: f64) {
        *self.slot_mut(coefficient) = value;
    }

    /// Copy with one coefficient replaced.
    pub fn with(&self, coefficient: Coefficient, value: f64) -> Self {
        let mut next = self.clone();
        next.set(coefficient, value);
        next
    }

    /// Values in canonical order.
    pub fn to_vec(&self) -> Vec<f64> {
        Coefficient::ALL.iter().map(|&c| self.get(c)).collect()
    }

    /// Coefficients whose value lies outside their declared bounds.
    pub fn out_of_bounds(&self) -> Vec<Coefficient> {
        Coefficient::ALL
            .iter()
            .copied()
            .filter(|&c| c.bounds().is_some_and(|b| !b.contains(self.get(c))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_matches_names() {
        let names: Vec<_> = Coefficient::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), 25);
        assert_eq!(names[0], "BASE_PD");
        assert_eq!(names[8], "ROUND_OFFSET");
        assert_eq!(names[17], "CENTS_BUG_F");
        assert_eq!(names[24], "MULT_14D");
    }

    #[test]
    fn test_get_set_roundtrip_every_slot() {
        let mut coeffs = Coefficients::default();
        for (i, &c) in Coefficient::ALL.iter().enumerate() {
            coeffs.set(c, i as f64 + 0.5);
        }
        assert_eq!(coeffs.to_vec(), (0..25).map(|i| i as f64 + 0.5).collect::<Vec<_>>());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Coefficient::from_name("MULT_9D"), Some(Coefficient::Mult9d));
        assert_eq!(Coefficient::from_name("mult_9d"), None);
    }

    #[test]
    fn test_declared_bounds() {
        assert_eq!(Coefficient::Mult1d.bounds(), Some(Bounds::new(0.7, 1.5)));
        assert_eq!(Coefficient::CentsBugF.bounds(), Some(Bounds::new(0.3, 0.9)));
        assert!(Coefficient::BasePd.bounds().is_none());
        let bounded = Coefficient::ALL.iter().filter(|c| c.bounds().is_some()).count();
        assert_eq!(bounded, 8);
    }

    #[test]
    fn test_defaults_within_bounds() {
        assert!(Coefficients::default().out_of_bounds().is_empty());
        let skewed = Coefficients::default().with(Coefficient::Mult5d, 1.6);
        assert_eq!(skewed.out_of_bounds(), vec![Coefficient::Mult5d]);
    }

    #[test]
    fn test_serializes_with_constant_names() {
        let text = toml::to_string(&Coefficients::default()).unwrap();
        assert!(text.contains("BASE_PD = 99.9158"));
        assert!(text.contains("RATE_801P = 0.18"));
        assert!(text.contains("MULT_14D = 1.2"));
    }
}
