//! The reimbursement formula.
//!
//! One pure function, [`reimburse`], parameterized by [`Coefficients`]. Both
//! the calibration tool and the production CLI call it, so the tuned
//! constants and the formula can never drift apart.
//!
//! ```text
//! per diem → mileage tiers → receipt curve → efficiency bonus
//!     → receipt bump → second-week penalty → excess caps
//!     → rounding-bug factor → trip multiplier → cents
//! ```
//!
//! Every partial amount is shifted by `ROUND_OFFSET` and rounded to cents
//! before it is accumulated, mirroring how the legacy system rounded.

pub mod coefficients;

pub use coefficients::{Bounds, Coefficient, Coefficients};

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn cents(c: &Coefficients, amount: f64) -> f64 {
    round_to(amount + c.round_offset, 2)
}

fn trip_multiplier(c: &Coefficients, days: f64, receipts: f64, miles: f64) -> f64 {
    if days <= 2.0 {
        c.mult_1d
    } else if days == 5.0 {
        c.mult_5d
    } else if (7.0..=8.0).contains(&days) && receipts > 900.0 {
        c.mult_7d
    } else if (9.0..=13.0).contains(&days) && receipts > 1200.0 {
        c.mult_9d
    } else if days >= 14.0 && miles / days.max(1.0) > 180.0 {
        c.mult_14d
    } else {
        1.0
    }
}

/// Receipts whose cents land on .49 or .99 trip a legacy rounding bug.
///
/// The comparison is exact on the floored remainder, so values such as
/// `12.49` whose binary remainder is not exactly `0.49` do not trigger it.
fn has_cents_bug(receipts: f64) -> bool {
    let frac = receipts.rem_euclid(1.0);
    frac == 0.49 || frac == 0.99
}

/// Compute the reimbursement for one trip.
pub fn reimburse(c: &Coefficients, days: f64, miles: f64, receipts: f64) -> f64 {
    let mut total = 0.0;

    // Base per diem and day-5 bonus
    total += cents(c, c.base_pd * days);
    if days == 5.0 {
        total += cents(c, c.bonus_day5);
    }

    // Mileage tiers
    total += cents(c, c.rate_0_100 * miles.min(100.0));
    total += cents(c, c.rate_101_500 * (miles.min(500.0) - 100.0).max(0.0));
    total += cents(c, c.rate_501_800 * (miles.min(800.0) - 500.0).max(0.0));
    total += cents(c, c.rate_801p * (miles - 800.0).max(0.0));

    // Quadratic receipt curve around the peak spend
    let spend_adj = c.curve_a * (receipts - c.peak_spend).powi(2) + receipts;
    total += cents(c, spend_adj.min(c.rec_cap_high).max(0.0));

    if days > 0.0 {
        let z = (miles / days - c.eff_ctr) / c.eff_wdth;
        total += cents(c, c.eff_ampl * (-(z * z)).exp());
    }

    if receipts > c.rec_cap_low {
        total += cents(c, c.rcpt_bump);
    }

    if days > 7.0 {
        total -= cents(c, c.second_week_penalty * (days - 7.0));
    }

    total += cents(c, c.mile_cap_rate * (miles - 800.0).max(0.0));
    total += cents(c, c.rec_cap_rate * (receipts - 1800.0).max(0.0));

    if has_cents_bug(receipts) {
        total *= c.cents_bug_f;
    }

    total *= trip_multiplier(c, days, receipts, miles);

    cents(c, total)
}
