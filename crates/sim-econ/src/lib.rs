#![deny(warnings)]

//! Economy math for Entropic Threads: the two-regime cost curve, closed-form
//! purchase totals, and the max-affordable search.
//!
//! Everything here is a pure function over generator configuration and
//! purchase counts; state mutation lives in `sim-runtime`.

use sim_core::config::{cost_ratio, GeneratorConfig, SUPER_START, SUPER_STEP};
use sim_core::Big;

pub mod braid;

/// Cost of the next purchase on a tier that has seen `bought` purchases.
///
/// Pure geometric growth in the tier's ratio, with an extra
/// [`SUPER_STEP`] factor per purchase past [`SUPER_START`].
pub fn next_cost(cfg: &GeneratorConfig, bought: u64) -> Big {
    let ratio = cost_ratio(cfg.tier);
    let base = &cfg.base_cost * &ratio.pow(bought as f64);
    let extra = bought.saturating_sub(SUPER_START);
    if extra > 0 {
        &base * &Big::from_f64(SUPER_STEP).pow(extra as f64)
    } else {
        base
    }
}

/// Total cost of `n` consecutive purchases starting at `bought`.
///
/// Computed as closed-form geometric sums split at the super-scaling
/// boundary; `buy_max` probes counts far too large for a per-unit loop.
pub fn total_cost_for(cfg: &GeneratorConfig, bought: u64, n: u64) -> Big {
    if n == 0 {
        return Big::zero();
    }

    let ratio = cost_ratio(cfg.tier);
    let start = &cfg.base_cost * &ratio.pow(bought as f64);

    let mut total = Big::zero();
    let mut cursor = bought;
    let mut remaining = n;

    // Pre-super segment: plain geometric series in the tier ratio.
    if cursor < SUPER_START {
        let pre = remaining.min(SUPER_START - cursor);
        total = geom_sum(&start, &ratio, pre);
        cursor += pre;
        remaining -= pre;
    }
    if remaining == 0 {
        return total;
    }

    // Post-super segment: each step also carries one more SUPER_STEP factor,
    // so the series ratio becomes ratio * SUPER_STEP.
    let super_step = Big::from_f64(SUPER_STEP);
    let mut seg_start = &start * &ratio.pow((cursor - bought) as f64);
    let super_exponent = cursor - SUPER_START;
    if super_exponent > 0 {
        seg_start = &seg_start * &super_step.pow(super_exponent as f64);
    }
    let post_ratio = &ratio * &super_step;
    &total + &geom_sum(&seg_start, &post_ratio, remaining)
}

/// Outcome of a max-affordable probe: how many units and their exact total.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchasePlan {
    pub count: u64,
    pub cost: Big,
}

impl PurchasePlan {
    fn nothing() -> Self {
        PurchasePlan {
            count: 0,
            cost: Big::zero(),
        }
    }
}

/// Largest affordable purchase count on a tier, with its exact total cost.
///
/// Exponential doubling finds an unaffordable upper bound, then binary
/// search pins the boundary; cost per probe is one closed-form summation.
pub fn max_affordable(cfg: &GeneratorConfig, bought: u64, budget: &Big) -> PurchasePlan {
    if *budget <= Big::zero() {
        return PurchasePlan::nothing();
    }

    let mut best = PurchasePlan::nothing();
    let mut high: u64 = 1;
    let mut high_cost = total_cost_for(cfg, bought, high);
    while high_cost <= *budget && high < u64::MAX / 2 {
        best = PurchasePlan {
            count: high,
            cost: high_cost,
        };
        high <<= 1;
        high_cost = total_cost_for(cfg, bought, high);
    }

    let mut low = best.count;
    while low + 1 < high {
        let mid = low + (high - low) / 2;
        let cost = total_cost_for(cfg, bought, mid);
        if cost <= *budget {
            best = PurchasePlan { count: mid, cost };
            low = mid;
        } else {
            high = mid;
        }
    }

    best
}

/// Geometric series: start + start*r + ... for `count` terms. A ratio of
/// exactly one degenerates to the linear case.
fn geom_sum(start: &Big, ratio: &Big, count: u64) -> Big {
    if count == 0 {
        return Big::zero();
    }
    if *ratio == Big::one() {
        return start * &Big::from_u64(count);
    }
    let numerator = &ratio.pow(count as f64) - &Big::one();
    let denominator = ratio - &Big::one();
    &(start * &numerator) / &denominator
}
