#![deny(warnings)]

//! Simulation runtime for Entropic Threads: the cascading tick integrator,
//! the purchase engine, braid/fiber reset transitions, and the fixed-step
//! worker loop that drives them.

pub mod command;
pub mod scheduler;
pub mod worker;

use sim_core::config::{
    BRAID_PATH_COUNT, BRAID_UNLOCK_STRINGS, FIBER_BOOST_BASE, PER_PURCHASE_MULT,
    STARTING_STRINGS,
};
use sim_core::{new_generator_states, Big, GameState, GeneratorConfig, GeneratorSet};
use sim_econ::braid;
use sim_econ::{max_affordable, next_cost, total_cost_for};

/// Longest stretch a single integration call will simulate; larger requests
/// are truncated to keep one step from blowing up numerically.
pub const MAX_TICK_SECONDS: f64 = 0.5;

/// Advance the simulation by `dt_seconds`.
///
/// One downward cascade pass per call: every tier's output is computed from
/// its pre-tick unit count, so a unit minted this tick does not itself
/// produce until the next tick. Tier 0 output (times the fiber boost) lands
/// in the string pool.
pub fn advance(state: &mut GameState, cfgs: &GeneratorSet, dt_seconds: f64) {
    let dt = dt_seconds.min(MAX_TICK_SECONDS);
    if dt <= 0.0 {
        return;
    }
    let dt_big = Big::from_f64(dt);

    let tiers = state.gens.len();
    let mut inflow = vec![Big::zero(); tiers];
    for tier in (1..tiers).rev() {
        if let Some(cfg) = cfgs.get(tier) {
            let gen = &state.gens[tier];
            if gen.units.is_zero() {
                continue;
            }
            let rate = effective_rate(state, cfg, gen.bought);
            inflow[tier - 1] = &(&gen.units * &rate) * &dt_big;
        }
    }

    let base_production = cfgs.get(0).map(|cfg| {
        let gen = &state.gens[0];
        let rate = effective_rate(state, cfg, gen.bought);
        let unboosted = &(&gen.units * &rate) * &dt_big;
        &unboosted * &state.fiber.boost
    });

    for (tier, produced) in inflow.into_iter().enumerate() {
        if !produced.is_zero() {
            state.gens[tier].units = &state.gens[tier].units + &produced;
        }
    }
    if let Some(produced) = base_production {
        credit_strings(state, &produced);
    }

    state.last_tick += (dt * 1000.0).round() as i64;
}

/// Production rate for one tier this tick: the configured rate, doubled per
/// purchase, times the tier's braid multiplier.
fn effective_rate(state: &GameState, cfg: &GeneratorConfig, bought: u64) -> Big {
    let power = Big::from_f64(PER_PURCHASE_MULT).pow(bought as f64);
    &(&cfg.prod_rate * &power) * &braid::braid_chain_multiplier(state, cfg.tier)
}

/// Add production to the string pool, maintaining the lifetime counter, the
/// run high-water mark, the braid unlock latch and the fiber cap latch.
fn credit_strings(state: &mut GameState, amount: &Big) {
    if amount.is_zero() {
        return;
    }
    let cap = GameState::fiber_cap();
    state.total_strings_produced = (&state.total_strings_produced + amount).min(&cap);
    let next = &state.strings + amount;
    if next > cap {
        state.strings = cap;
        state.fiber.limit_reached = true;
    } else {
        state.strings = next;
    }
    state.braid.peak_strings = state.braid.peak_strings.max(&state.strings);
    ensure_braid_unlock(state);
}

/// Buy a single unit. Returns false (leaving state untouched) when the tier
/// is unknown or the pool cannot cover the cost.
pub fn buy_one(state: &mut GameState, cfgs: &GeneratorSet, tier: usize) -> bool {
    let Some(cfg) = cfgs.get(tier) else {
        return false;
    };
    if tier >= state.gens.len() {
        return false;
    }
    let cost = next_cost(cfg, state.gens[tier].bought);
    if state.strings < cost {
        return false;
    }
    state.strings = &state.strings - &cost;
    let gen = &mut state.gens[tier];
    gen.units = &gen.units + &Big::one();
    gen.bought += 1;
    true
}

/// Buy `n` units at once, all or nothing.
pub fn buy_n(state: &mut GameState, cfgs: &GeneratorSet, tier: usize, n: u64) -> bool {
    if n == 0 {
        return false;
    }
    let Some(cfg) = cfgs.get(tier) else {
        return false;
    };
    if tier >= state.gens.len() {
        return false;
    }
    let cost = total_cost_for(cfg, state.gens[tier].bought, n);
    if state.strings < cost {
        return false;
    }
    state.strings = &state.strings - &cost;
    let gen = &mut state.gens[tier];
    gen.units = &gen.units + &Big::from_u64(n);
    gen.bought += n;
    true
}

/// Buy as many units as the pool affords on one tier.
pub fn buy_max(state: &mut GameState, cfgs: &GeneratorSet, tier: usize) -> bool {
    let Some(cfg) = cfgs.get(tier) else {
        return false;
    };
    if tier >= state.gens.len() {
        return false;
    }
    let plan = max_affordable(cfg, state.gens[tier].bought, &state.strings);
    if plan.count == 0 {
        return false;
    }
    state.strings = &state.strings - &plan.cost;
    let gen = &mut state.gens[tier];
    gen.units = &gen.units + &Big::from_u64(plan.count);
    gen.bought += plan.count;
    true
}

/// Run `buy_max` on every tier, highest first so late tiers get first claim
/// on the pool. Returns whether anything was bought.
pub fn buy_max_all(state: &mut GameState, cfgs: &GeneratorSet) -> bool {
    let mut purchased = false;
    for tier in (0..state.gens.len()).rev() {
        purchased |= buy_max(state, cfgs, tier);
    }
    purchased
}

/// Latch the braid unlock once the pool (or a previously banked best) ever
/// reaches the threshold. Returns true the moment it flips.
pub fn ensure_braid_unlock(state: &mut GameState) -> bool {
    if state.braid.unlocked {
        return false;
    }
    let progress = state.strings.max(&state.braid.best_strings);
    if progress >= Big::from_f64(BRAID_UNLOCK_STRINGS) {
        state.braid.unlocked = true;
        return true;
    }
    false
}

/// Rebuild every path's base multiplier from the banked best run.
pub fn rebuild_braid_base(state: &mut GameState) -> Big {
    let base = braid::chain_multiplier_from_strings(&state.braid.best_strings);
    state.braid.chain_multipliers = vec![base.clone(); BRAID_PATH_COUNT];
    base
}

/// A braid reset is offered only to a record run: braiding must be unlocked,
/// the pool non-empty, and the run high-water at least the banked best, so a
/// losing run cannot dilute the record and spending cannot revoke an offer.
pub fn can_braid_reset(state: &GameState) -> bool {
    state.braid.unlocked
        && state.strings > Big::zero()
        && state.strings.max(&state.braid.peak_strings) >= state.braid.best_strings
}

/// Bank the current run and restart with rebuilt chain multipliers.
///
/// `created` is deliberately preserved: time played is a lifetime statistic
/// and survives prestige.
pub fn apply_braid_reset(state: &mut GameState, now_ms: i64) -> bool {
    ensure_braid_unlock(state);
    if !can_braid_reset(state) {
        return false;
    }
    let banked = state.strings.clone();
    let run_peak = banked.max(&state.braid.peak_strings);
    state.braid.last_reset_strings = banked;
    if run_peak > state.braid.best_strings {
        state.braid.best_strings = run_peak;
    }
    state.braid.resets += 1;
    rebuild_braid_base(state);
    restart_run(state, now_ms);
    true
}

/// A fiber reset is offered once the pool has hit the hard cap.
pub fn can_fiber_reset(state: &GameState) -> bool {
    state.fiber.limit_reached
}

/// Restart a capped run, growing the fiber boost.
///
/// Minimal policy: mirrors a braid reset (the capped run banks into the
/// braid record) plus a boost bump and latch clear.
/// TODO: revisit whether a fiber reset should leave the braid record alone
/// once the fiber layer gets its full design.
pub fn apply_fiber_reset(state: &mut GameState, now_ms: i64) -> bool {
    if !can_fiber_reset(state) {
        return false;
    }
    let run_peak = state.strings.max(&state.braid.peak_strings);
    state.braid.last_reset_strings = state.strings.clone();
    if run_peak > state.braid.best_strings {
        state.braid.best_strings = run_peak;
    }
    rebuild_braid_base(state);
    state.fiber.resets += 1;
    state.fiber.boost = &state.fiber.boost * &Big::from_f64(FIBER_BOOST_BASE);
    state.fiber.limit_reached = false;
    restart_run(state, now_ms);
    true
}

fn restart_run(state: &mut GameState, now_ms: i64) {
    state.strings = Big::from_f64(STARTING_STRINGS);
    state.gens = new_generator_states();
    state.braid.peak_strings = Big::zero();
    state.last_tick = now_ms;
}

/// Dev cheat: credit strings from a decimal string. Unparseable or
/// non-positive amounts are a no-op.
pub fn dev_add_strings(state: &mut GameState, amount: &str) -> bool {
    let parsed = Big::parse_or(amount, Big::zero());
    if parsed <= Big::zero() {
        return false;
    }
    credit_strings(state, &parsed);
    true
}

/// Dev cheat: grant free units on a tier without touching `bought`.
pub fn dev_add_generators(state: &mut GameState, tier: usize, amount: u64) -> bool {
    if amount == 0 {
        return false;
    }
    let Some(gen) = state.gens.get_mut(tier) else {
        return false;
    };
    gen.units = &gen.units + &Big::from_u64(amount);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::config::NUM_TIERS;

    const NOW: i64 = 1_700_000_000_000;

    fn setup() -> (GameState, GeneratorSet) {
        (GameState::new(NOW), GeneratorSet::standard())
    }

    fn close(a: &Big, b: &Big) -> bool {
        a == b || (a.log10() - b.log10()).abs() < 1e-9
    }

    #[test]
    fn base_tier_feeds_strings() {
        let (mut state, cfgs) = setup();
        state.gens[0].units = Big::from_f64(10.0);
        advance(&mut state, &cfgs, 0.5);
        // 10 units * 0.25/s * 2^0 * braid 1 * boost 1 * 0.5s = 1.25.
        assert!(close(&state.strings, &Big::from_f64(3.25)));
        assert!(close(&state.total_strings_produced, &Big::from_f64(1.25)));
        assert_eq!(state.last_tick, NOW + 500);
    }

    #[test]
    fn oversized_dt_is_clamped() {
        let (mut a, cfgs) = setup();
        let mut b = a.clone();
        a.gens[0].units = Big::from_f64(10.0);
        b.gens[0].units = Big::from_f64(10.0);
        advance(&mut a, &cfgs, 30.0);
        advance(&mut b, &cfgs, MAX_TICK_SECONDS);
        assert_eq!(a, b);
    }

    #[test]
    fn cascade_uses_pre_tick_units() {
        let (mut state, cfgs) = setup();
        state.gens[2].units = Big::from_f64(4.0);
        advance(&mut state, &cfgs, 0.5);
        // Tier 2 feeds tier 1: 4 * 0.05 * 0.5 = 0.1. Tier 1 had nothing at
        // the start of the tick, so tier 0 and strings stay put.
        assert!(close(&state.gens[1].units, &Big::from_f64(0.1)));
        assert!(state.gens[0].units.is_zero());
        assert_eq!(state.strings, Big::from_f64(2.0));
    }

    #[test]
    fn purchases_double_production() {
        let (mut state, cfgs) = setup();
        state.gens[1].units = Big::from_f64(10.0);
        state.gens[1].bought = 2;
        // 10 * 0.05 * 2^2 * 0.5 = 1.0 into tier 0, times the path's
        // purchase bonus.
        let expected = &Big::one() * &braid::braid_chain_multiplier(&state, 1);
        advance(&mut state, &cfgs, 0.5);
        assert!(close(&state.gens[0].units, &expected));
    }

    #[test]
    fn tick_zero_or_negative_dt_is_a_no_op() {
        let (mut state, cfgs) = setup();
        state.gens[0].units = Big::from_f64(10.0);
        let before = state.clone();
        advance(&mut state, &cfgs, 0.0);
        assert_eq!(state, before);
        advance(&mut state, &cfgs, -3.0);
        assert_eq!(state, before);
    }

    #[test]
    fn starting_pool_cannot_afford_gen1() {
        let (mut state, cfgs) = setup();
        // Fresh pool of 2 cannot cover Gen1's base cost of 10.
        let before = state.clone();
        assert!(!buy_one(&mut state, &cfgs, 0));
        assert_eq!(state, before);

        state.strings = Big::from_f64(10.0);
        assert!(buy_one(&mut state, &cfgs, 0));
        assert_eq!(state.gens[0].bought, 1);
        assert_eq!(state.gens[0].units, Big::one());
        assert!(state.strings.is_zero());
    }

    #[test]
    fn failed_purchases_leave_state_untouched() {
        let (mut state, cfgs) = setup();
        state.strings = Big::from_f64(5.0);
        let before = state.clone();
        assert!(!buy_one(&mut state, &cfgs, 0));
        assert!(!buy_n(&mut state, &cfgs, 0, 3));
        assert!(!buy_n(&mut state, &cfgs, 0, 0));
        assert!(!buy_max(&mut state, &cfgs, 0));
        assert!(!buy_one(&mut state, &cfgs, 99));
        assert_eq!(state, before);
    }

    #[test]
    fn buy_max_takes_the_boundary_count() {
        let (mut state, cfgs) = setup();
        state.strings = Big::from_f64(1109.0);
        assert!(buy_max(&mut state, &cfgs, 0));
        assert_eq!(state.gens[0].bought, 2);
        assert_eq!(state.gens[0].units, Big::from_f64(2.0));
        // 1109 - 110 = 999 left.
        assert!(close(&state.strings, &Big::from_f64(999.0)));
    }

    #[test]
    fn buy_max_all_prefers_high_tiers() {
        let (mut state, cfgs) = setup();
        // Enough for one Gen3 (base 10^5) and change for the lower tiers.
        state.strings = Big::from_f64(100_245.0);
        assert!(buy_max_all(&mut state, &cfgs));
        assert_eq!(state.gens[2].bought, 1);
        assert!(state.gens[1].bought > 0);
        assert!(!buy_max_all(&mut state, &cfgs) || state.strings < Big::from_f64(10.0));
    }

    #[test]
    fn braid_unlock_is_a_one_way_latch() {
        let (mut state, _cfgs) = setup();
        assert!(!state.braid.unlocked);
        assert!(dev_add_strings(&mut state, "1e15"));
        assert!(state.braid.unlocked);
        state.strings = Big::zero();
        assert!(!ensure_braid_unlock(&mut state));
        assert!(state.braid.unlocked);
    }

    #[test]
    fn braid_reset_banks_a_record_run() {
        let (mut state, _cfgs) = setup();
        assert!(dev_add_strings(&mut state, "1e16"));
        state.gens[3].bought = 7;
        let created = state.created;

        assert!(apply_braid_reset(&mut state, NOW + 60_000));
        assert_eq!(state.braid.resets, 1);
        // The banked record is the 1e16 cheat on top of the starting pool.
        assert!(close(&state.braid.best_strings, &Big::pow10(16.0)));
        assert!(close(&state.braid.last_reset_strings, &Big::pow10(16.0)));
        assert_eq!(state.strings, Big::from_f64(STARTING_STRINGS));
        assert!(state.gens.iter().all(|g| g.bought == 0 && g.units.is_zero()));
        assert!(state.braid.peak_strings.is_zero());
        assert_eq!(state.created, created);
        assert_eq!(state.last_tick, NOW + 60_000);
        let base = &state.braid.chain_multipliers[0];
        assert!(*base > Big::one());
        assert!(state.braid.chain_multipliers.iter().all(|m| m == base));
    }

    #[test]
    fn braid_reset_requires_a_record_run() {
        let (mut state, _cfgs) = setup();
        assert!(dev_add_strings(&mut state, "1e16"));
        assert!(apply_braid_reset(&mut state, NOW));

        // A short second run cannot reset again.
        assert!(dev_add_strings(&mut state, "1e15"));
        assert!(!can_braid_reset(&mut state));
        assert!(!apply_braid_reset(&mut state, NOW));
        assert_eq!(state.braid.resets, 1);

        // Matching the record re-arms the reset, and spending afterwards
        // does not revoke it.
        assert!(dev_add_strings(&mut state, "1e16"));
        state.strings = Big::from_f64(3.0);
        assert!(can_braid_reset(&state));
        assert!(apply_braid_reset(&mut state, NOW));
        assert_eq!(state.braid.resets, 2);
    }

    #[test]
    fn fiber_cap_latches_and_reset_grows_the_boost() {
        let (mut state, cfgs) = setup();
        assert!(dev_add_strings(&mut state, "1e125"));
        assert_eq!(state.strings, GameState::fiber_cap());
        assert!(state.fiber.limit_reached);

        assert!(!apply_fiber_reset(&mut GameState::new(NOW), NOW));
        assert!(apply_fiber_reset(&mut state, NOW + 1_000));
        assert_eq!(state.fiber.resets, 1);
        assert_eq!(state.fiber.boost, Big::from_f64(FIBER_BOOST_BASE));
        assert!(!state.fiber.limit_reached);
        assert_eq!(state.strings, Big::from_f64(STARTING_STRINGS));
        assert_eq!(state.braid.best_strings, GameState::fiber_cap());

        // The boost and the rebuilt chain base both multiply base-tier
        // string production.
        state.gens[0].units = Big::from_f64(10.0);
        let per_tick = &(&Big::from_f64(1.25) * &state.fiber.boost)
            * &braid::braid_chain_multiplier(&state, 0);
        let expected = &Big::from_f64(STARTING_STRINGS) + &per_tick;
        advance(&mut state, &cfgs, 0.5);
        assert!(close(&state.strings, &expected));
    }

    #[test]
    fn dev_cheats_ignore_garbage() {
        let (mut state, _cfgs) = setup();
        let before = state.clone();
        assert!(!dev_add_strings(&mut state, "not a number"));
        assert!(!dev_add_strings(&mut state, "0"));
        assert!(!dev_add_generators(&mut state, 99, 5));
        assert!(!dev_add_generators(&mut state, 0, 0));
        assert_eq!(state, before);

        assert!(dev_add_generators(&mut state, 2, 5));
        assert_eq!(state.gens[2].units, Big::from_f64(5.0));
        assert_eq!(state.gens[2].bought, 0);
    }

    proptest! {
        #[test]
        fn tick_never_decreases_anything(
            units in proptest::collection::vec(0.0f64..1e9, NUM_TIERS),
            bought in proptest::collection::vec(0u64..60, NUM_TIERS),
            dt in 0.0f64..1.0,
        ) {
            let (mut state, cfgs) = setup();
            for tier in 0..NUM_TIERS {
                state.gens[tier].units = Big::from_f64(units[tier]);
                state.gens[tier].bought = bought[tier];
            }
            let before = state.clone();
            advance(&mut state, &cfgs, dt);
            prop_assert!(state.strings >= before.strings);
            prop_assert!(state.total_strings_produced >= before.total_strings_produced);
            for tier in 0..NUM_TIERS {
                prop_assert!(state.gens[tier].units >= before.gens[tier].units);
                prop_assert_eq!(state.gens[tier].bought, before.gens[tier].bought);
            }
        }

        #[test]
        fn buy_max_spends_within_budget(budget in 1.0f64..1e12, tier in 0usize..NUM_TIERS) {
            let (mut state, cfgs) = setup();
            state.strings = Big::from_f64(budget);
            let before = state.strings.clone();
            if buy_max(&mut state, &cfgs, tier) {
                prop_assert!(state.strings >= Big::zero());
                prop_assert!(state.strings < before);
                prop_assert!(state.gens[tier].bought > 0);
            } else {
                prop_assert_eq!(state.strings, before);
            }
        }
    }
}
