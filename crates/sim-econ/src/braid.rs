//! Braid (prestige) multiplier math.
//!
//! A braid groups the twelve tiers into four disjoint paths (`tier % 4`).
//! Every path shares a base multiplier derived from the best run ever via a
//! softened log curve, and earns an extra bonus from purchases made on its
//! own tiers this run.

use sim_core::config::{
    BRAID_CHAIN_BASE, BRAID_GAIN_DIVISOR, BRAID_GAIN_EXPONENT, BRAID_GAIN_OFFSET,
    BRAID_PATH_COUNT, BRAID_PURCHASE_BASE, BRAID_PURCHASE_POWER,
};
use sim_core::{Big, GameState, GeneratorState};

/// Path a tier belongs to.
pub fn path_index_for_tier(tier: usize) -> usize {
    tier % BRAID_PATH_COUNT
}

/// Softened gain exponent for a given string total.
///
/// `((log10 + offset)^exponent - offset^exponent) / divisor`, floored at
/// zero and guarded against non-finite intermediates.
pub fn chain_exponent(strings: &Big) -> f64 {
    let raw = strings.max(&Big::one()).log10();
    if !raw.is_finite() || raw <= 0.0 {
        return 0.0;
    }
    let softened = (raw + BRAID_GAIN_OFFSET).powf(BRAID_GAIN_EXPONENT)
        - BRAID_GAIN_OFFSET.powf(BRAID_GAIN_EXPONENT);
    let exponent = softened / BRAID_GAIN_DIVISOR;
    if exponent.is_finite() && exponent > 0.0 {
        exponent
    } else {
        0.0
    }
}

/// Base chain multiplier a string total is worth.
pub fn chain_multiplier_from_strings(strings: &Big) -> Big {
    let exponent = chain_exponent(strings);
    if exponent <= 0.0 {
        return Big::one();
    }
    Big::from_f64(BRAID_CHAIN_BASE).pow(exponent)
}

/// Purchases made this run across a path's tiers.
pub fn path_purchase_count(gens: &[GeneratorState], path: usize) -> u64 {
    gens.iter()
        .enumerate()
        .filter(|(tier, _)| path_index_for_tier(*tier) == path)
        .map(|(_, gen)| gen.bought)
        .sum()
}

/// Per-path purchase bonus: `base^(total_bought^power)`, 1 with no
/// purchases.
pub fn purchase_bonus(gens: &[GeneratorState], path: usize) -> Big {
    let total = path_purchase_count(gens, path);
    if total == 0 {
        return Big::one();
    }
    let effective = (total as f64).powf(BRAID_PURCHASE_POWER);
    Big::from_f64(BRAID_PURCHASE_BASE).pow(effective)
}

/// Full multiplier applied to a tier's production: stored path base times
/// the path's purchase bonus. Out-of-range tiers get the neutral multiplier.
pub fn braid_chain_multiplier(state: &GameState, tier: usize) -> Big {
    if tier >= state.gens.len() {
        return Big::one();
    }
    let path = path_index_for_tier(tier);
    let base = state
        .braid
        .chain_multipliers
        .get(path)
        .cloned()
        .unwrap_or_else(Big::one);
    &base * &purchase_bonus(&state.gens, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::config::NUM_TIERS;

    #[test]
    fn paths_partition_all_tiers() {
        let mut counts = [0usize; BRAID_PATH_COUNT];
        for tier in 0..NUM_TIERS {
            counts[path_index_for_tier(tier)] += 1;
        }
        assert!(counts.iter().all(|c| *c == NUM_TIERS / BRAID_PATH_COUNT));
    }

    #[test]
    fn small_totals_earn_no_exponent() {
        assert_eq!(chain_exponent(&Big::zero()), 0.0);
        assert_eq!(chain_exponent(&Big::one()), 0.0);
        assert_eq!(chain_multiplier_from_strings(&Big::from_f64(0.5)), Big::one());
    }

    #[test]
    fn exponent_grows_with_strings() {
        let small = chain_exponent(&Big::pow10(15.0));
        let large = chain_exponent(&Big::pow10(30.0));
        assert!(small > 0.0);
        assert!(large > small);
        // The soft curve stays well below linear log10 growth.
        assert!(large < 30.0);
    }

    #[test]
    fn purchase_bonus_counts_only_the_path() {
        let mut state = GameState::new(0);
        state.gens[0].bought = 10; // path 0
        state.gens[4].bought = 6; // path 0
        state.gens[1].bought = 99; // path 1
        assert_eq!(path_purchase_count(&state.gens, 0), 16);
        assert_eq!(path_purchase_count(&state.gens, 2), 0);
        assert_eq!(purchase_bonus(&state.gens, 2), Big::one());
        assert!(purchase_bonus(&state.gens, 0) > Big::one());
        assert!(purchase_bonus(&state.gens, 1) > purchase_bonus(&state.gens, 0));
    }

    #[test]
    fn tier_multiplier_combines_base_and_bonus() {
        let mut state = GameState::new(0);
        state.braid.chain_multipliers = vec![
            Big::from_f64(2.0),
            Big::from_f64(3.0),
            Big::from_f64(4.0),
            Big::from_f64(5.0),
        ];
        // No purchases: multiplier is exactly the stored base for the path.
        assert_eq!(braid_chain_multiplier(&state, 0), Big::from_f64(2.0));
        assert_eq!(braid_chain_multiplier(&state, 5), Big::from_f64(3.0));
        assert_eq!(braid_chain_multiplier(&state, 11), Big::from_f64(5.0));
        // Out of range: neutral.
        assert_eq!(braid_chain_multiplier(&state, 99), Big::one());

        state.gens[2].bought = 40;
        assert!(braid_chain_multiplier(&state, 2) > Big::from_f64(4.0));
    }
}
