//! Generator configuration and economy tuning constants.

use crate::num::Big;
use thiserror::Error;

/// Number of generator tiers, Gen1 through Gen12.
pub const NUM_TIERS: usize = 12;

/// Base costs are spaced by powers of ten. Gen2 sits at 10^2 = 100 while the
/// remaining early tiers keep their wider spacing.
const BASE_COST_EXPONENTS: [f64; NUM_TIERS] =
    [1.0, 2.0, 5.0, 7.0, 9.0, 12.0, 15.0, 18.0, 21.0, 24.0, 27.0, 30.0];

/// Strings produced per Gen1 unit per second.
pub const PROD_STRINGS_PER_GEN1: f64 = 0.25;
/// Units fed to the next-lower tier per unit per second.
pub const PROD_CHAIN_PER_TIER: f64 = 0.05;

/// After this many purchases on a tier, an extra cost factor kicks in per
/// purchase to stop late-game blowups.
pub const SUPER_START: u64 = 50;
/// Extra cost multiplier per purchase past [`SUPER_START`].
pub const SUPER_STEP: f64 = 1.03;

/// Production doubles with every purchase on the producing tier.
pub const PER_PURCHASE_MULT: f64 = 2.0;

/// A fresh run starts with this many strings.
pub const STARTING_STRINGS: f64 = 2.0;

/// Tiers are braided into this many disjoint paths (path of a tier is
/// `tier % BRAID_PATH_COUNT`).
pub const BRAID_PATH_COUNT: usize = 4;
/// Reaching this many strings unlocks braiding permanently.
pub const BRAID_UNLOCK_STRINGS: f64 = 1e15;
/// Each chain multiplies production by this base raised to the gain curve.
pub const BRAID_CHAIN_BASE: f64 = 2.0;
/// Gain curve: ((log10 + offset)^exponent - offset^exponent) / divisor.
pub const BRAID_GAIN_OFFSET: f64 = 10.0;
pub const BRAID_GAIN_EXPONENT: f64 = 1.25;
pub const BRAID_GAIN_DIVISOR: f64 = 25.0;
/// Per-path purchase bonus: base^(total_bought^power).
pub const BRAID_PURCHASE_BASE: f64 = 1.01;
pub const BRAID_PURCHASE_POWER: f64 = 0.75;

/// Hard cap on the string pool; progress freezes here until a fiber reset.
pub const FIBER_LIMIT: f64 = 1e120;
/// Each fiber reset multiplies the fiber boost by this factor.
pub const FIBER_BOOST_BASE: f64 = 2.0;

/// Contract violations raised while building or indexing configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Tier index outside `0..NUM_TIERS`.
    #[error("tier {0} is out of range (0..{NUM_TIERS})")]
    TierOutOfRange(usize),
    /// A generator table must have exactly [`NUM_TIERS`] entries in tier order.
    #[error("generator table has {0} entries, expected {NUM_TIERS}")]
    WrongTierCount(usize),
    /// Each tier above zero must feed the tier directly below it.
    #[error("tier {0} does not feed the tier below it")]
    BrokenCascade(usize),
    /// Costs and rates must be strictly positive.
    #[error("tier {0} has a non-positive cost or rate")]
    NonPositiveValue(usize),
}

/// Immutable configuration for one generator tier.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Tier index, 0-based.
    pub tier: usize,
    /// Display name, e.g. "Gen3".
    pub name: String,
    /// Cost of the very first purchase.
    pub base_cost: Big,
    /// The tier this one feeds, or `None` for Gen1 (feeds strings directly).
    pub produces_tier: Option<usize>,
    /// Production rate constant per unit per second.
    pub prod_rate: Big,
}

/// Per-purchase cost ratio for a tier: 10^(tier+1).
pub fn cost_ratio(tier: usize) -> Big {
    Big::pow10((tier + 1) as f64)
}

/// Base cost for a tier, or an error for an out-of-range index.
pub fn tier_base_cost(tier: usize) -> Result<Big, ConfigError> {
    BASE_COST_EXPONENTS
        .get(tier)
        .map(|exp| Big::pow10(*exp))
        .ok_or(ConfigError::TierOutOfRange(tier))
}

/// The full ordered generator table.
#[derive(Clone, Debug)]
pub struct GeneratorSet {
    configs: Vec<GeneratorConfig>,
}

impl GeneratorSet {
    /// The canonical 12-tier table.
    pub fn standard() -> Self {
        let configs = (0..NUM_TIERS)
            .map(|tier| GeneratorConfig {
                tier,
                name: format!("Gen{}", tier + 1),
                base_cost: Big::pow10(BASE_COST_EXPONENTS[tier]),
                produces_tier: if tier == 0 { None } else { Some(tier - 1) },
                prod_rate: Big::from_f64(if tier == 0 {
                    PROD_STRINGS_PER_GEN1
                } else {
                    PROD_CHAIN_PER_TIER
                }),
            })
            .collect();
        GeneratorSet { configs }
    }

    /// Validate and adopt an arbitrary table. The canonical table always
    /// passes; this is the seam for data-driven tier definitions.
    pub fn from_configs(configs: Vec<GeneratorConfig>) -> Result<Self, ConfigError> {
        if configs.len() != NUM_TIERS {
            return Err(ConfigError::WrongTierCount(configs.len()));
        }
        for (idx, cfg) in configs.iter().enumerate() {
            if cfg.tier != idx {
                return Err(ConfigError::TierOutOfRange(cfg.tier));
            }
            let expected = if idx == 0 { None } else { Some(idx - 1) };
            if cfg.produces_tier != expected {
                return Err(ConfigError::BrokenCascade(idx));
            }
            if cfg.base_cost <= Big::zero() || cfg.prod_rate <= Big::zero() {
                return Err(ConfigError::NonPositiveValue(idx));
            }
        }
        Ok(GeneratorSet { configs })
    }

    /// Look up a tier, `None` when out of range. Message-driven callers use
    /// this and treat a miss as a no-op.
    pub fn get(&self, tier: usize) -> Option<&GeneratorConfig> {
        self.configs.get(tier)
    }

    /// Look up a tier where an out-of-range index is a programmer error.
    pub fn require(&self, tier: usize) -> Result<&GeneratorConfig, ConfigError> {
        self.configs.get(tier).ok_or(ConfigError::TierOutOfRange(tier))
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratorConfig> {
        self.configs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_is_valid() {
        let set = GeneratorSet::standard();
        assert_eq!(set.len(), NUM_TIERS);
        GeneratorSet::from_configs(set.configs.clone()).unwrap();
    }

    #[test]
    fn cascade_feeds_downward() {
        let set = GeneratorSet::standard();
        assert_eq!(set.get(0).unwrap().produces_tier, None);
        for tier in 1..NUM_TIERS {
            assert_eq!(set.get(tier).unwrap().produces_tier, Some(tier - 1));
        }
    }

    #[test]
    fn base_costs_match_exponent_table() {
        let set = GeneratorSet::standard();
        assert_eq!(set.get(0).unwrap().base_cost, Big::from_f64(10.0));
        assert_eq!(set.get(1).unwrap().base_cost, Big::from_f64(100.0));
        let top = &set.get(11).unwrap().base_cost;
        assert!((top.log10() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_tier_is_a_contract_error() {
        let set = GeneratorSet::standard();
        assert_eq!(set.require(NUM_TIERS).unwrap_err(), ConfigError::TierOutOfRange(NUM_TIERS));
        assert_eq!(tier_base_cost(99).unwrap_err(), ConfigError::TierOutOfRange(99));
        assert!(set.get(NUM_TIERS).is_none());
    }

    #[test]
    fn broken_tables_are_rejected() {
        let mut configs = GeneratorSet::standard().configs;
        configs[3].produces_tier = Some(0);
        assert_eq!(
            GeneratorSet::from_configs(configs).unwrap_err(),
            ConfigError::BrokenCascade(3)
        );

        let mut configs = GeneratorSet::standard().configs;
        configs.pop();
        assert_eq!(
            GeneratorSet::from_configs(configs).unwrap_err(),
            ConfigError::WrongTierCount(NUM_TIERS - 1)
        );
    }
}
