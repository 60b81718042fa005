//! Mutable game state and its serialized wire form.
//!
//! The simulation core owns a single [`GameState`]; everything that crosses
//! the worker boundary or lands on disk is a [`SerializedGameState`] with all
//! big values rendered as decimal strings. Deserialization is deliberately
//! forgiving: every missing or malformed field falls back to a documented
//! default, arrays are padded or truncated to their fixed lengths, and the
//! string pool is clamped against the fiber cap.

use crate::config::{
    BRAID_PATH_COUNT, BRAID_UNLOCK_STRINGS, FIBER_LIMIT, NUM_TIERS, STARTING_STRINGS,
};
use crate::num::Big;
use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One generator tier's mutable state.
///
/// `units` is accumulated production capacity (cascade output lands here, so
/// it is fractional); `bought` counts purchase actions and drives both the
/// cost curve position and the per-purchase production exponent.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorState {
    pub units: Big,
    pub bought: u64,
}

impl GeneratorState {
    pub fn empty() -> Self {
        GeneratorState {
            units: Big::zero(),
            bought: 0,
        }
    }
}

/// A zeroed generator array, one entry per tier.
pub fn new_generator_states() -> Vec<GeneratorState> {
    (0..NUM_TIERS).map(|_| GeneratorState::empty()).collect()
}

/// Prestige bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct BraidState {
    /// Completed braid resets.
    pub resets: u64,
    /// Best string total ever banked by a reset; sizes the chain multipliers.
    pub best_strings: Big,
    /// High-water mark of the string pool within the current run.
    pub peak_strings: Big,
    /// String total at the most recent reset.
    pub last_reset_strings: Big,
    /// Current base multiplier per braid path.
    pub chain_multipliers: Vec<Big>,
    /// One-way latch, set the first time the pool reaches the unlock
    /// threshold.
    pub unlocked: bool,
}

impl BraidState {
    pub fn new() -> Self {
        BraidState {
            resets: 0,
            best_strings: Big::zero(),
            peak_strings: Big::zero(),
            last_reset_strings: Big::zero(),
            chain_multipliers: vec![Big::one(); BRAID_PATH_COUNT],
            unlocked: false,
        }
    }
}

impl Default for BraidState {
    fn default() -> Self {
        BraidState::new()
    }
}

/// Hard-cap layer bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct FiberState {
    /// Completed fiber resets.
    pub resets: u64,
    /// Production multiplier earned by fiber resets, never below 1.
    pub boost: Big,
    /// One-way latch, set when the pool reaches the fiber limit.
    pub limit_reached: bool,
}

impl FiberState {
    pub fn new() -> Self {
        FiberState {
            resets: 0,
            boost: Big::one(),
            limit_reached: false,
        }
    }
}

impl Default for FiberState {
    fn default() -> Self {
        FiberState::new()
    }
}

/// Root simulation state, exclusively owned by the simulation core while it
/// runs. Callers only ever see serialized snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    pub strings: Big,
    pub gens: Vec<GeneratorState>,
    /// Wall-clock milliseconds of the last integration.
    pub last_tick: i64,
    /// Wall-clock milliseconds of first creation. Survives braid and fiber
    /// resets: time played is a lifetime statistic.
    pub created: i64,
    pub braid: BraidState,
    pub fiber: FiberState,
    /// Monotonic lifetime counter of strings ever produced.
    pub total_strings_produced: Big,
}

impl GameState {
    pub fn new(now_ms: i64) -> Self {
        GameState {
            strings: Big::from_f64(STARTING_STRINGS),
            gens: new_generator_states(),
            last_tick: now_ms,
            created: now_ms,
            braid: BraidState::new(),
            fiber: FiberState::new(),
            total_strings_produced: Big::zero(),
        }
    }

    /// The fiber cap as a number.
    pub fn fiber_cap() -> Big {
        Big::from_f64(FIBER_LIMIT)
    }

    pub fn to_serialized(&self) -> SerializedGameState {
        SerializedGameState {
            strings: self.strings.to_string(),
            gens: self
                .gens
                .iter()
                .map(|g| SerializedGeneratorState {
                    units: g.units.to_string(),
                    bought: g.bought,
                })
                .collect(),
            last_tick: self.last_tick,
            created: self.created,
            braid: SerializedBraidState {
                resets: self.braid.resets,
                best_strings: self.braid.best_strings.to_string(),
                last_reset_strings: self.braid.last_reset_strings.to_string(),
                chain_multipliers: self
                    .braid
                    .chain_multipliers
                    .iter()
                    .map(|m| m.to_string())
                    .collect(),
                unlocked: self.braid.unlocked,
                peak_strings: self.braid.peak_strings.to_string(),
            },
            total_strings_produced: self.total_strings_produced.to_string(),
            // Write-through mirror kept for older payloads.
            best_strings: self.braid.best_strings.to_string(),
            fiber: SerializedFiberState {
                resets: self.fiber.resets,
                boost: self.fiber.boost.to_string(),
                limit_reached: self.fiber.limit_reached,
            },
        }
    }

    /// Reconstruct a state from its wire form. Never fails; `now_ms` fills
    /// absent timestamps.
    pub fn from_serialized(data: &SerializedGameState, now_ms: i64) -> Self {
        let cap = Self::fiber_cap();

        let gens = (0..NUM_TIERS)
            .map(|tier| match data.gens.get(tier) {
                Some(entry) => GeneratorState {
                    units: Big::parse_or(&entry.units, Big::zero()),
                    bought: entry.bought,
                },
                None => GeneratorState::empty(),
            })
            .collect();

        let best_strings = Big::parse_or(&data.braid.best_strings, Big::zero())
            .max(&Big::parse_or(&data.best_strings, Big::zero()));
        let chain_multipliers = (0..BRAID_PATH_COUNT)
            .map(|idx| match data.braid.chain_multipliers.get(idx) {
                Some(text) => Big::parse_or(text, Big::one()),
                None => Big::one(),
            })
            .collect();
        let unlocked =
            data.braid.unlocked || best_strings >= Big::from_f64(BRAID_UNLOCK_STRINGS);

        let mut fiber = FiberState {
            resets: data.fiber.resets,
            boost: Big::parse_or(&data.fiber.boost, Big::one()).max(&Big::one()),
            limit_reached: data.fiber.limit_reached,
        };

        let mut strings = Big::parse_or(&data.strings, Big::zero());
        if strings > cap {
            debug!("clamping persisted strings to the fiber cap");
            strings = cap.clone();
            fiber.limit_reached = true;
        }

        GameState {
            strings,
            gens,
            last_tick: if data.last_tick > 0 { data.last_tick } else { now_ms },
            created: if data.created > 0 { data.created } else { now_ms },
            braid: BraidState {
                resets: data.braid.resets,
                best_strings,
                peak_strings: Big::parse_or(&data.braid.peak_strings, Big::zero()).min(&cap),
                last_reset_strings: Big::parse_or(&data.braid.last_reset_strings, Big::zero()),
                chain_multipliers,
                unlocked,
            },
            fiber,
            total_strings_produced: Big::parse_or(&data.total_strings_produced, Big::zero())
                .min(&cap),
        }
    }
}

/// Wire form of one generator tier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializedGeneratorState {
    #[serde(deserialize_with = "flex_string")]
    pub units: String,
    #[serde(deserialize_with = "flex_u64")]
    pub bought: u64,
}

/// Wire form of the braid substate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializedBraidState {
    #[serde(deserialize_with = "flex_u64")]
    pub resets: u64,
    #[serde(deserialize_with = "flex_string")]
    pub best_strings: String,
    #[serde(deserialize_with = "flex_string")]
    pub last_reset_strings: String,
    #[serde(deserialize_with = "flex_string_vec")]
    pub chain_multipliers: Vec<String>,
    #[serde(deserialize_with = "flex_bool")]
    pub unlocked: bool,
    #[serde(deserialize_with = "flex_string")]
    pub peak_strings: String,
}

/// Wire form of the fiber substate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializedFiberState {
    #[serde(deserialize_with = "flex_u64")]
    pub resets: u64,
    #[serde(deserialize_with = "flex_string")]
    pub boost: String,
    #[serde(deserialize_with = "flex_bool")]
    pub limit_reached: bool,
}

/// Wire form of the whole game state. All big values are decimal strings so
/// nothing loses precision crossing JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SerializedGameState {
    #[serde(deserialize_with = "flex_string")]
    pub strings: String,
    pub gens: Vec<SerializedGeneratorState>,
    #[serde(deserialize_with = "flex_i64")]
    pub last_tick: i64,
    #[serde(deserialize_with = "flex_i64")]
    pub created: i64,
    pub braid: SerializedBraidState,
    #[serde(deserialize_with = "flex_string")]
    pub total_strings_produced: String,
    /// Legacy mirror of `braid.bestStrings`; the max of the two wins on load.
    #[serde(deserialize_with = "flex_string")]
    pub best_strings: String,
    pub fiber: SerializedFiberState,
}

// Lenient field readers: old and hand-edited saves carry numbers where
// strings belong and vice versa. Anything unreadable degrades to the field
// default instead of failing the whole payload.

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Other(IgnoredAny),
}

fn flex_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match FlexValue::deserialize(de)? {
        FlexValue::Text(s) => s,
        FlexValue::Number(n) => format!("{n}"),
        _ => String::new(),
    })
}

fn flex_string_vec<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexVec {
        Items(Vec<FlexValue>),
        Other(IgnoredAny),
    }
    Ok(match FlexVec::deserialize(de)? {
        FlexVec::Items(items) => items
            .into_iter()
            .map(|item| match item {
                FlexValue::Text(s) => s,
                FlexValue::Number(n) => format!("{n}"),
                _ => String::new(),
            })
            .collect(),
        FlexVec::Other(_) => Vec::new(),
    })
}

fn flex_i64<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
    Ok(match FlexValue::deserialize(de)? {
        FlexValue::Number(n) if n.is_finite() => n as i64,
        FlexValue::Text(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn flex_u64<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
    Ok(match FlexValue::deserialize(de)? {
        FlexValue::Number(n) if n.is_finite() && n > 0.0 => n as u64,
        FlexValue::Text(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn flex_bool<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(match FlexValue::deserialize(de)? {
        FlexValue::Bool(b) => b,
        _ => false,
    })
}
