//! Centralized tuning constants for the selection engine.
//!
//! Every default that shapes the random process lives here so that a
//! change to the odds shows up as a reviewed code change. `EngineConfig`
//! falls back to these values when a field is absent.

// Seeding ------------------------------------------------------------------
pub(crate) const WEATHER_STREAM_TAG: &[u8] = b"stormcast.weather";
pub(crate) const PROGRESSION_STREAM_TAG: &[u8] = b"stormcast.progression";
pub const DEFAULT_SEED_OFFSET: i64 = 31;

// Rare-event odds (percent, rolled as `0..100 < chance`) --------------------
pub const DEFAULT_ECLIPSE_CHANCE_PERCENT: u8 = 5;
pub const DEFAULT_DUST_CHANCE_PERCENT: u8 = 25;
pub(crate) const PERCENT_ROLL_SPAN: u8 = 100;

// Weights --------------------------------------------------------------------
pub const DEFAULT_KIND_WEIGHT: i32 = 100;
pub const DEFAULT_WEIGHT_MODIFIER: f32 = 1.0;
pub const DEFAULT_MAX_INTENSITY: f32 = 1.0;
pub const DEFAULT_STAGE_CHANCE: f32 = 1.0;

// Day zero -------------------------------------------------------------------
pub const DAY_ZERO_CLEAR_LOCATIONS: [&str; 2] = ["41 Experimentation", "56 Vow"];
pub const DAY_ZERO_BASELINE_LOCATIONS: usize = 9;
pub const DAY_ZERO_LOCATIONS_PER_EXTRA: usize = 4;

// Trace factor labels ----------------------------------------------------------
pub(crate) const FACTOR_CLEAR_SCALING: &str = "clear_scaling";
pub(crate) const FACTOR_CLEAR_SCALING_SKIPPED: &str = "clear_scaling_skipped";
pub(crate) const FACTOR_COMBINED_MODIFIER: &str = "combined_modifier";
pub(crate) const FACTOR_PROGRESSING_MODIFIER: &str = "progressing_modifier";
pub(crate) const FACTOR_INTENSITY: &str = "intensity";
