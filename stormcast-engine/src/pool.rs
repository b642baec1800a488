//! Weighted sampling pools.
//!
//! A kind with weight `w` occupies `w` consecutive slots; a uniform draw
//! over the slots is a weighted draw over the kinds. Building a pool never
//! logs. Every adjustment is recorded on the returned candidates instead.
use rand::Rng;
use serde::Serialize;

use crate::catalog::{Catalog, KindCategory, KindId, KindTag, WeatherKind};
use crate::config::EngineConfig;
use crate::constants::{
    FACTOR_CLEAR_SCALING, FACTOR_CLEAR_SCALING_SKIPPED, FACTOR_COMBINED_MODIFIER,
    FACTOR_INTENSITY, FACTOR_PROGRESSING_MODIFIER,
};
use crate::location::Location;
use crate::numbers::{
    clamp_unit_scalar, floor_f64_to_i32, i64_to_f64, round_f64_to_i32, saturate_i64_to_i32,
};
use crate::weather::BaseWeather;
use crate::weights::WeightLookup;

/// Single multiplicative factor applied to a candidate's weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightFactor {
    pub label: String,
    pub value: f64,
}

/// Why a legal kind contributed no slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    Disabled,
    NotApplicable,
}

/// Candidate weight telemetry captured while building a pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedCandidate {
    pub kind: String,
    pub tag: KindTag,
    pub base_weight: i32,
    /// Multipliers applied in order.
    pub multipliers: Vec<WeightFactor>,
    pub final_weight: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped: Option<DropReason>,
}

impl WeightedCandidate {
    fn new(kind: &WeatherKind, base_weight: i32) -> Self {
        Self {
            kind: kind.name().to_string(),
            tag: kind.tag(),
            base_weight,
            multipliers: Vec::new(),
            final_weight: base_weight,
            dropped: None,
        }
    }

    fn factor(&mut self, label: &str, value: f64) {
        self.multipliers.push(WeightFactor {
            label: label.to_string(),
            value,
        });
    }

    fn drop_with(mut self, reason: DropReason) -> Self {
        self.dropped = Some(reason);
        self.final_weight = 0;
        self
    }
}

/// Result of a uniform draw from a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolDraw {
    pub kind: KindId,
    pub roll: usize,
    pub pool_len: usize,
}

/// Ordered slot sequence for one location's draw.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SamplingPool {
    slots: Vec<KindId>,
    candidates: Vec<WeightedCandidate>,
}

impl SamplingPool {
    #[must_use]
    pub fn slots(&self) -> &[KindId] {
        &self.slots
    }

    #[must_use]
    pub fn candidates(&self) -> &[WeightedCandidate] {
        &self.candidates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots held by `kind`.
    #[must_use]
    pub fn count_of(&self, kind: KindId) -> usize {
        self.slots.iter().filter(|slot| **slot == kind).count()
    }

    /// Pick one slot uniformly. `None` for an empty pool.
    pub fn draw<R>(&self, rng: &mut R) -> Option<PoolDraw>
    where
        R: Rng + ?Sized,
    {
        if self.slots.is_empty() {
            return None;
        }
        let roll = rng.gen_range(0..self.slots.len());
        self.slots.get(roll).map(|kind| PoolDraw {
            kind: *kind,
            roll,
            pool_len: self.slots.len(),
        })
    }
}

/// Per-location inputs of a pool build.
#[derive(Debug, Clone, Copy)]
pub struct PoolRequest<'a> {
    pub location: &'a Location,
    /// Row of the weight table for yesterday's condition.
    pub weights: WeightLookup<'a>,
    pub intensity: f32,
}

/// Turns a location's legal kinds into a [`SamplingPool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolBuilder<'a> {
    catalog: &'a Catalog,
    scale_down_clear_weather: bool,
    max_intensity: f32,
}

impl<'a> PoolBuilder<'a> {
    #[must_use]
    pub const fn new(catalog: &'a Catalog, config: &EngineConfig) -> Self {
        Self {
            catalog,
            scale_down_clear_weather: config.scale_down_clear_weather,
            max_intensity: config.max_intensity,
        }
    }

    /// Build the pool. Slot order follows the order of `legal`.
    #[must_use]
    pub fn build(&self, legal: &[KindId], request: &PoolRequest<'_>) -> SamplingPool {
        let intensity = clamp_unit_scalar(request.intensity, self.max_intensity);
        let mut pool = SamplingPool::default();

        for id in legal {
            let Some(kind) = self.catalog.get(*id) else {
                continue;
            };
            let base_weight = request.weights.weight_or(kind.base(), kind.default_weight());
            let mut candidate = WeightedCandidate::new(kind, base_weight);
            let mut weight = base_weight;

            if kind.is_clear() && self.scale_down_clear_weather {
                match self.scaled_clear_weight(request, kind.default_weight()) {
                    Some((scaled, ratio)) => {
                        candidate.factor(FACTOR_CLEAR_SCALING, ratio);
                        weight = scaled;
                    }
                    None => candidate.factor(FACTOR_CLEAR_SCALING_SKIPPED, 1.0),
                }
            }

            match kind.category() {
                KindCategory::Normal => {}
                KindCategory::Combined(combined) => {
                    if !combined.enabled() {
                        pool.candidates.push(candidate.drop_with(DropReason::Disabled));
                        continue;
                    }
                    if !combined.can_apply(request.location) {
                        pool.candidates
                            .push(candidate.drop_with(DropReason::NotApplicable));
                        continue;
                    }
                    let modifier = f64::from(combined.weight_modifier());
                    candidate.factor(FACTOR_COMBINED_MODIFIER, modifier);
                    weight = round_f64_to_i32(f64::from(base_weight) * modifier);
                }
                KindCategory::Progressing(progressing) => {
                    if !progressing.enabled() {
                        pool.candidates.push(candidate.drop_with(DropReason::Disabled));
                        continue;
                    }
                    if !progressing.can_apply(request.location) {
                        pool.candidates
                            .push(candidate.drop_with(DropReason::NotApplicable));
                        continue;
                    }
                    let modifier = f64::from(progressing.weight_modifier());
                    candidate.factor(FACTOR_PROGRESSING_MODIFIER, modifier);
                    weight = round_f64_to_i32(f64::from(base_weight) * modifier);
                }
            }

            if intensity > 0.0 && kind.is_clear() {
                let keep = 1.0 - f64::from(intensity);
                candidate.factor(FACTOR_INTENSITY, keep);
                weight = floor_f64_to_i32(f64::from(weight) * keep);
            }

            candidate.final_weight = weight;
            let copies = usize::try_from(weight).unwrap_or(0);
            pool.slots.extend(std::iter::repeat_n(*id, copies));
            pool.candidates.push(candidate);
        }

        pool
    }

    /// `none * max(candidates, 1) / total`, truncated; `None` when the row sums to zero.
    ///
    /// `candidates` sums the location's declared conditions (dust excluded,
    /// each counted once); absent entries fall back to the kind's default.
    fn scaled_clear_weight(&self, request: &PoolRequest<'_>, fallback: i32) -> Option<(i32, f64)> {
        let total = request.weights.total();
        if total <= 0 {
            return None;
        }
        let clear = i64::from(request.weights.weight_or(BaseWeather::None, fallback));
        let mut seen: Vec<BaseWeather> = Vec::new();
        let mut candidates = 0_i64;
        for base in request
            .location
            .random_weathers
            .iter()
            .copied()
            .filter(|base| !base.is_dust())
        {
            if seen.contains(&base) {
                continue;
            }
            seen.push(base);
            let default = self
                .catalog
                .by_base_kind(base)
                .map_or(fallback, WeatherKind::default_weight);
            candidates += i64::from(request.weights.weight_or(base, default));
        }
        let numerator = candidates.max(1);
        let scaled = saturate_i64_to_i32(clear.saturating_mul(numerator) / total);
        Some((scaled, i64_to_f64(numerator) / i64_to_f64(total)))
    }
}
