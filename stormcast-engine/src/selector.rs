//! Daily selection pass over every location of a session.
//!
//! Day zero uses a fixed exclusion list plus a uniform draw with a rare
//! eclipse override. Every later day draws from a history-dependent
//! weighted pool, with a secondary dust roll on a clear result. All draws
//! of a day come from one stream seeded by the map seed, so hosts that
//! share a seed agree on the whole forecast.
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::catalog::{Catalog, KindId, KindTag};
use crate::config::EngineConfig;
use crate::constants::{FACTOR_CLEAR_SCALING_SKIPPED, PERCENT_ROLL_SPAN};
use crate::eligibility::{legal_kinds, random_base_kinds};
use crate::error::ForecastError;
use crate::location::Location;
use crate::pool::{PoolBuilder, PoolDraw, PoolRequest, WeightedCandidate};
use crate::rng::{CountingRng, day_rng};
use crate::state::SessionState;
use crate::weather::BaseWeather;
use crate::weights::WeightTable;

/// Participant role within a multi-participant session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Runs the selector and broadcasts its result.
    Authority,
    /// Receives the forecast from the authority.
    Participant,
}

impl Role {
    #[must_use]
    pub const fn is_authority(self) -> bool {
        matches!(self, Self::Authority)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPhase {
    DayZero,
    RegularDay,
}

impl DayPhase {
    #[must_use]
    pub const fn for_day(day_index: u32) -> Self {
        if day_index == 0 {
            Self::DayZero
        } else {
            Self::RegularDay
        }
    }
}

/// Inbound data for one selection pass.
#[derive(Debug, Clone, Copy)]
pub struct DayInput<'a> {
    pub day_index: u32,
    pub map_seed: i64,
    /// Locations in the order they are processed.
    pub locations: &'a [Location],
    pub intensity: f32,
}

/// How a location's kind was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    /// Day-zero exclusion list.
    PredeterminedClear,
    /// The location has no real condition to draw from.
    NoLegalWeather,
    /// Host-forced condition.
    Forced,
    /// Forced condition whose base kind the catalog does not know.
    ForcedUnknown,
    DayZeroDraw,
    EclipseOverride,
    WeightedDraw,
    DustOverride,
    /// Every legal kind ended up with a non-positive weight.
    EmptyPool,
}

/// One location's outcome with the data needed to explain it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub location: String,
    pub kind: KindId,
    pub kind_name: String,
    pub tag: KindTag,
    pub base: BaseWeather,
    pub rule: SelectionRule,
    /// Yesterday's condition after dust normalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<BaseWeather>,
    /// Slot index drawn from the pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll: Option<usize>,
    pub pool_len: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<WeightedCandidate>,
}

impl Assignment {
    /// Final weight of the chosen kind in the pool it was drawn from.
    #[must_use]
    pub fn chosen_weight(&self) -> Option<i32> {
        self.candidates
            .iter()
            .find(|candidate| candidate.kind == self.kind_name)
            .map(|candidate| candidate.final_weight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStatus {
    Selected,
    /// The caller is not the authority; nothing was selected or changed.
    NotAuthoritative,
}

/// Result of one selection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayForecast {
    pub day_index: u32,
    pub phase: DayPhase,
    pub status: ForecastStatus,
    pub assignments: Vec<Assignment>,
    /// Random draws consumed by the pass.
    pub draws: u64,
}

impl DayForecast {
    fn not_authoritative(day_index: u32) -> Self {
        Self {
            day_index,
            phase: DayPhase::for_day(day_index),
            status: ForecastStatus::NotAuthoritative,
            assignments: Vec::new(),
            draws: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    #[must_use]
    pub fn assignment(&self, location: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.location == location)
    }

    /// Location name to kind name, the form broadcast to participants.
    #[must_use]
    pub fn kind_names(&self) -> BTreeMap<String, String> {
        self.assignments
            .iter()
            .map(|a| (a.location.clone(), a.kind_name.clone()))
            .collect()
    }

    /// Number of locations assigned the normal none kind.
    ///
    /// Progressing kinds that start clear are not counted.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.tag == KindTag::Normal && a.base.is_none())
            .count()
    }
}

/// Runs the day-zero and regular-day rules against borrowed session data.
#[derive(Debug, Clone, Copy)]
pub struct DaySelector<'a> {
    catalog: &'a Catalog,
    weights: &'a WeightTable,
    config: &'a EngineConfig,
}

impl<'a> DaySelector<'a> {
    #[must_use]
    pub const fn new(
        catalog: &'a Catalog,
        weights: &'a WeightTable,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            catalog,
            weights,
            config,
        }
    }

    /// Select today's kind for every location and record it in `state`.
    ///
    /// A participant gets an empty `NotAuthoritative` forecast and `state`
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only when the catalog lacks the none kind or hands
    /// out an id it cannot resolve.
    pub fn select(
        &self,
        state: &mut SessionState,
        role: Role,
        input: &DayInput<'_>,
    ) -> Result<DayForecast, ForecastError> {
        if !role.is_authority() {
            log::info!(
                "Day {}: not the authority, waiting for the forecast",
                input.day_index
            );
            return Ok(DayForecast::not_authoritative(input.day_index));
        }

        let none = self.catalog.none_kind()?;
        let mut rng = day_rng(input.map_seed, self.config.seed_offset);
        let phase = DayPhase::for_day(input.day_index);
        let assignments = match phase {
            DayPhase::DayZero => self.day_zero(input.locations, &mut rng, none)?,
            DayPhase::RegularDay => self.regular_day(state, input, &mut rng, none)?,
        };

        state.begin_day(input.day_index, self.catalog);
        for assignment in &assignments {
            state.record(&assignment.location, assignment.kind);
        }

        let forecast = DayForecast {
            day_index: input.day_index,
            phase,
            status: ForecastStatus::Selected,
            assignments,
            draws: rng.draws(),
        };
        log::info!(
            "Day {}: selected weather for {} locations ({} clear, {} draws)",
            forecast.day_index,
            forecast.assignments.len(),
            forecast.clear_count(),
            forecast.draws
        );
        Ok(forecast)
    }

    fn day_zero(
        &self,
        locations: &[Location],
        rng: &mut CountingRng<ChaCha8Rng>,
        none: KindId,
    ) -> Result<Vec<Assignment>, ForecastError> {
        let excluded = self.day_zero_exclusions(locations, rng);
        log::debug!("Day zero: no weather on {}", excluded.join(", "));

        let mut assignments = Vec::with_capacity(locations.len());
        for location in locations {
            let randoms = random_base_kinds(location);
            if randoms.is_empty() {
                log::debug!("{}: no random weathers, assigning none", location.name);
                assignments.push(self.assign(
                    location,
                    none,
                    SelectionRule::NoLegalWeather,
                    None,
                    None,
                )?);
                continue;
            }
            if excluded.iter().any(|name| *name == location.name) {
                assignments.push(self.assign(
                    location,
                    none,
                    SelectionRule::PredeterminedClear,
                    None,
                    None,
                )?);
                continue;
            }

            let eclipse_roll = rng.gen_range(0..PERCENT_ROLL_SPAN);
            let roll = rng.gen_range(0..randoms.len());
            let drawn = randoms.get(roll).copied().unwrap_or_default();
            let eclipsed = eclipse_roll < self.config.eclipse_chance_percent
                && randoms.contains(&BaseWeather::Eclipsed);
            let (base, rule) = if eclipsed {
                (BaseWeather::Eclipsed, SelectionRule::EclipseOverride)
            } else {
                (drawn, SelectionRule::DayZeroDraw)
            };
            let kind = self.normal_or_none(base, none, &location.name);
            let draw = PoolDraw {
                kind,
                roll,
                pool_len: randoms.len(),
            };
            assignments.push(self.assign(location, kind, rule, None, Some(draw))?);
        }
        Ok(assignments)
    }

    /// Canonical clear locations plus the seeded extra picks for large sessions.
    ///
    /// Extra picks only come from locations that would otherwise get weather.
    fn day_zero_exclusions(
        &self,
        locations: &[Location],
        rng: &mut CountingRng<ChaCha8Rng>,
    ) -> Vec<String> {
        let day_zero = &self.config.day_zero;
        let mut excluded = day_zero.clear_locations.clone();
        let mut pick_from: Vec<&str> = locations
            .iter()
            .filter(|location| !random_base_kinds(location).is_empty())
            .map(|location| location.name.as_str())
            .filter(|name| !excluded.iter().any(|clear| clear == name))
            .collect();

        for _ in 0..day_zero.extra_clear_count(locations.len()) {
            if pick_from.is_empty() {
                log::warn!("Day zero: ran out of locations to keep clear");
                break;
            }
            let index = rng.gen_range(0..pick_from.len());
            let picked = pick_from.get(index).map(ToString::to_string).unwrap_or_default();
            pick_from.retain(|name| *name != picked);
            excluded.push(picked);
        }
        excluded
    }

    fn regular_day(
        &self,
        state: &SessionState,
        input: &DayInput<'_>,
        rng: &mut CountingRng<ChaCha8Rng>,
        none: KindId,
    ) -> Result<Vec<Assignment>, ForecastError> {
        let builder = PoolBuilder::new(self.catalog, self.config);
        let mut assignments = Vec::with_capacity(input.locations.len());

        for location in input.locations {
            let previous = state
                .current_base(&location.name, self.catalog)
                .unwrap_or_default()
                .normalized_previous();

            if random_base_kinds(location).is_empty() {
                log::debug!("{}: no possible weathers, assigning none", location.name);
                assignments.push(self.assign(
                    location,
                    none,
                    SelectionRule::NoLegalWeather,
                    Some(previous),
                    None,
                )?);
                continue;
            }

            if let Some(forced) = location.forced {
                let (kind, rule) = match self.catalog.id_of_base(forced) {
                    Ok(kind) => (kind, SelectionRule::Forced),
                    Err(err) => {
                        log::warn!("{}: {err}; assigning none", location.name);
                        (none, SelectionRule::ForcedUnknown)
                    }
                };
                log::debug!("{}: override present, assigning {forced}", location.name);
                assignments.push(self.assign(location, kind, rule, Some(previous), None)?);
                continue;
            }

            let legal = legal_kinds(location, self.catalog);
            let request = PoolRequest {
                location,
                weights: self.weights.row(previous),
                intensity: input.intensity,
            };
            let pool = builder.build(&legal, &request);
            if pool
                .candidates()
                .iter()
                .flat_map(|candidate| &candidate.multipliers)
                .any(|factor| factor.label == FACTOR_CLEAR_SCALING_SKIPPED)
            {
                log::warn!(
                    "{}: weights after {previous} sum to zero, clear weight left unscaled",
                    location.name
                );
            }

            let Some(draw) = pool.draw(rng) else {
                log::warn!("{}: every legal kind has zero weight, assigning none", location.name);
                let mut assignment =
                    self.assign(location, none, SelectionRule::EmptyPool, Some(previous), None)?;
                assignment.candidates = pool.candidates().to_vec();
                assignments.push(assignment);
                continue;
            };

            let mut kind = draw.kind;
            let mut rule = SelectionRule::WeightedDraw;
            if kind == none
                && location.can_be_dust()
                && rng.gen_range(0..PERCENT_ROLL_SPAN) < self.config.dust_chance_percent
            {
                if let Ok(dust) = self.catalog.id_of_base(BaseWeather::DustClouds) {
                    kind = dust;
                    rule = SelectionRule::DustOverride;
                }
            }

            let mut assignment = self.assign(location, kind, rule, Some(previous), Some(draw))?;
            assignment.candidates = pool.candidates().to_vec();
            if let Some(weight) = assignment.chosen_weight() {
                log::debug!(
                    "{}: after {previous} selected {} (chance {weight} / {})",
                    location.name,
                    assignment.kind_name,
                    draw.pool_len
                );
            }
            assignments.push(assignment);
        }
        Ok(assignments)
    }

    fn normal_or_none(&self, base: BaseWeather, none: KindId, location: &str) -> KindId {
        self.catalog.id_of_base(base).unwrap_or_else(|err| {
            log::warn!("{location}: {err}; assigning none");
            none
        })
    }

    fn assign(
        &self,
        location: &Location,
        kind: KindId,
        rule: SelectionRule,
        previous: Option<BaseWeather>,
        draw: Option<PoolDraw>,
    ) -> Result<Assignment, ForecastError> {
        let entry = self.catalog.resolve(kind)?;
        Ok(Assignment {
            location: location.name.clone(),
            kind,
            kind_name: entry.name().to_string(),
            tag: entry.tag(),
            base: entry.base(),
            rule,
            previous,
            roll: draw.map(|draw| draw.roll),
            pool_len: draw.map_or(0, |draw| draw.pool_len),
            candidates: Vec::new(),
        })
    }
}
