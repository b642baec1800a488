//! Per-session weather bookkeeping.
use serde::Serialize;
use std::collections::BTreeMap;

use crate::catalog::{Catalog, KindId};
use crate::progression::StageTracker;
use crate::weather::BaseWeather;

/// Current and previous conditions for every location of a session.
///
/// Read access is public. Mutation is reserved to the day selector and the
/// session's override and remote-application paths.
#[derive(Debug, Default)]
pub struct SessionState {
    day_index: Option<u32>,
    current: BTreeMap<String, KindId>,
    previous: BTreeMap<String, BaseWeather>,
    active_location: Option<String>,
    local: Option<KindId>,
    stage: Option<Box<dyn StageTracker>>,
}

/// Comparable copy of a [`SessionState`] without the stage tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub day_index: Option<u32>,
    pub current: BTreeMap<String, KindId>,
    pub previous: BTreeMap<String, BaseWeather>,
    pub active_location: Option<String>,
    pub local: Option<KindId>,
    pub stage: Option<BaseWeather>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Day of the most recent selection, if any.
    #[must_use]
    pub const fn day_index(&self) -> Option<u32> {
        self.day_index
    }

    #[must_use]
    pub fn current_kind(&self, location: &str) -> Option<KindId> {
        self.current.get(location).copied()
    }

    /// Base kind of the current assignment. Becomes tomorrow's previous.
    #[must_use]
    pub fn current_base(&self, location: &str, catalog: &Catalog) -> Option<BaseWeather> {
        self.current_kind(location)
            .and_then(|id| catalog.get(id))
            .map(|kind| kind.base())
    }

    /// Yesterday's raw base kind, dust included.
    #[must_use]
    pub fn previous_base(&self, location: &str) -> Option<BaseWeather> {
        self.previous.get(location).copied()
    }

    /// Current assignments in location-name order.
    pub fn assignments(&self) -> impl Iterator<Item = (&str, KindId)> + '_ {
        self.current.iter().map(|(name, id)| (name.as_str(), *id))
    }

    #[must_use]
    pub fn active_location(&self) -> Option<&str> {
        self.active_location.as_deref()
    }

    /// Kind assigned to the active location.
    #[must_use]
    pub const fn local_kind(&self) -> Option<KindId> {
        self.local
    }

    #[must_use]
    pub fn stage(&self) -> Option<&dyn StageTracker> {
        self.stage.as_deref()
    }

    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            day_index: self.day_index,
            current: self.current.clone(),
            previous: self.previous.clone(),
            active_location: self.active_location.clone(),
            local: self.local,
            stage: self.stage.as_ref().map(|stage| stage.current_stage_kind()),
        }
    }

    /// Start `day_index`: today's assignments become yesterday's bases.
    pub(crate) fn begin_day(&mut self, day_index: u32, catalog: &Catalog) {
        self.previous = self
            .current
            .iter()
            .filter_map(|(name, id)| catalog.get(*id).map(|kind| (name.clone(), kind.base())))
            .collect();
        self.current.clear();
        self.day_index = Some(day_index);
    }

    pub(crate) fn record(&mut self, location: &str, kind: KindId) {
        self.current.insert(location.to_string(), kind);
    }

    pub(crate) fn set_active_location(&mut self, location: Option<String>) {
        self.active_location = location;
    }

    /// Replace the local kind and its stage tracker together.
    pub(crate) fn set_local(&mut self, kind: Option<KindId>, stage: Option<Box<dyn StageTracker>>) {
        self.local = kind;
        self.stage = stage;
    }

    pub(crate) fn stage_mut(&mut self) -> Option<&mut (dyn StageTracker + 'static)> {
        self.stage.as_deref_mut()
    }
}
