//! Registry of weather kinds.
//!
//! Every base condition gets exactly one `Normal` entry, named after the
//! base kind. Combined and progressing kinds are named bundles layered on
//! top; their category is fixed when the entry is built, so nothing
//! downstream inspects names to decide how a kind behaves.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::constants::DEFAULT_STAGE_CHANCE;
use crate::definitions::KindDefinitions;
use crate::eligibility::legal_base_kinds;
use crate::error::ForecastError;
use crate::location::Location;
use crate::weather::BaseWeather;

/// Base kinds a weather kind touches (members, stages, or its own base).
pub type EffectSet = SmallVec<[BaseWeather; 4]>;

/// Stable handle to a catalog entry, valid for the catalog that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindId(usize);

impl KindId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Per-kind "can this kind occur here" capability.
///
/// A pure function of a [`Location`], closed over the kind's own parameters.
#[derive(Clone)]
pub struct Applicability(Arc<dyn Fn(&Location) -> bool + Send + Sync>);

impl Applicability {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Location) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Holds when every listed base kind is individually legal at the location.
    pub fn all_legal(required: impl IntoIterator<Item = BaseWeather>) -> Self {
        let required: EffectSet = required.into_iter().collect();
        Self::new(move |location| {
            let legal = legal_base_kinds(location);
            !legal.is_empty() && required.iter().all(|base| legal.contains(base))
        })
    }

    #[must_use]
    pub fn check(&self, location: &Location) -> bool {
        (self.0)(location)
    }
}

impl fmt::Debug for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Applicability(..)")
    }
}

/// Category tag without payload, for reports and traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindTag {
    Normal,
    Combined,
    Progressing,
}

/// A fixed bundle of base kinds selected as one weighted unit.
#[derive(Debug, Clone)]
pub struct CombinedWeather {
    members: EffectSet,
    enabled: bool,
    weight_modifier: f32,
    applies: Applicability,
}

impl CombinedWeather {
    #[must_use]
    pub fn members(&self) -> &[BaseWeather] {
        &self.members
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn weight_modifier(&self) -> f32 {
        self.weight_modifier
    }

    #[must_use]
    pub fn can_apply(&self, location: &Location) -> bool {
        self.applies.check(location)
    }
}

/// One timed transition inside a progressing kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionStage {
    /// Fraction of the day (0.0..=1.0) at which the transition is attempted.
    pub at: f32,
    pub weather: BaseWeather,
    /// Probability that the transition happens when its time is reached.
    #[serde(default = "default_stage_chance")]
    pub chance: f32,
}

const fn default_stage_chance() -> f32 {
    DEFAULT_STAGE_CHANCE
}

/// A multi-stage kind whose active condition changes over the day.
#[derive(Debug, Clone)]
pub struct ProgressingWeather {
    starting: BaseWeather,
    stages: Vec<ProgressionStage>,
    enabled: bool,
    weight_modifier: f32,
    applies: Applicability,
}

impl ProgressingWeather {
    #[must_use]
    pub const fn starting(&self) -> BaseWeather {
        self.starting
    }

    /// Stages ordered by their trigger time.
    #[must_use]
    pub fn stages(&self) -> &[ProgressionStage] {
        &self.stages
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn weight_modifier(&self) -> f32 {
        self.weight_modifier
    }

    #[must_use]
    pub fn can_apply(&self, location: &Location) -> bool {
        self.applies.check(location)
    }

    /// Starting kind followed by every distinct stage kind.
    #[must_use]
    pub fn stage_kinds(&self) -> EffectSet {
        let mut kinds = EffectSet::new();
        for base in std::iter::once(self.starting).chain(self.stages.iter().map(|s| s.weather)) {
            if !kinds.contains(&base) {
                kinds.push(base);
            }
        }
        kinds
    }
}

#[derive(Debug, Clone)]
pub enum KindCategory {
    Normal,
    Combined(CombinedWeather),
    Progressing(ProgressingWeather),
}

/// A catalog entry.
#[derive(Debug, Clone)]
pub struct WeatherKind {
    name: String,
    base: BaseWeather,
    default_weight: i32,
    category: KindCategory,
}

impl WeatherKind {
    /// Normal entry for a base kind, named after it.
    #[must_use]
    pub fn normal(base: BaseWeather, default_weight: i32) -> Self {
        Self {
            name: base.label().to_string(),
            base,
            default_weight,
            category: KindCategory::Normal,
        }
    }

    /// Enabled combined kind whose weight lookups use its first member.
    #[must_use]
    pub fn combined(
        name: impl Into<String>,
        members: impl IntoIterator<Item = BaseWeather>,
        default_weight: i32,
        weight_modifier: f32,
    ) -> Self {
        let members: EffectSet = members.into_iter().collect();
        let base = members.first().copied().unwrap_or_default();
        let applies = Applicability::all_legal(members.iter().copied());
        Self {
            name: name.into(),
            base,
            default_weight,
            category: KindCategory::Combined(CombinedWeather {
                members,
                enabled: true,
                weight_modifier,
                applies,
            }),
        }
    }

    /// Enabled progressing kind whose weight lookups use its starting kind.
    #[must_use]
    pub fn progressing(
        name: impl Into<String>,
        starting: BaseWeather,
        mut stages: Vec<ProgressionStage>,
        default_weight: i32,
        weight_modifier: f32,
    ) -> Self {
        stages.sort_by(|a, b| a.at.total_cmp(&b.at));
        let mut progressing = ProgressingWeather {
            starting,
            stages,
            enabled: true,
            weight_modifier,
            applies: Applicability::new(|_| false),
        };
        progressing.applies = Applicability::all_legal(progressing.stage_kinds());
        Self {
            name: name.into(),
            base: starting,
            default_weight,
            category: KindCategory::Progressing(progressing),
        }
    }

    /// Set the enable flag of a combined or progressing kind. Normal kinds ignore it.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.set_enabled(enabled);
        self
    }

    /// Replace the applicability predicate of a combined or progressing kind.
    #[must_use]
    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        match &mut self.category {
            KindCategory::Normal => {}
            KindCategory::Combined(combined) => combined.applies = applicability,
            KindCategory::Progressing(progressing) => progressing.applies = applicability,
        }
        self
    }

    fn set_enabled(&mut self, enabled: bool) -> bool {
        match &mut self.category {
            KindCategory::Normal => false,
            KindCategory::Combined(combined) => {
                combined.enabled = enabled;
                true
            }
            KindCategory::Progressing(progressing) => {
                progressing.enabled = enabled;
                true
            }
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base kind used for weight lookups and for the host's raw condition field.
    #[must_use]
    pub const fn base(&self) -> BaseWeather {
        self.base
    }

    #[must_use]
    pub const fn default_weight(&self) -> i32 {
        self.default_weight
    }

    #[must_use]
    pub const fn category(&self) -> &KindCategory {
        &self.category
    }

    #[must_use]
    pub const fn tag(&self) -> KindTag {
        match self.category {
            KindCategory::Normal => KindTag::Normal,
            KindCategory::Combined(_) => KindTag::Combined,
            KindCategory::Progressing(_) => KindTag::Progressing,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        match &self.category {
            KindCategory::Normal => true,
            KindCategory::Combined(combined) => combined.enabled,
            KindCategory::Progressing(progressing) => progressing.enabled,
        }
    }

    /// The explicit "no weather" entry.
    #[must_use]
    pub const fn is_clear(&self) -> bool {
        matches!(self.category, KindCategory::Normal) && self.base.is_none()
    }

    /// Base kinds whose effects must be switched on while this kind is active.
    #[must_use]
    pub fn effects(&self) -> EffectSet {
        match &self.category {
            KindCategory::Normal if self.base.is_none() => EffectSet::new(),
            KindCategory::Normal => smallvec::smallvec![self.base],
            KindCategory::Combined(combined) => combined.members.clone(),
            KindCategory::Progressing(progressing) => progressing
                .stage_kinds()
                .into_iter()
                .filter(|base| !base.is_none())
                .collect(),
        }
    }

    /// Whether `base` happens as part of this kind at any point of the day.
    #[must_use]
    pub fn has_weather(&self, base: BaseWeather) -> bool {
        match &self.category {
            KindCategory::Normal => self.base == base,
            KindCategory::Combined(combined) => combined.members.contains(&base),
            KindCategory::Progressing(progressing) => progressing.stage_kinds().contains(&base),
        }
    }
}

/// Owned registry of every weather kind known to a session.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    kinds: Vec<WeatherKind>,
    by_name: HashMap<String, KindId>,
    by_base: HashMap<BaseWeather, KindId>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding only the normal entry of every base kind.
    #[must_use]
    pub fn with_base_kinds(default_weight: i32) -> Self {
        let mut catalog = Self::new();
        for base in BaseWeather::ALL {
            let id = KindId(catalog.kinds.len());
            let kind = WeatherKind::normal(base, default_weight);
            catalog.by_name.insert(kind.name.clone(), id);
            catalog.by_base.insert(base, id);
            catalog.kinds.push(kind);
        }
        catalog
    }

    /// Base kinds plus every combined and progressing definition.
    ///
    /// # Errors
    ///
    /// Returns an error when a definition is invalid or a name repeats.
    pub fn build(
        config: &EngineConfig,
        definitions: &KindDefinitions,
    ) -> Result<Self, ForecastError> {
        let mut catalog = Self::with_base_kinds(config.default_weight);
        for kind in definitions.to_kinds(config.default_weight)? {
            catalog.register(kind)?;
        }
        Ok(catalog)
    }

    /// Add a kind.
    ///
    /// # Errors
    ///
    /// Returns an error when the name is taken, or when a normal kind is
    /// registered for a base kind that already has one.
    pub fn register(&mut self, kind: WeatherKind) -> Result<KindId, ForecastError> {
        if self.by_name.contains_key(kind.name()) {
            return Err(ForecastError::DuplicateKind(kind.name.clone()));
        }
        let is_normal = matches!(kind.category, KindCategory::Normal);
        if is_normal && self.by_base.contains_key(&kind.base) {
            return Err(ForecastError::DuplicateBaseKind(kind.base));
        }
        let id = KindId(self.kinds.len());
        self.by_name.insert(kind.name.clone(), id);
        if is_normal {
            self.by_base.insert(kind.base, id);
        }
        self.kinds.push(kind);
        Ok(id)
    }

    /// Toggle a combined or progressing kind.
    ///
    /// # Errors
    ///
    /// Returns an error when the name is unknown or names a normal kind.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), ForecastError> {
        let id = self.id_of(name)?;
        let toggled = self
            .kinds
            .get_mut(id.0)
            .is_some_and(|kind| kind.set_enabled(enabled));
        if toggled {
            Ok(())
        } else {
            Err(ForecastError::InvalidConfiguration(format!(
                "{name} is a normal kind and cannot be toggled"
            )))
        }
    }

    #[must_use]
    pub fn get(&self, id: KindId) -> Option<&WeatherKind> {
        self.kinds.get(id.0)
    }

    /// Like [`Catalog::get`], failing with `KindNotFound`.
    ///
    /// # Errors
    ///
    /// Returns an error if the id was not issued by this catalog.
    pub fn resolve(&self, id: KindId) -> Result<&WeatherKind, ForecastError> {
        self.get(id)
            .ok_or_else(|| ForecastError::KindNotFound(format!("#{}", id.0)))
    }

    /// Look up a kind by name. Disabled kinds still resolve.
    ///
    /// # Errors
    ///
    /// Returns `KindNotFound` if no kind has this name.
    pub fn id_of(&self, name: &str) -> Result<KindId, ForecastError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ForecastError::KindNotFound(name.to_string()))
    }

    /// Resolve a name as received from outside the session.
    ///
    /// An exact match wins; otherwise the name is compared ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns `KindNotFound` when nothing matches and `AmbiguousKind` when
    /// several entries match ignoring case.
    pub fn find(&self, name: &str) -> Result<KindId, ForecastError> {
        if let Some(id) = self.by_name.get(name) {
            return Ok(*id);
        }
        let mut matches = self
            .entries()
            .filter(|(_, kind)| kind.name.eq_ignore_ascii_case(name.trim()));
        match (matches.next(), matches.next()) {
            (Some((id, _)), None) => Ok(id),
            (Some(_), Some(_)) => Err(ForecastError::AmbiguousKind(name.to_string())),
            _ => Err(ForecastError::KindNotFound(name.to_string())),
        }
    }

    /// # Errors
    ///
    /// Returns `KindNotFound` if no kind has this name.
    pub fn by_name(&self, name: &str) -> Result<&WeatherKind, ForecastError> {
        self.id_of(name).and_then(|id| self.resolve(id))
    }

    /// Normal kind for a base condition.
    ///
    /// # Errors
    ///
    /// Returns `BaseKindNotFound` when the catalog lacks the entry.
    pub fn id_of_base(&self, base: BaseWeather) -> Result<KindId, ForecastError> {
        self.by_base
            .get(&base)
            .copied()
            .ok_or(ForecastError::BaseKindNotFound(base))
    }

    /// # Errors
    ///
    /// Returns `BaseKindNotFound` when the catalog lacks the entry.
    pub fn by_base_kind(&self, base: BaseWeather) -> Result<&WeatherKind, ForecastError> {
        self.id_of_base(base).and_then(|id| self.resolve(id))
    }

    /// The normal "no weather" entry.
    ///
    /// # Errors
    ///
    /// Returns `BaseKindNotFound` when the catalog was built without base kinds.
    pub fn none_kind(&self) -> Result<KindId, ForecastError> {
        self.id_of_base(BaseWeather::None)
    }

    /// Enabled kinds in registration order. Calling again restarts the walk.
    pub fn all(&self) -> impl Iterator<Item = (KindId, &WeatherKind)> + Clone + '_ {
        self.entries().filter(|(_, kind)| kind.is_enabled())
    }

    /// Every kind, disabled ones included.
    pub fn entries(&self) -> impl Iterator<Item = (KindId, &WeatherKind)> + Clone + '_ {
        self.kinds
            .iter()
            .enumerate()
            .map(|(index, kind)| (KindId(index), kind))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storm_rain() -> WeatherKind {
        WeatherKind::combined(
            "Stormy + Rainy",
            [BaseWeather::Stormy, BaseWeather::Rainy],
            100,
            0.5,
        )
    }

    #[test]
    fn base_kinds_are_registered_once_each() {
        let catalog = Catalog::with_base_kinds(100);
        assert_eq!(catalog.len(), BaseWeather::ALL.len());
        for base in BaseWeather::ALL {
            let kind = catalog.by_base_kind(base).unwrap();
            assert_eq!(kind.base(), base);
            assert_eq!(kind.name(), base.label());
            assert_eq!(kind.tag(), KindTag::Normal);
        }
        assert!(catalog.by_name("None").unwrap().is_clear());
    }

    #[test]
    fn duplicate_registration_is_a_hard_error() {
        let mut catalog = Catalog::with_base_kinds(100);
        catalog.register(storm_rain()).unwrap();
        assert_eq!(
            catalog.register(storm_rain()).unwrap_err(),
            ForecastError::DuplicateKind("Stormy + Rainy".into())
        );

        let mut renamed = WeatherKind::normal(BaseWeather::Foggy, 10);
        renamed.name = "Fog again".into();
        assert_eq!(
            catalog.register(renamed).unwrap_err(),
            ForecastError::DuplicateBaseKind(BaseWeather::Foggy)
        );
    }

    #[test]
    fn disabled_kinds_leave_all_but_still_resolve() {
        let mut catalog = Catalog::with_base_kinds(100);
        catalog.register(storm_rain().with_enabled(false)).unwrap();
        assert!(catalog.all().all(|(_, kind)| kind.name() != "Stormy + Rainy"));
        assert!(catalog.by_name("Stormy + Rainy").is_ok());
        assert_eq!(catalog.entries().count(), catalog.all().count() + 1);

        catalog.set_enabled("Stormy + Rainy", true).unwrap();
        assert!(catalog.all().any(|(_, kind)| kind.name() == "Stormy + Rainy"));
        assert!(matches!(
            catalog.set_enabled("Rainy", false),
            Err(ForecastError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn lookups_signal_not_found() {
        let catalog = Catalog::new();
        assert_eq!(
            catalog.by_name("Nope").unwrap_err(),
            ForecastError::KindNotFound("Nope".into())
        );
        assert_eq!(
            catalog.none_kind().unwrap_err(),
            ForecastError::BaseKindNotFound(BaseWeather::None)
        );
    }

    #[test]
    fn find_tolerates_case_but_not_ambiguity() {
        let mut catalog = Catalog::with_base_kinds(100);
        let id = catalog.register(storm_rain()).unwrap();
        assert_eq!(catalog.find("stormy + rainy").unwrap(), id);
        assert_eq!(
            catalog.find(" RAINY ").unwrap(),
            catalog.id_of_base(BaseWeather::Rainy).unwrap()
        );

        catalog
            .register(WeatherKind::combined(
                "STORMY + RAINY",
                [BaseWeather::Stormy, BaseWeather::Rainy],
                100,
                0.5,
            ))
            .unwrap();
        assert_eq!(catalog.find("Stormy + Rainy").unwrap(), id);
        assert_eq!(
            catalog.find("stormy + RAINY").unwrap_err(),
            ForecastError::AmbiguousKind("stormy + RAINY".into())
        );
        assert!(matches!(catalog.find("Hail"), Err(ForecastError::KindNotFound(_))));
    }

    #[test]
    fn combined_applicability_requires_every_member() {
        let kind = storm_rain();
        let KindCategory::Combined(combined) = kind.category() else {
            panic!("expected combined kind");
        };
        let both = Location::new("a", [BaseWeather::Stormy, BaseWeather::Rainy]);
        let one = Location::new("b", [BaseWeather::Stormy, BaseWeather::Foggy]);
        assert!(combined.can_apply(&both));
        assert!(!combined.can_apply(&one));
        assert_eq!(kind.base(), BaseWeather::Stormy);
        assert_eq!(
            kind.effects().as_slice(),
            &[BaseWeather::Stormy, BaseWeather::Rainy]
        );
    }

    #[test]
    fn custom_applicability_overrides_member_rule() {
        let kind = storm_rain().with_applicability(Applicability::new(|loc| loc.name == "only"));
        let KindCategory::Combined(combined) = kind.category() else {
            panic!("expected combined kind");
        };
        assert!(combined.can_apply(&Location::new("only", [])));
        assert!(!combined.can_apply(&Location::new(
            "other",
            [BaseWeather::Stormy, BaseWeather::Rainy]
        )));
    }

    #[test]
    fn progressing_stages_are_sorted_and_queryable() {
        let kind = WeatherKind::progressing(
            "Foggy > Rainy > None",
            BaseWeather::Foggy,
            vec![
                ProgressionStage {
                    at: 0.8,
                    weather: BaseWeather::None,
                    chance: 1.0,
                },
                ProgressionStage {
                    at: 0.3,
                    weather: BaseWeather::Rainy,
                    chance: 0.5,
                },
            ],
            100,
            0.5,
        );
        let KindCategory::Progressing(progressing) = kind.category() else {
            panic!("expected progressing kind");
        };
        assert!((progressing.stages()[0].at - 0.3).abs() < f32::EPSILON);
        assert!(kind.has_weather(BaseWeather::Rainy));
        assert!(kind.has_weather(BaseWeather::None));
        assert!(!kind.has_weather(BaseWeather::Stormy));
        assert_eq!(
            kind.effects().as_slice(),
            &[BaseWeather::Foggy, BaseWeather::Rainy]
        );

        let fog_rain = Location::new("x", [BaseWeather::Foggy, BaseWeather::Rainy]);
        let fog_only = Location::new("y", [BaseWeather::Foggy]);
        assert!(progressing.can_apply(&fog_rain));
        assert!(!progressing.can_apply(&fog_only));
    }
}
