//! Which weather kinds may legally occur at a location.
use smallvec::SmallVec;

use crate::catalog::{Catalog, KindCategory, KindId};
use crate::location::Location;
use crate::weather::BaseWeather;

/// Ordered set of base kinds, small enough to live inline.
pub type LegalBaseKinds = SmallVec<[BaseWeather; 8]>;

/// Real conditions the location allows, in declared order, without duplicates.
///
/// Excludes none and dust. Empty when the location opts out of random weather.
#[must_use]
pub fn random_base_kinds(location: &Location) -> LegalBaseKinds {
    let mut legal = LegalBaseKinds::new();
    if location.no_random_weather {
        return legal;
    }
    for base in location
        .random_weathers
        .iter()
        .copied()
        .filter(|base| base.is_random_candidate())
    {
        if !legal.contains(&base) {
            legal.push(base);
        }
    }
    legal
}

/// [`random_base_kinds`] with none appended as a sentinel candidate.
///
/// Empty when the location declares no random conditions at all. A location
/// listing only dust still yields `[None]`.
#[must_use]
pub fn legal_base_kinds(location: &Location) -> LegalBaseKinds {
    if location.no_random_weather || location.random_weathers.is_empty() {
        return LegalBaseKinds::new();
    }
    let mut legal = random_base_kinds(location);
    legal.push(BaseWeather::None);
    legal
}

/// Catalog entries that may occur at the location, in catalog order.
#[must_use]
pub fn legal_kinds(location: &Location, catalog: &Catalog) -> Vec<KindId> {
    let legal_bases = legal_base_kinds(location);
    if legal_bases.is_empty() {
        return Vec::new();
    }
    let mut kinds = Vec::new();
    for (id, kind) in catalog.all() {
        let include = match kind.category() {
            KindCategory::Normal => legal_bases.contains(&kind.base()),
            KindCategory::Combined(combined) => combined.enabled() && combined.can_apply(location),
            KindCategory::Progressing(progressing) => {
                progressing.enabled() && progressing.can_apply(location)
            }
        };
        if include && !kinds.contains(&id) {
            kinds.push(id);
        }
    }
    kinds
}
