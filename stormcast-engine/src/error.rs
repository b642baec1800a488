//! Error types for the selection engine.
//!
//! Recoverable gaps (missing weights, empty legal sets) never surface here;
//! they degrade to the none kind inside the day selector. These variants
//! describe lookups that must succeed and configuration defects that have
//! to be fixed before a session proceeds.

use crate::weather::BaseWeather;

/// Errors raised by catalog lookups, overrides, and catalog construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForecastError {
    /// No catalog entry carries the requested name.
    #[error("weather kind not found: {0}")]
    KindNotFound(String),

    /// The catalog has no normal entry for a base kind.
    #[error("no normal weather kind registered for base {0}")]
    BaseKindNotFound(BaseWeather),

    /// An operation needed an active location and none is set.
    #[error("no active location set for this session")]
    NoActiveLocation,

    /// A kind with this name is already registered.
    #[error("duplicate weather kind: {0}")]
    DuplicateKind(String),

    /// A name matched more than one catalog entry.
    #[error("weather kind name is ambiguous: {0}")]
    AmbiguousKind(String),

    /// A second normal entry was registered for the same base kind.
    #[error("duplicate normal weather kind for base {0}")]
    DuplicateBaseKind(BaseWeather),

    /// A definition cannot be turned into a catalog entry.
    #[error("invalid weather configuration: {0}")]
    InvalidConfiguration(String),
}
