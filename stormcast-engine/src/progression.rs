//! Stage tracking for progressing kinds.
use rand::{Rng, RngCore};
use std::fmt;

use crate::catalog::{KindCategory, ProgressionStage, WeatherKind};
use crate::weather::BaseWeather;

/// Opaque in-day state of a progressing kind.
///
/// The selector and session only query it. Stage advancement is driven by
/// the host as the day's clock moves.
pub trait StageTracker: fmt::Debug {
    /// Name of the progressing kind being tracked.
    fn kind_name(&self) -> &str;

    /// Base kind active at the current point of the day.
    fn current_stage_kind(&self) -> BaseWeather;

    /// Move the timeline to `day_fraction` (0.0..=1.0).
    ///
    /// Returns the new stage kind when a transition happened.
    fn advance(&mut self, day_fraction: f32, rng: &mut dyn RngCore) -> Option<BaseWeather>;
}

/// Default tracker: walks time-ordered stages, each gated by its chance.
///
/// A stage whose roll fails is consumed; the timeline never revisits it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionTimeline {
    kind_name: String,
    current: BaseWeather,
    stages: Vec<ProgressionStage>,
    next_stage: usize,
}

impl ProgressionTimeline {
    /// Timeline at the starting kind of a progressing entry; `None` for other categories.
    #[must_use]
    pub fn for_kind(kind: &WeatherKind) -> Option<Self> {
        let KindCategory::Progressing(progressing) = kind.category() else {
            return None;
        };
        Some(Self {
            kind_name: kind.name().to_string(),
            current: progressing.starting(),
            stages: progressing.stages().to_vec(),
            next_stage: 0,
        })
    }

    /// Stages reached so far, whether or not their roll succeeded.
    #[must_use]
    pub const fn stages_reached(&self) -> usize {
        self.next_stage
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.next_stage >= self.stages.len()
    }
}

impl StageTracker for ProgressionTimeline {
    fn kind_name(&self) -> &str {
        &self.kind_name
    }

    fn current_stage_kind(&self) -> BaseWeather {
        self.current
    }

    fn advance(&mut self, day_fraction: f32, rng: &mut dyn RngCore) -> Option<BaseWeather> {
        if day_fraction.is_nan() {
            return None;
        }
        let now = day_fraction.clamp(0.0, 1.0);
        let mut changed = None;
        while let Some(stage) = self.stages.get(self.next_stage) {
            if stage.at > now {
                break;
            }
            self.next_stage += 1;
            if roll_stage(stage.chance, rng) && stage.weather != self.current {
                self.current = stage.weather;
                changed = Some(stage.weather);
            }
        }
        changed
    }
}

fn roll_stage(chance: f32, rng: &mut dyn RngCore) -> bool {
    if chance.is_nan() || chance <= 0.0 {
        return false;
    }
    if chance >= 1.0 {
        return true;
    }
    rng.gen_bool(f64::from(chance))
}
