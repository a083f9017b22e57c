use crate::model::LifeStage;
use chrono::{DateTime, Timelike, Utc};

/// Hourly passive loss for the three decaying meters.
#[derive(Clone, Copy, Debug)]
pub struct DecayRates {
    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
}

/// One row of the ordered life-stage table: `[min_age_hours, max_age_hours)`.
#[derive(Clone, Copy, Debug)]
pub struct StageConfig {
    pub stage: LifeStage,
    pub min_age_hours: f64,
    pub max_age_hours: f64,
    /// Scales passive decay for this stage (babies burn through meters faster).
    pub decay_multiplier: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct PoopRules {
    /// One unit accumulates per this many hours.
    pub interval_hours: f64,
    pub max_poop: u32,
    /// Above this count the pet starts taking continuous health damage.
    pub healthy_threshold: u32,
    /// Hourly health loss per unit over the healthy threshold.
    pub health_penalty_per_unit: f64,
    pub clean_xp: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct SicknessRules {
    /// Sick onset when health drops below this.
    pub health_threshold: f64,
    /// Sick onset when poop count reaches this.
    pub poop_threshold: u32,
    /// Sick onset after this many hours without interaction.
    pub neglect_hours: f64,
    /// Recovery needs health at or above this (hysteresis: higher than onset).
    pub recovery_health_threshold: f64,
    /// Sick pets decay this much faster.
    pub sick_decay_multiplier: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct SleepRules {
    /// Night window, wrapping midnight when start > end.
    pub night_start_hour: u32,
    pub night_end_hour: u32,
    /// Hourly happiness loss while lights stay on at night.
    pub lights_on_happiness_per_hour: f64,
    /// Energy-gain scaling for the sleep action.
    pub good_sleep_multiplier: f64,
    pub poor_sleep_multiplier: f64,
}

impl SleepRules {
    pub fn is_night_hour(&self, hour: u32) -> bool {
        if self.night_start_hour > self.night_end_hour {
            hour >= self.night_start_hour || hour < self.night_end_hour
        } else {
            hour >= self.night_start_hour && hour < self.night_end_hour
        }
    }

    pub fn is_night(&self, now: DateTime<Utc>) -> bool {
        self.is_night_hour(now.hour())
    }

    /// Fractional hours since the night window opened. Only meaningful while
    /// `is_night(now)` holds.
    pub fn hours_into_night(&self, now: DateTime<Utc>) -> f64 {
        let h = now.hour() as f64 + now.minute() as f64 / 60.0 + now.second() as f64 / 3600.0;
        let start = self.night_start_hour as f64;
        if h >= start {
            h - start
        } else {
            h + 24.0 - start
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RevivalRules {
    /// Zero means instant revival.
    pub cooldown_ms: i64,
    pub health: f64,
    pub hunger: f64,
    pub energy: f64,
    pub happiness: f64,
}

/// Stat deltas for one discrete action. Positive raises, negative lowers;
/// everything clamps afterwards.
#[derive(Clone, Copy, Debug)]
pub struct ActionEffects {
    pub hunger: f64,
    pub happiness: f64,
    pub energy: f64,
    pub health: f64,
    pub xp: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct ActionTable {
    pub feed: ActionEffects,
    pub play: ActionEffects,
    /// `energy` here is the base gain before the sleep-quality multiplier.
    pub sleep: ActionEffects,
    pub exercise: ActionEffects,
    /// UI-level gate: hosts should disable exercise below this energy. The
    /// engine itself stays permissive.
    pub exercise_min_energy: f64,
    pub pet: ActionEffects,
    pub medicine: ActionEffects,
}

/// Every tunable the simulation reads, bundled so tests and hosts can swap
/// the whole table at once.
#[derive(Clone, Debug)]
pub struct Rules {
    pub decay: DecayRates,
    /// Skip decay entirely under this many elapsed hours (micro-decay noise).
    pub min_decay_hours: f64,
    /// Ordered by age; the last row is open-ended.
    pub stages: Vec<StageConfig>,
    pub poop: PoopRules,
    pub sickness: SicknessRules,
    pub sleep: SleepRules,
    pub revival: RevivalRules,
    pub actions: ActionTable,
    pub xp_per_level: u32,
}

impl Rules {
    /// Stage for a given age; ages past the table fall through to the oldest.
    pub fn stage_for_age(&self, age_hours: f64) -> LifeStage {
        for row in &self.stages {
            if age_hours >= row.min_age_hours && age_hours < row.max_age_hours {
                return row.stage;
            }
        }
        LifeStage::Senior
    }

    pub fn stage_decay_multiplier(&self, stage: LifeStage) -> f64 {
        self.stages
            .iter()
            .find(|row| row.stage == stage)
            .map(|row| row.decay_multiplier)
            .unwrap_or(1.0)
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            decay: DecayRates {
                hunger: 10.0,
                happiness: 8.0,
                energy: 12.0,
            },
            min_decay_hours: 0.1,
            stages: vec![
                StageConfig {
                    stage: LifeStage::Baby,
                    min_age_hours: 0.0,
                    max_age_hours: 48.0,
                    decay_multiplier: 1.5,
                },
                StageConfig {
                    stage: LifeStage::Child,
                    min_age_hours: 48.0,
                    max_age_hours: 144.0,
                    decay_multiplier: 1.2,
                },
                StageConfig {
                    stage: LifeStage::Teen,
                    min_age_hours: 144.0,
                    max_age_hours: 336.0,
                    decay_multiplier: 1.0,
                },
                StageConfig {
                    stage: LifeStage::Adult,
                    min_age_hours: 336.0,
                    max_age_hours: 672.0,
                    decay_multiplier: 0.9,
                },
                StageConfig {
                    stage: LifeStage::Senior,
                    min_age_hours: 672.0,
                    max_age_hours: f64::INFINITY,
                    decay_multiplier: 1.2,
                },
            ],
            poop: PoopRules {
                interval_hours: 4.0,
                max_poop: 10,
                healthy_threshold: 5,
                health_penalty_per_unit: 2.0,
                clean_xp: 10,
            },
            sickness: SicknessRules {
                health_threshold: 15.0,
                poop_threshold: 7,
                neglect_hours: 48.0,
                recovery_health_threshold: 50.0,
                sick_decay_multiplier: 1.5,
            },
            sleep: SleepRules {
                night_start_hour: 22,
                night_end_hour: 6,
                lights_on_happiness_per_hour: 5.0,
                good_sleep_multiplier: 1.5,
                poor_sleep_multiplier: 0.5,
            },
            revival: RevivalRules {
                cooldown_ms: 0,
                health: 50.0,
                hunger: 50.0,
                energy: 50.0,
                happiness: 50.0,
            },
            actions: ActionTable {
                feed: ActionEffects {
                    hunger: 20.0,
                    happiness: 0.0,
                    energy: -5.0,
                    health: 0.0,
                    xp: 10,
                },
                play: ActionEffects {
                    hunger: -5.0,
                    happiness: 20.0,
                    energy: -10.0,
                    health: 0.0,
                    xp: 15,
                },
                sleep: ActionEffects {
                    hunger: -10.0,
                    happiness: 0.0,
                    energy: 40.0,
                    health: 0.0,
                    xp: 5,
                },
                exercise: ActionEffects {
                    hunger: -10.0,
                    happiness: 10.0,
                    energy: -20.0,
                    health: 15.0,
                    xp: 20,
                },
                exercise_min_energy: 20.0,
                pet: ActionEffects {
                    hunger: 0.0,
                    happiness: 10.0,
                    energy: 0.0,
                    health: 5.0,
                    xp: 5,
                },
                medicine: ActionEffects {
                    hunger: 0.0,
                    happiness: -5.0,
                    energy: 0.0,
                    health: 30.0,
                    xp: 5,
                },
            },
            xp_per_level: 100,
        }
    }
}
