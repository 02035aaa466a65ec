//! Tunable parameters for navigators and planners.
//!
//! Every field has a default, so a stage config file only needs to list what
//! it overrides:
//!
//! ```
//! use stagewalk_logic::config::StageConfig;
//!
//! let cfg = StageConfig::from_json(r#"{ "navigator": { "max_speed": 4.5 } }"#).unwrap();
//! assert_eq!(cfg.navigator.max_speed, 4.5);
//! assert_eq!(cfg.navigator.arrival_threshold, 0.4);
//! assert_eq!(cfg.planner.waypoint_threshold, 1.5);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Distance under which `move_to` counts as arrived.
pub const ARRIVAL_THRESHOLD: f32 = 0.4;

/// Distance under which the planner considers a waypoint reached.
pub const WAYPOINT_THRESHOLD: f32 = 1.5;

/// Steering and locomotion parameters for one character.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Velocity cap, world units per second.
    pub max_speed: f32,
    /// Cap on the summed steering force.
    pub max_force: f32,
    /// Acceleration = force / mass.
    pub mass: f32,
    pub arrival_threshold: f32,
    /// Arrive decelerates linearly inside this distance.
    pub slowing_radius: f32,
    pub wander_radius: f32,
    /// Must exceed `wander_radius` so wandering never stalls.
    pub wander_distance: f32,
    /// Max change of the wander angle per update, radians.
    pub wander_jitter: f32,
    /// Extra clearance beyond obstacle + agent radius where avoidance kicks in.
    pub avoidance_range: f32,
    pub avoidance_weight: f32,
    pub agent_radius: f32,
    /// Wander RNG seed.
    pub seed: u64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_speed: 3.0,
            max_force: 8.0,
            mass: 0.25,
            arrival_threshold: ARRIVAL_THRESHOLD,
            slowing_radius: 1.0,
            wander_radius: 1.0,
            wander_distance: 2.0,
            wander_jitter: 0.6,
            avoidance_range: 1.5,
            avoidance_weight: 6.0,
            agent_radius: 0.3,
            seed: 0x5eed,
        }
    }
}

/// Timers and thresholds for the objective planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub waypoint_threshold: f32,
    /// Seconds between objective polls while wandering and retries while waiting.
    pub replan_interval: f32,
    /// Pause between arriving and firing the interaction callback.
    pub arrive_pause: f32,
    /// Time spent interacting before planning again.
    pub interact_duration: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            waypoint_threshold: WAYPOINT_THRESHOLD,
            replan_interval: 3.0,
            arrive_pause: 0.5,
            interact_duration: 2.0,
        }
    }
}

/// Per-stage tuning bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub navigator: NavigatorConfig,
    pub planner: PlannerConfig,
}

impl StageConfig {
    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: StageConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let nav = &self.navigator;
        let plan = &self.planner;
        let positive = [
            ("navigator.max_speed", nav.max_speed),
            ("navigator.max_force", nav.max_force),
            ("navigator.mass", nav.mass),
            ("navigator.arrival_threshold", nav.arrival_threshold),
            ("navigator.slowing_radius", nav.slowing_radius),
            ("planner.waypoint_threshold", plan.waypoint_threshold),
            ("planner.replan_interval", plan.replan_interval),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }
        let non_negative = [
            ("navigator.wander_radius", nav.wander_radius),
            ("navigator.avoidance_range", nav.avoidance_range),
            ("navigator.avoidance_weight", nav.avoidance_weight),
            ("navigator.agent_radius", nav.agent_radius),
            ("planner.arrive_pause", plan.arrive_pause),
            ("planner.interact_duration", plan.interact_duration),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must not be negative, got {value}"),
                });
            }
        }
        if nav.wander_distance <= nav.wander_radius {
            return Err(ConfigError::Invalid {
                field: "navigator.wander_distance",
                reason: format!(
                    "must exceed wander_radius ({} <= {})",
                    nav.wander_distance, nav.wander_radius
                ),
            });
        }
        Ok(())
    }
}
