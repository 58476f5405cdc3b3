//! Experiment configuration, loadable from a JSON file.

use crate::control::CentralControl;
use crate::track::{LaneSplit, TrackAttributes};
use crate::vehicle::{LaneChangeStrategy, VehicleAttributes};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The parameters of a density sweep experiment.
///
/// Every field has a default, so a configuration file only needs to list
/// the values it changes:
///
/// ```json
/// { "lane_count": 2, "central_control": true, "runs": 5 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// The simulation time step in s.
    pub dt: f64,
    /// The simulated duration of each density in s.
    pub total_time: f64,
    /// The length of the ring road in m.
    pub road_length: f64,
    /// The number of lanes.
    pub lane_count: usize,
    /// Whether vehicles are under central control.
    pub central_control: bool,
    /// The largest speed change used to match the lane's mean speed, in m/s per step.
    pub max_accel: f64,
    /// The speed added by compliant drivers to push the mean speed up, in m/s.
    pub speed_push: f64,
    /// The number of times the whole density sweep is repeated.
    pub runs: usize,
    /// The lowest density simulated, in veh/km.
    pub min_density: f64,
    /// The highest density simulated, in veh/km.
    pub max_density: f64,
    /// The number of densities simulated.
    pub density_steps: usize,
    /// How vehicles are divided between lanes.
    pub lane_split: LaneSplit,
    /// How drivers choose lanes when not under central control.
    pub strategy: LaneChangeStrategy,
    /// The random seed. Each run `i` is seeded with `seed + i`.
    pub seed: Option<u64>,
    /// The attributes shared by all vehicles.
    pub vehicle: VehicleAttributes,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dt: 1.0,
            total_time: 2000.0,
            road_length: 2000.0,
            lane_count: 1,
            central_control: false,
            max_accel: 1.0,
            speed_push: 0.5,
            runs: 20,
            min_density: 0.0,
            max_density: 140.0,
            density_steps: 10,
            lane_split: LaneSplit::Random,
            strategy: LaneChangeStrategy::Traditional,
            seed: None,
            vehicle: VehicleAttributes::default(),
        }
    }
}

impl ModelConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration describes a runnable experiment.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("dt", self.dt),
            ("total_time", self.total_time),
            ("road_length", self.road_length),
            ("vehicle.length", self.vehicle.length),
            ("vehicle.max_speed", self.vehicle.max_speed),
            ("vehicle.max_acc", self.vehicle.max_acc),
        ];
        for (name, value) in positive {
            if value <= 0.0 || !value.is_finite() {
                return Err(Error::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.steps() == 0 {
            return Err(Error::InvalidConfig(format!(
                "total_time ({}) must cover at least one time step of {}",
                self.total_time, self.dt
            )));
        }
        if self.lane_count == 0 {
            return Err(Error::InvalidConfig("lane_count must be at least 1".into()));
        }
        if self.runs == 0 {
            return Err(Error::InvalidConfig("runs must be at least 1".into()));
        }
        if self.density_steps == 0 {
            return Err(Error::InvalidConfig("density_steps must be at least 1".into()));
        }
        if self.min_density < 0.0 || self.max_density < self.min_density {
            return Err(Error::InvalidConfig(format!(
                "invalid density range {}..{}",
                self.min_density, self.max_density
            )));
        }
        if !(0.0..=1.0).contains(&self.vehicle.compliance) {
            return Err(Error::InvalidConfig(format!(
                "vehicle.compliance must be a probability, got {}",
                self.vehicle.compliance
            )));
        }
        Ok(())
    }

    /// The number of steps simulated for each density.
    pub fn steps(&self) -> usize {
        (self.total_time / self.dt) as usize
    }

    /// The simulated duration of each density, in s.
    pub fn simulated_time(&self) -> f64 {
        self.steps() as f64 * self.dt
    }

    /// Central control parameters, if enabled.
    pub fn control(&self) -> Option<CentralControl> {
        self.central_control.then(|| CentralControl {
            max_accel: self.max_accel,
            speed_push: self.speed_push,
        })
    }

    /// The attributes of the tracks simulated by this experiment.
    pub fn track_attributes(&self, record_history: bool) -> TrackAttributes {
        TrackAttributes {
            road_length: self.road_length,
            lane_count: self.lane_count,
            dt: self.dt,
            strategy: self.strategy,
            control: self.control(),
            record_history,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: ModelConfig =
            serde_json::from_str(r#"{ "lane_count": 2, "vehicle": { "length": 4.0 } }"#).unwrap();
        assert_eq!(config.lane_count, 2);
        assert_eq!(config.runs, 20);
        assert_eq!(config.vehicle.length, 4.0);
        assert_eq!(config.vehicle.max_speed, 35.0);
        assert_eq!(config.strategy, LaneChangeStrategy::Traditional);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn enum_fields_parse() {
        let config: ModelConfig =
            serde_json::from_str(r#"{ "strategy": "greedy", "lane_split": "equal" }"#).unwrap();
        assert_eq!(config.strategy, LaneChangeStrategy::Greedy);
        assert_eq!(config.lane_split, LaneSplit::Equal);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(serde_json::from_str::<ModelConfig>(r#"{ "lanes": 2 }"#).is_err());
    }

    #[test]
    fn validation() {
        let config = ModelConfig {
            dt: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = ModelConfig {
            max_density: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = ModelConfig {
            runs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_run_shorter_than_a_step() {
        let config = ModelConfig {
            total_time: 0.5,
            dt: 1.0,
            ..Default::default()
        };
        assert_eq!(config.steps(), 0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = ModelConfig {
            total_time: 1.0,
            dt: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.simulated_time(), 1.0);
    }

    #[test]
    fn steps_and_control() {
        let config = ModelConfig {
            dt: 0.3,
            total_time: 1.0,
            ..Default::default()
        };
        assert_eq!(config.steps(), 3);
        assert_eq!(config.control(), None);
        let config = ModelConfig {
            central_control: true,
            ..Default::default()
        };
        assert_eq!(config.control(), Some(CentralControl::default()));
    }
}
