//! Central ("smart city") control of the vehicles on the track.
//!
//! Under central control drivers do not choose lanes for themselves. Instead
//! vehicles are spread evenly across the lanes, and each vehicle's speed is
//! pulled towards the mean speed of its lane.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The parameters of central control.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralControl {
    /// The largest speed change used to match the lane's mean speed, in m/s per step.
    pub max_accel: f64,
    /// The speed added by compliant drivers to push the mean speed up, in m/s.
    pub speed_push: f64,
}

impl Default for CentralControl {
    fn default() -> Self {
        Self {
            max_accel: 1.0,
            speed_push: 0.5,
        }
    }
}

/// The speed control applied to a single vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedControl {
    /// The mean speed of the vehicle's lane in m/s.
    pub mean_speed: f64,
    /// See [CentralControl::max_accel].
    pub max_accel: f64,
    /// See [CentralControl::speed_push].
    pub speed_push: f64,
}

impl CentralControl {
    /// The speed control for a lane with the given mean speed.
    /// Returns `None` for an empty lane.
    pub fn for_lane(&self, mean_speed: Option<f64>) -> Option<SpeedControl> {
        mean_speed.map(|mean_speed| SpeedControl {
            mean_speed,
            max_accel: self.max_accel,
            speed_push: self.speed_push,
        })
    }
}

/// The number of vehicles each lane should hold so that `total` vehicles are
/// spread evenly. Any remainder is given to the rightmost lanes.
pub fn preferred_per_lane(total: usize, lane_count: usize) -> SmallVec<[usize; 4]> {
    if lane_count == 0 {
        return SmallVec::new();
    }
    let (base, extra) = (total / lane_count, total % lane_count);
    (0..lane_count)
        .map(|lane| base + usize::from(lane < extra))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spreads_vehicles_evenly() {
        assert_eq!(preferred_per_lane(10, 3).as_slice(), &[4, 3, 3]);
        assert_eq!(preferred_per_lane(9, 3).as_slice(), &[3, 3, 3]);
        assert_eq!(preferred_per_lane(1, 2).as_slice(), &[1, 0]);
        assert!(preferred_per_lane(5, 0).is_empty());
    }

    #[test]
    fn empty_lane_has_no_control() {
        let control = CentralControl::default();
        assert_eq!(control.for_lane(None), None);
        assert_eq!(
            control.for_lane(Some(12.0)),
            Some(SpeedControl {
                mean_speed: 12.0,
                max_accel: 1.0,
                speed_push: 0.5,
            })
        );
    }
}
