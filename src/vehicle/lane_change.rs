use crate::math::ring_distance;
use crate::{Error, VehicleId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How much slower than the driver, in m/s, a leader must be to be worth passing.
const PASS_SPEED_DIFFERENCE: f64 = 5.0; // m/s

/// A slow leader is only passed when it is closer than this many seconds of travel.
const PASS_HORIZON: f64 = 5.0; // s

/// The clear road needed ahead in the slow lane before moving back into it, in m.
const KEEP_RIGHT_CLEARANCE: f64 = 200.0; // m

/// How a driver chooses between lanes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneChangeStrategy {
    /// Move to whichever lane is free whenever the leader is slow, preferring the left.
    Greedy,
    /// Overtake on the left and return to the slow (right) lane when it is clear.
    #[default]
    Traditional,
}

impl FromStr for LaneChangeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" => Ok(Self::Greedy),
            "traditional" => Ok(Self::Traditional),
            _ => Err(Error::UnknownStrategy(s.to_string())),
        }
    }
}

/// A lane change decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneChange {
    /// Move one lane to the left (towards the fast lanes).
    Left,
    /// Stay in the current lane.
    Stay,
    /// Move one lane to the right (towards the slow lane).
    Right,
}

impl LaneChange {
    /// The change in lane index. Lane 0 is the rightmost lane.
    pub fn offset(&self) -> isize {
        match self {
            LaneChange::Left => 1,
            LaneChange::Stay => 0,
            LaneChange::Right => -1,
        }
    }
}

/// A nearby vehicle as seen by a driver considering a lane change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    /// The neighbouring vehicle.
    pub id: VehicleId,
    /// Its front position along the ring in m.
    pub pos: f64,
    /// Its velocity in m/s.
    pub vel: f64,
    /// Its length in m.
    pub length: f64,
}

/// The state of a lane next to a vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AdjacentLane {
    /// There is no lane on this side.
    Missing,
    /// The lane exists and has no vehicles on it.
    Empty,
    /// The nearest vehicles ahead (or level) and behind, which may be the same vehicle.
    Occupied { front: Neighbour, behind: Neighbour },
}

impl AdjacentLane {
    /// The nearest vehicle ahead in the lane, if any.
    pub fn front(&self) -> Option<&Neighbour> {
        match self {
            AdjacentLane::Occupied { front, .. } => Some(front),
            _ => None,
        }
    }
}

/// Inputs into the [`Vehicle::choose_lane`](crate::Vehicle::choose_lane) method.
#[derive(Clone, Copy, Debug)]
pub struct LaneChangeInput {
    /// The vehicle ahead in the current lane.
    pub leader: Option<Neighbour>,
    /// The lane to the left.
    pub left: AdjacentLane,
    /// The lane to the right.
    pub right: AdjacentLane,
    /// The length of the ring road in m.
    pub road_length: f64,
}

/// Whether a vehicle of `length` with its front at `pos` fits into the lane.
pub(crate) fn fits(pos: f64, length: f64, lane: &AdjacentLane, road_length: f64) -> bool {
    match lane {
        AdjacentLane::Missing => false,
        AdjacentLane::Empty => true,
        AdjacentLane::Occupied { front, behind } => {
            let ahead = ring_distance(pos, front.pos, road_length);
            let back = ring_distance(behind.pos, pos, road_length);
            ahead > front.length && back >= length
        }
    }
}

/// Whether the leader is slow and close enough to be worth overtaking.
pub(crate) fn is_blocked(pos: f64, vel: f64, leader: Option<&Neighbour>, road_length: f64) -> bool {
    leader.map_or(false, |leader| {
        let gap = ring_distance(pos, leader.pos, road_length);
        leader.vel - vel < -PASS_SPEED_DIFFERENCE && gap < vel * PASS_HORIZON
    })
}

/// Whether the slow lane has enough clear road ahead to move back into.
pub(crate) fn right_lane_clear(pos: f64, right: &AdjacentLane, road_length: f64) -> bool {
    right
        .front()
        .map_or(true, |front| ring_distance(pos, front.pos, road_length) > KEEP_RIGHT_CLEARANCE)
}

#[cfg(test)]
mod test {
    use super::*;
    use slotmap::KeyData;

    fn neighbour(pos: f64) -> Neighbour {
        Neighbour {
            id: VehicleId::from(KeyData::from_ffi(1)),
            pos,
            vel: 20.0,
            length: 5.0,
        }
    }

    #[test]
    fn fits_into_gap() {
        let lane = AdjacentLane::Occupied {
            front: neighbour(120.0),
            behind: neighbour(90.0),
        };
        assert!(fits(100.0, 5.0, &lane, 2000.0));
        // Overlaps the rear of the front vehicle
        assert!(!fits(116.0, 5.0, &lane, 2000.0));
        // Own rear overlaps the vehicle behind
        assert!(!fits(94.0, 5.0, &lane, 2000.0));
    }

    #[test]
    fn fits_next_to_single_vehicle() {
        let lane = AdjacentLane::Occupied {
            front: neighbour(100.0),
            behind: neighbour(100.0),
        };
        assert!(fits(50.0, 5.0, &lane, 2000.0));
        assert!(fits(105.0, 5.0, &lane, 2000.0));
        assert!(!fits(100.0, 5.0, &lane, 2000.0));
        assert!(!fits(97.0, 5.0, &lane, 2000.0));
    }

    #[test]
    fn fits_across_the_ring_seam() {
        let lane = AdjacentLane::Occupied {
            front: neighbour(30.0),
            behind: neighbour(1980.0),
        };
        assert!(fits(5.0, 5.0, &lane, 2000.0));
        assert!(!fits(1983.0, 5.0, &lane, 2000.0));
    }

    #[test]
    fn missing_and_empty_lanes() {
        assert!(!fits(0.0, 5.0, &AdjacentLane::Missing, 2000.0));
        assert!(fits(0.0, 5.0, &AdjacentLane::Empty, 2000.0));
    }

    #[test]
    fn parse_strategy() {
        assert_eq!("greedy".parse::<LaneChangeStrategy>().unwrap(), LaneChangeStrategy::Greedy);
        assert_eq!(
            "Traditional".parse::<LaneChangeStrategy>().unwrap(),
            LaneChangeStrategy::Traditional
        );
        assert!("zigzag".parse::<LaneChangeStrategy>().is_err());
    }
}
