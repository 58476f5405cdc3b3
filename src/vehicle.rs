use self::acceleration::{AccelerationModel, ModelParams};
use self::lane_change::{fits, is_blocked, right_lane_clear};
pub use self::acceleration::{Decision, Leader};
pub use self::lane_change::{
    AdjacentLane, LaneChange, LaneChangeInput, LaneChangeStrategy, Neighbour,
};
use crate::control::SpeedControl;
use crate::VehicleId;
use rand::Rng;
use serde::{Deserialize, Serialize};

mod acceleration;
mod lane_change;

/// A simulated driver and their vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    pub(crate) id: VehicleId,
    /// The vehicle's attributes.
    attributes: VehicleAttributes,
    /// The car following model.
    acc_model: AccelerationModel,
    /// The lane the vehicle is in, 0 being the rightmost.
    lane: usize,
    /// The position of the front of the vehicle along the ring, in m.
    pos: f64,
    /// The velocity in m/s.
    vel: f64,
    /// The acceleration chosen by the most recent decision, in m/s^2.
    acc: f64,
    /// The velocity to adopt on the next call to `advance`.
    next_vel: f64,
    /// Recorded samples of the vehicle's state.
    history: Vec<Sample>,
}

/// The attributes of a simulated driver and their vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleAttributes {
    /// The speed the driver wants to travel at, in m/s.
    pub desired_speed: f64,
    /// The maximum speed of the vehicle, in m/s.
    pub max_speed: f64,
    /// The vehicle length in m.
    pub length: f64,
    /// The normal acceleration of the vehicle, in m/s^2.
    pub normal_acc: f64,
    /// The maximum acceleration of the vehicle, in m/s^2.
    pub max_acc: f64,
    /// The amplitude of the random speed reduction applied each step, in m/s.
    pub noise: f64,
    /// The time headway the driver prefers to the vehicle in front, in s.
    pub time_headway: f64,
    /// The probability that, under central control, the driver pushes
    /// the lane's mean speed upwards.
    pub compliance: f64,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            desired_speed: 30.0,
            max_speed: 35.0,
            length: 5.0,
            normal_acc: 3.05,
            max_acc: 6.04,
            noise: 0.2,
            time_headway: 1.2,
            compliance: 0.5,
        }
    }
}

/// A recorded sample of a vehicle's state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Position along the ring in m.
    pub pos: f64,
    /// Lane index.
    pub lane: usize,
    /// Velocity in m/s.
    pub vel: f64,
}

impl Vehicle {
    /// Creates a new vehicle.
    pub(crate) fn new(
        id: VehicleId,
        attributes: &VehicleAttributes,
        lane: usize,
        pos: f64,
        vel: f64,
    ) -> Self {
        let mut vehicle = Self {
            id,
            attributes: *attributes,
            acc_model: AccelerationModel::new(&ModelParams {
                desired_velocity: attributes.desired_speed,
                time_headway: attributes.time_headway,
                normal_acceleration: attributes.normal_acc,
                max_acceleration: attributes.max_acc,
            }),
            lane,
            pos,
            vel,
            acc: 0.0,
            next_vel: vel,
            history: vec![],
        };
        vehicle.reset_history();
        vehicle
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle's attributes.
    pub fn attributes(&self) -> &VehicleAttributes {
        &self.attributes
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.attributes.length
    }

    /// The lane the vehicle is in.
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// The position of the front of the vehicle in m.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The vehicle's velocity in m/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// The acceleration chosen by the vehicle's last decision in m/s^2.
    pub fn acc(&self) -> f64 {
        self.acc
    }

    /// The velocity the vehicle will adopt at the end of the current step.
    pub fn next_vel(&self) -> f64 {
        self.next_vel
    }

    /// The recorded samples, starting with the state the vehicle was created in.
    pub fn history(&self) -> &[Sample] {
        &self.history
    }

    /// Clears the recorded samples, keeping only the current state.
    pub fn reset_history(&mut self) {
        self.history.clear();
        self.record();
    }

    /// Describes this vehicle to its neighbours.
    pub(crate) fn as_neighbour(&self) -> Neighbour {
        Neighbour {
            id: self.id,
            pos: self.pos,
            vel: self.vel,
            length: self.attributes.length,
        }
    }

    /// Runs the car following decision tree, returning the decision.
    pub fn decide(&self, leader: Option<&Leader>) -> Decision {
        self.acc_model.decide(self.vel, leader)
    }

    /// The acceleration rate used when the decision tree chooses to accelerate.
    pub fn acceleration_rate(&self) -> f64 {
        self.acc_model.acceleration_rate(self.vel)
    }

    /// The braking rate used when the decision tree chooses to decelerate.
    pub fn deceleration_rate(&self, leader: Option<&Leader>) -> f64 {
        self.acc_model.deceleration_rate(self.vel, leader)
    }

    /// The highest speed at which the vehicle can still stop behind the leader.
    pub fn safe_speed(&self, leader: Option<&Leader>) -> f64 {
        self.acc_model.safe_speed(self.vel, leader)
    }

    /// Chooses the vehicle's velocity for the next step.
    ///
    /// # Parameters
    /// * `leader` - The vehicle ahead, or `None` if the lane is otherwise empty
    /// * `dt` - The time step in seconds
    /// * `control` - The lane's speed control, when under central control
    /// * `rng` - The source of driver noise
    pub(crate) fn plan(
        &mut self,
        leader: Option<&Leader>,
        dt: f64,
        control: Option<&SpeedControl>,
        rng: &mut impl Rng,
    ) {
        self.acc = self.decide(leader).acc();

        let ideal = self
            .attributes
            .max_speed
            .min(self.vel + self.acc * dt)
            .min(self.safe_speed(leader));

        // Driver noise is only random when drivers act on their own
        let eta = match control {
            Some(_) => 0.5,
            None => rng.gen::<f64>(),
        };
        let mut next_vel = f64::max(ideal - self.attributes.noise * eta, 0.0);

        if let Some(control) = control {
            let diff = (control.mean_speed - next_vel).clamp(-control.max_accel, control.max_accel);
            next_vel += diff;

            // Only push the mean speed if that can't cause a collision within 3 seconds
            let safe = leader.map_or(true, |l| l.gap + 3.0 * (l.vel - next_vel) > 0.0);
            if safe && rng.gen::<f64>() < self.attributes.compliance {
                next_vel += control.speed_push;
            }
        }

        self.next_vel = next_vel;
    }

    /// Adopts the planned velocity and integrates the position.
    /// Returns `true` iff the vehicle passed the end of the ring and was wrapped.
    ///
    /// # Parameters
    /// * `dt` - The time step in seconds
    /// * `road_length` - The length of the ring road in m
    /// * `record` - Whether to record a history sample
    pub(crate) fn advance(&mut self, dt: f64, road_length: f64, record: bool) -> bool {
        self.vel = self.next_vel;
        self.pos += self.vel * dt;

        let crossed = self.pos >= road_length;
        if crossed {
            self.pos = self.pos.rem_euclid(road_length);
        }
        if record {
            self.record();
        }
        crossed
    }

    /// Moves the vehicle to another lane.
    pub(crate) fn set_lane(&mut self, lane: usize) {
        self.lane = lane;
    }

    /// Whether the vehicle fits into the given adjacent lane.
    pub fn can_change_into(&self, lane: &AdjacentLane, road_length: f64) -> bool {
        fits(self.pos, self.attributes.length, lane, road_length)
    }

    /// Chooses which lane the vehicle would like to be in.
    ///
    /// Must be evaluated against the current lane occupancy, and not at the
    /// same time as velocities are planned, otherwise the vehicle may not
    /// respond to a vehicle which has just moved in front of it.
    pub fn choose_lane(&self, strategy: LaneChangeStrategy, input: &LaneChangeInput) -> LaneChange {
        let road_length = input.road_length;
        let can_left = self.can_change_into(&input.left, road_length);
        let can_right = self.can_change_into(&input.right, road_length);
        if !can_left && !can_right {
            return LaneChange::Stay;
        }

        let blocked = is_blocked(self.pos, self.vel, input.leader.as_ref(), road_length);

        match strategy {
            LaneChangeStrategy::Greedy => match (blocked, can_left, can_right) {
                (true, true, _) => LaneChange::Left,
                (true, false, true) => LaneChange::Right,
                _ => LaneChange::Stay,
            },
            LaneChangeStrategy::Traditional => {
                if blocked {
                    return if can_left {
                        LaneChange::Left
                    } else {
                        LaneChange::Stay
                    };
                }
                if can_right && right_lane_clear(self.pos, &input.right, road_length) {
                    LaneChange::Right
                } else {
                    LaneChange::Stay
                }
            }
        }
    }

    fn record(&mut self) {
        self.history.push(Sample {
            pos: self.pos,
            lane: self.lane,
            vel: self.vel,
        });
    }
}
