/// Speed at or below which vehicles accelerate at [LOW_SPEED_ACC], in m/s.
const LOW_SPEED: f64 = 12.19; // m/s

/// Acceleration rate used at low speeds, in m/s<sup>2</sup>.
const LOW_SPEED_ACC: f64 = 1.1; // m/s^2

/// Acceleration rate used above [LOW_SPEED], in m/s<sup>2</sup>.
const HIGH_SPEED_ACC: f64 = 0.37; // m/s^2

/// A leader further away than this many seconds of travel is ignored.
const FOLLOWING_HORIZON: f64 = 6.0; // s

/// The minimum gap at which a close follower may cruise, in m.
const MIN_CRUISE_GAP: f64 = 7.5; // m

/// Driver reaction time used by the safe speed calculation, in s.
const REACTION_TIME: f64 = 1.0; // s

/// What a following vehicle observes of the vehicle ahead of it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Leader {
    /// The net gap between the follower's front and the leader's rear, in m.
    pub gap: f64,
    /// The leader's velocity in m/s.
    pub vel: f64,
    /// The leader's most recent acceleration in m/s<sup>2</sup>.
    pub acc: f64,
}

/// The outcome of the car following decision tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    /// Speed up at the given rate.
    Accelerate(f64),
    /// Hold the current speed.
    Cruise,
    /// Slow down at the given (non-negative) rate.
    Decelerate(f64),
}

impl Decision {
    /// The signed acceleration in m/s<sup>2</sup>.
    pub fn acc(&self) -> f64 {
        match *self {
            Decision::Accelerate(rate) => rate,
            Decision::Cruise => 0.0,
            Decision::Decelerate(rate) => -rate,
        }
    }
}

/// The decision tree car following model of a driver.
#[derive(Clone, Debug)]
pub struct AccelerationModel {
    desired_vel: f64,
    headway: f64,
    normal_acc: f64,
    max_acc: f64,
}

/// The parameters of the acceleration model.
pub struct ModelParams {
    /// The speed the driver wants to travel at in m/s.
    pub desired_velocity: f64,
    /// The desired gap between this and the vehicle ahead in seconds.
    pub time_headway: f64,
    /// The normal acceleration in m/s<sup>2</sup>.
    pub normal_acceleration: f64,
    /// The vehicle's maximum acceleration in m/s<sup>2</sup>.
    pub max_acceleration: f64,
}

impl AccelerationModel {
    /// Creates a new acceleration model.
    pub fn new(params: &ModelParams) -> Self {
        AccelerationModel {
            desired_vel: params.desired_velocity,
            headway: params.time_headway,
            normal_acc: params.normal_acceleration,
            max_acc: params.max_acceleration,
        }
    }

    /// The gap the driver would like to keep at the given velocity, in m.
    pub fn desired_gap(&self, vel: f64) -> f64 {
        vel * self.headway
    }

    /// Runs the decision tree for a vehicle travelling at `vel`.
    ///
    /// # Arguments
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    /// * `leader` - The vehicle ahead, or `None` on an otherwise empty lane.
    pub fn decide(&self, vel: f64, leader: Option<&Leader>) -> Decision {
        let accelerate = Decision::Accelerate(self.acceleration_rate(vel));
        let decelerate = || Decision::Decelerate(self.deceleration_rate(vel, leader));

        let following = leader.filter(|l| l.gap < FOLLOWING_HORIZON * vel);
        let Some(leader) = following else {
            // Free flow: approach the desired speed
            let delta = vel - self.desired_vel;
            return if delta < 0.0 {
                accelerate
            } else if delta == 0.0 {
                Decision::Cruise
            } else {
                decelerate()
            };
        };

        let gap = leader.gap;
        let delta = gap - self.desired_gap(vel);
        if delta > 0.0 {
            if leader.vel >= vel || gap > 3.0 * vel {
                accelerate
            } else if gap > 2.0 * vel && gap > MIN_CRUISE_GAP {
                Decision::Cruise
            } else {
                decelerate()
            }
        } else if delta == 0.0 {
            if leader.vel >= vel {
                Decision::Cruise
            } else {
                decelerate()
            }
        } else if leader.vel > vel {
            Decision::Cruise
        } else {
            decelerate()
        }
    }

    /// The acceleration rate of a vehicle travelling at `vel`.
    pub fn acceleration_rate(&self, vel: f64) -> f64 {
        if vel <= LOW_SPEED {
            LOW_SPEED_ACC
        } else {
            HIGH_SPEED_ACC
        }
    }

    /// Calculates how hard the vehicle should brake, as a non-negative rate.
    ///
    /// # Arguments
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    /// * `leader` - The vehicle ahead, if any.
    pub fn deceleration_rate(&self, vel: f64, leader: Option<&Leader>) -> f64 {
        // Free flowing, but above the desired speed
        if vel > self.desired_vel {
            return f64::min((vel - self.desired_vel) / 3.0, self.normal_acc);
        }

        let Some(leader) = leader else {
            return 0.0;
        };
        let (gap, their_vel, their_acc) = (leader.gap, leader.vel, leader.acc);
        let delta = gap - self.desired_gap(vel);

        let rate = if delta == 0.0 && their_vel < vel {
            // Normal car following deceleration
            (vel.powi(2) - their_vel.powi(2)) / (2.0 * gap)
        } else if delta < 0.0 && their_vel <= vel {
            // Emergency deceleration
            0.25 * self.normal_acc - their_acc
        } else if delta > 0.0
            && their_vel < vel
            && gap <= 3.0 * vel
            && !(gap > 2.0 * vel && gap > MIN_CRUISE_GAP)
        {
            // Near collision
            (vel - their_vel).powi(2) / (2.0 * gap) - their_acc
        } else {
            return 0.0;
        };

        if rate.is_nan() {
            self.max_acc
        } else {
            rate.clamp(0.0, self.max_acc)
        }
    }

    /// The highest speed at which the vehicle can still stop behind the leader,
    /// allowing for the driver's reaction time.
    pub fn safe_speed(&self, vel: f64, leader: Option<&Leader>) -> f64 {
        match leader {
            Some(leader) => {
                let their_vel = leader.vel;
                let braking = REACTION_TIME + (vel + their_vel) / (2.0 * self.max_acc);
                their_vel + (leader.gap - their_vel * REACTION_TIME) / braking
            }
            None => f64::INFINITY,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn model() -> AccelerationModel {
        AccelerationModel::new(&ModelParams {
            desired_velocity: 30.0,
            time_headway: 1.2,
            normal_acceleration: 3.05,
            max_acceleration: 6.04,
        })
    }

    fn leader(gap: f64, vel: f64, acc: f64) -> Leader {
        Leader { gap, vel, acc }
    }

    #[test]
    fn accelerates_behind_distant_leader() {
        // gap 100 < 6 * 25, gap exceeds the desired 30 m and the leader isn't slower
        let decision = model().decide(25.0, Some(&leader(100.0, 25.0, 0.37)));
        assert_eq!(decision, Decision::Accelerate(0.37));
        assert_approx_eq!(decision.acc(), 0.37);
    }

    #[test]
    fn no_deceleration_when_no_case_applies() {
        let rate = model().deceleration_rate(25.0, Some(&leader(100.0, 25.0, 0.37)));
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn acceleration_rate_thresholds() {
        assert_eq!(model().acceleration_rate(12.19), 1.1);
        assert_eq!(model().acceleration_rate(12.2), 0.37);
    }

    #[test]
    fn safe_speed() {
        let v_safe = model().safe_speed(25.0, Some(&leader(100.0, 25.0, 0.0)));
        assert_approx_eq!(v_safe, 39.59, 0.1);
        assert_eq!(model().safe_speed(25.0, None), f64::INFINITY);
    }

    #[test]
    fn free_flow_approaches_desired_speed() {
        let m = model();
        assert_eq!(m.decide(10.0, None), Decision::Accelerate(1.1));
        assert_eq!(m.decide(30.0, None), Decision::Cruise);
        // (33 - 30) / 3 = 1
        assert_eq!(m.decide(33.0, None), Decision::Decelerate(1.0));
        // Capped at the normal acceleration
        assert_eq!(m.decide(45.0, None), Decision::Decelerate(3.05));
    }

    #[test]
    fn cruises_at_desired_gap_behind_equal_speed() {
        // desired gap at 20 m/s is 24 m
        assert_eq!(
            model().decide(20.0, Some(&leader(24.0, 20.0, 0.0))),
            Decision::Cruise
        );
    }

    #[test]
    fn normal_deceleration_at_desired_gap() {
        let decision = model().decide(20.0, Some(&leader(24.0, 10.0, 0.0)));
        // (400 - 100) / 48 = 6.25, capped at the maximum 6.04
        assert_eq!(decision, Decision::Decelerate(6.04));
    }

    #[test]
    fn emergency_deceleration_inside_desired_gap() {
        let decision = model().decide(20.0, Some(&leader(10.0, 20.0, -1.0)));
        match decision {
            Decision::Decelerate(rate) => assert_approx_eq!(rate, 0.25 * 3.05 + 1.0),
            other => panic!("expected deceleration, got {:?}", other),
        }
    }

    #[test]
    fn cruises_between_two_and_three_seconds_behind_slower_leader() {
        // desired gap 24 m; 2 * 20 < 50 <= 3 * 20
        assert_eq!(
            model().decide(20.0, Some(&leader(50.0, 15.0, 0.0))),
            Decision::Cruise
        );
    }

    #[test]
    fn near_collision_deceleration() {
        // gap 30 > desired 24, but gap <= 2 * vel and the leader is slower
        let decision = model().decide(20.0, Some(&leader(30.0, 10.0, 0.0)));
        match decision {
            Decision::Decelerate(rate) => assert_approx_eq!(rate, 100.0 / 60.0),
            other => panic!("expected deceleration, got {:?}", other),
        }
    }

    #[test]
    fn ignores_leader_beyond_horizon() {
        // 200 m is more than 6 s of travel at 20 m/s
        assert_eq!(
            model().decide(20.0, Some(&leader(200.0, 0.0, 0.0))),
            Decision::Accelerate(0.37)
        );
    }

    #[test]
    fn stopped_vehicle_pulls_away() {
        assert_eq!(
            model().decide(0.0, Some(&leader(3.0, 0.0, 0.0))),
            Decision::Accelerate(1.1)
        );
    }
}
