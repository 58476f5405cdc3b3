use crate::control::{preferred_per_lane, CentralControl};
use crate::lane::Lane;
use crate::math::mean;
use crate::vehicle::{
    AdjacentLane, LaneChange, LaneChangeInput, LaneChangeStrategy, Leader, Vehicle,
    VehicleAttributes,
};
use crate::{Error, Result, VehicleId, VehicleSet};
use arrayvec::ArrayVec;
use log::{debug, trace};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use slotmap::SparseSecondaryMap;
use smallvec::SmallVec;

/// How vehicles are divided between the lanes when populating a track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneSplit {
    /// Cut the vehicles into lanes at uniformly random points.
    #[default]
    Random,
    /// Give each lane the same share of vehicles.
    Equal,
}

/// The attributes of a ring road.
#[derive(Clone, Copy, Debug)]
pub struct TrackAttributes {
    /// The length of the ring in m.
    pub road_length: f64,
    /// The number of lanes.
    pub lane_count: usize,
    /// The simulation time step in s.
    pub dt: f64,
    /// How drivers choose lanes when not under central control.
    pub strategy: LaneChangeStrategy,
    /// Central control, if enabled.
    pub control: Option<CentralControl>,
    /// Whether vehicles record a history sample every step.
    pub record_history: bool,
}

/// A multi-lane ring road and the vehicles driving on it.
#[derive(Clone, Debug)]
pub struct Track {
    /// The length of the ring in m.
    road_length: f64,
    /// The time step in s.
    dt: f64,
    /// How drivers choose lanes.
    strategy: LaneChangeStrategy,
    /// Central control, if enabled.
    control: Option<CentralControl>,
    /// Whether vehicles record their history.
    record_history: bool,
    /// The lanes, rightmost (slowest) first.
    lanes: Vec<Lane>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The number of steps simulated.
    frame: usize,
}

impl Track {
    /// Creates an empty track.
    pub fn new(attributes: &TrackAttributes) -> Result<Self> {
        if attributes.road_length <= 0.0 || !attributes.road_length.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "road length must be positive, got {}",
                attributes.road_length
            )));
        }
        if attributes.dt <= 0.0 || !attributes.dt.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "time step must be positive, got {}",
                attributes.dt
            )));
        }
        if attributes.lane_count == 0 {
            return Err(Error::InvalidConfig("a track needs at least one lane".into()));
        }

        Ok(Self {
            road_length: attributes.road_length,
            dt: attributes.dt,
            strategy: attributes.strategy,
            control: attributes.control,
            record_history: attributes.record_history,
            lanes: vec![Lane::default(); attributes.lane_count],
            vehicles: VehicleSet::default(),
            frame: 0,
        })
    }

    /// The length of the ring in m.
    pub fn road_length(&self) -> f64 {
        self.road_length
    }

    /// The simulation time step in s.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// The number of lanes.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// The lanes, rightmost first.
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Gets the number of steps simulated so far.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Returns an iterator over all the vehicles on the track.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// The number of vehicles on the track.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    /// Places `density` vehicles per km on the track, at random positions
    /// and speeds. Returns the number of vehicles added.
    pub fn populate(
        &mut self,
        density: f64,
        split: LaneSplit,
        attributes: &VehicleAttributes,
        rng: &mut impl Rng,
    ) -> Result<usize> {
        let total = (self.road_length / 1000.0 * density) as usize;
        let counts = split_counts(total, self.lanes.len(), split, rng);
        debug!("Populating {} vehicles as {:?} per lane", total, counts.as_slice());
        for (lane, count) in counts.into_iter().enumerate() {
            self.populate_lane(lane, count, attributes, rng)?;
        }
        Ok(total)
    }

    /// Adds `count` vehicles to a lane without any of them overlapping.
    fn populate_lane(
        &mut self,
        lane: usize,
        count: usize,
        attributes: &VehicleAttributes,
        rng: &mut impl Rng,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        let length = attributes.length;
        let span = self.road_length - count as f64 * length;
        if span < 0.0 {
            return Err(Error::TooDense {
                vehicles: count,
                length,
                road_length: self.road_length,
            });
        }

        let mut positions = sample_uniform(span, count, rng);
        positions.sort_by(f64::total_cmp);
        let speeds = sample_uniform(attributes.max_speed, count, rng);

        // Shift each vehicle forward by the lengths of those behind it
        for (k, (pos, vel)) in positions.into_iter().zip(speeds).enumerate() {
            self.add_vehicle(lane, pos + k as f64 * length, vel, attributes)?;
        }
        Ok(())
    }

    /// Adds a vehicle to the track.
    pub fn add_vehicle(
        &mut self,
        lane: usize,
        pos: f64,
        vel: f64,
        attributes: &VehicleAttributes,
    ) -> Result<VehicleId> {
        if lane >= self.lanes.len() {
            return Err(Error::LaneOutOfBounds {
                lane: lane as isize,
                lane_count: self.lanes.len(),
            });
        }
        let pos = pos.rem_euclid(self.road_length);
        let id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, attributes, lane, pos, vel));
        self.lanes[lane].insert_vehicle(&self.vehicles, id);
        Ok(id)
    }

    /// Gets the nearest vehicle in `lane` at or ahead of `pos`, wrapping around the ring.
    /// Returns `None` if the lane is empty or doesn't exist.
    pub fn car_in_front(&self, lane: usize, pos: f64) -> Option<VehicleId> {
        self.lanes.get(lane)?.car_in_front(&self.vehicles, pos)
    }

    /// Gets the nearest vehicle in `lane` behind `pos`, wrapping around the ring.
    /// Returns `None` if the lane is empty or doesn't exist.
    pub fn car_in_back(&self, lane: usize, pos: f64) -> Option<VehicleId> {
        self.lanes.get(lane)?.car_in_back(&self.vehicles, pos)
    }

    /// Describes the vehicle ahead of the given vehicle in its lane.
    pub fn leader(&self, id: VehicleId) -> Option<Leader> {
        let vehicle = self.vehicles.get(id)?;
        let lane = &self.lanes[vehicle.lane()];
        let idx = lane.vehicles().iter().position(|v| *v == id)?;
        lane.leader(&self.vehicles, idx, self.road_length)
    }

    /// Describes the lanes to the left and right of `lane` at position `pos`.
    pub fn adjacent(&self, lane: usize, pos: f64) -> (AdjacentLane, AdjacentLane) {
        let side = |idx: Option<usize>| {
            idx.and_then(|idx| self.lanes.get(idx))
                .map_or(AdjacentLane::Missing, |l| l.as_adjacent(&self.vehicles, pos))
        };
        (side(Some(lane + 1)), side(lane.checked_sub(1)))
    }

    /// Gathers what the given vehicle sees when deciding whether to change lanes.
    pub fn lane_change_input(&self, id: VehicleId) -> Option<LaneChangeInput> {
        let vehicle = self.vehicles.get(id)?;
        let lane = &self.lanes[vehicle.lane()];
        let leader = lane
            .vehicles()
            .iter()
            .position(|v| *v == id)
            .and_then(|idx| lane.leader_id(idx))
            .map(|id| self.vehicles[id].as_neighbour());
        let (left, right) = self.adjacent(vehicle.lane(), vehicle.pos());
        Some(LaneChangeInput {
            leader,
            left,
            right,
            road_length: self.road_length,
        })
    }

    /// Moves a vehicle `offset` lanes to the left (positive) or right (negative).
    pub fn switch_lane(&mut self, id: VehicleId, offset: isize) -> Result<()> {
        let from = self.vehicles.get(id).ok_or(Error::UnknownVehicle)?.lane();
        let to = from as isize + offset;
        if to < 0 || to as usize >= self.lanes.len() {
            return Err(Error::LaneOutOfBounds {
                lane: to,
                lane_count: self.lanes.len(),
            });
        }
        if offset == 0 {
            return Ok(());
        }

        let to = to as usize;
        self.lanes[from].remove_vehicle(id);
        self.vehicles[id].set_lane(to);
        self.lanes[to].insert_vehicle(&self.vehicles, id);
        trace!("Vehicle {:?} moved from lane {} to lane {}", id, from, to);
        Ok(())
    }

    /// Lets every driver choose a lane, one lane at a time from the right.
    /// Each vehicle changes lane at most once. Returns the number of lane changes.
    pub fn lane_changes(&mut self) -> Result<usize> {
        let mut moved = SparseSecondaryMap::<VehicleId, ()>::new();

        for lane in 0..self.lanes.len() {
            let ids = self.lanes[lane].vehicles().to_vec();
            for id in ids {
                if moved.contains_key(id) {
                    continue;
                }
                let Some(input) = self.lane_change_input(id) else {
                    continue;
                };
                let change = self.vehicles[id].choose_lane(self.strategy, &input);
                if change != LaneChange::Stay {
                    self.switch_lane(id, change.offset())?;
                    moved.insert(id, ());
                }
            }
        }

        Ok(moved.len())
    }

    /// Moves vehicles out of over-full lanes until each lane holds its share
    /// of the vehicles, where there is room. Returns the number of lane changes.
    pub fn balance_lanes(&mut self, rng: &mut impl Rng) -> Result<usize> {
        let preferred = preferred_per_lane(self.vehicles.len(), self.lanes.len());
        let mut changes = 0;

        for lane in 0..self.lanes.len() {
            let ids = self.lanes[lane].vehicles().to_vec();
            let mut count = ids.len();
            for id in ids {
                if count <= preferred[lane] {
                    break;
                }

                let vehicle = &self.vehicles[id];
                let (left, right) = self.adjacent(lane, vehicle.pos());
                let mut options = ArrayVec::<LaneChange, 2>::new();
                if vehicle.can_change_into(&left, self.road_length) {
                    options.push(LaneChange::Left);
                }
                if vehicle.can_change_into(&right, self.road_length) {
                    options.push(LaneChange::Right);
                }

                let change = match options.len() {
                    0 => continue,
                    1 => options[0],
                    n => options[rng.gen_range(0..n)],
                };
                self.switch_lane(id, change.offset())?;
                count -= 1;
                changes += 1;
            }
        }

        Ok(changes)
    }

    /// Every driver chooses their velocity for the next step.
    ///
    /// Vehicles respond to the state of their leaders at the start of the step,
    /// so the order in which they are evaluated does not matter.
    pub fn plan(&mut self, rng: &mut impl Rng) {
        let mut plans = Vec::with_capacity(self.vehicles.len());
        for lane in &self.lanes {
            let control = self
                .control
                .and_then(|c| c.for_lane(lane.mean_speed(&self.vehicles)));
            for (idx, id) in lane.vehicles().iter().enumerate() {
                let leader = lane.leader(&self.vehicles, idx, self.road_length);
                plans.push((*id, leader, control));
            }
        }

        for (id, leader, control) in plans {
            self.vehicles[id].plan(leader.as_ref(), self.dt, control.as_ref(), rng);
        }
    }

    /// Moves all vehicles by their planned velocities, wrapping them around the ring.
    /// Returns the number of vehicles which crossed the start of the ring.
    pub fn advance(&mut self) -> usize {
        let mut crossings = 0;
        for lane in &mut self.lanes {
            for id in lane.vehicles() {
                if self.vehicles[*id].advance(self.dt, self.road_length, self.record_history) {
                    crossings += 1;
                }
            }
            lane.sort(&self.vehicles);
        }
        self.frame += 1;
        crossings
    }

    /// Advances the simulation by one time step.
    /// Returns the number of vehicles which crossed the start of the ring.
    pub fn step(&mut self, rng: &mut impl Rng) -> Result<usize> {
        if self.lanes.len() > 1 {
            let changes = match self.control {
                Some(_) => self.balance_lanes(rng)?,
                None => self.lane_changes()?,
            };
            trace!("Frame {}: {} lane changes", self.frame, changes);
        }
        self.plan(rng);
        Ok(self.advance())
    }

    /// The mean velocity of all vehicles, or `None` if there are none.
    pub fn mean_speed(&self) -> Option<f64> {
        mean(self.vehicles.values().map(|v| v.vel()))
    }

    /// Clears every vehicle's recorded history, keeping only its current state.
    pub fn reset_histories(&mut self) {
        for vehicle in self.vehicles.values_mut() {
            vehicle.reset_history();
        }
    }
}

/// Splits `total` vehicles between `lane_count` lanes.
fn split_counts(
    total: usize,
    lane_count: usize,
    split: LaneSplit,
    rng: &mut impl Rng,
) -> SmallVec<[usize; 4]> {
    let mut cuts: SmallVec<[usize; 4]> = match split {
        LaneSplit::Equal => (1..lane_count).map(|k| k * total / lane_count).collect(),
        LaneSplit::Random => (1..lane_count)
            .map(|_| (rng.gen::<f64>() * total as f64) as usize)
            .collect(),
    };
    cuts.sort_unstable();
    cuts.push(total);

    cuts.iter()
        .scan(0, |prev, &cut| {
            let count = cut - *prev;
            *prev = cut;
            Some(count)
        })
        .collect()
}

/// Draws `count` values uniformly from `[0, max)`, or zeros if the range is empty.
fn sample_uniform(max: f64, count: usize, rng: &mut impl Rng) -> Vec<f64> {
    if max > 0.0 {
        let distr = Uniform::new(0.0, max);
        (0..count).map(|_| distr.sample(rng)).collect()
    } else {
        vec![0.0; count]
    }
}
