use crate::math::{mean, ring_distance};
use crate::vehicle::{AdjacentLane, Leader};
use crate::{VehicleId, VehicleSet};

/// A single lane of the ring road.
#[derive(Clone, Debug, Default)]
pub struct Lane {
    /// The vehicles on the lane, ordered by position.
    vehicles: Vec<VehicleId>,
}

impl Lane {
    /// The vehicles on the lane, ordered by position.
    pub fn vehicles(&self) -> &[VehicleId] {
        &self.vehicles
    }

    /// The number of vehicles on the lane.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Whether the lane has no vehicles.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Inserts the vehicle with the given ID into the lane.
    pub(crate) fn insert_vehicle(&mut self, vehicles: &VehicleSet, id: VehicleId) {
        let veh_pos = vehicles[id].pos();
        let idx = self
            .vehicles
            .iter()
            .map(|id| vehicles[*id].pos())
            .position(|pos| pos > veh_pos)
            .unwrap_or(self.vehicles.len());
        self.vehicles.insert(idx, id);
    }

    /// Removes the vehicle with the given ID from the lane.
    pub(crate) fn remove_vehicle(&mut self, id: VehicleId) {
        if let Some(idx) = self.vehicles.iter().rposition(|v| *v == id) {
            self.vehicles.remove(idx);
        }
    }

    /// Restores position order after the vehicles have moved.
    pub(crate) fn sort(&mut self, vehicles: &VehicleSet) {
        self.vehicles
            .sort_by(|a, b| vehicles[*a].pos().total_cmp(&vehicles[*b].pos()));
    }

    /// Gets the nearest vehicle at or ahead of `pos`, wrapping around the ring.
    pub fn car_in_front(&self, vehicles: &VehicleSet, pos: f64) -> Option<VehicleId> {
        self.vehicles
            .iter()
            .find(|id| vehicles[**id].pos() >= pos)
            .or_else(|| self.vehicles.first())
            .copied()
    }

    /// Gets the nearest vehicle behind `pos`, wrapping around the ring.
    pub fn car_in_back(&self, vehicles: &VehicleSet, pos: f64) -> Option<VehicleId> {
        self.vehicles
            .iter()
            .rev()
            .find(|id| vehicles[**id].pos() < pos)
            .or_else(|| self.vehicles.last())
            .copied()
    }

    /// Gets the vehicle ahead of the `idx`-th vehicle on the lane,
    /// or `None` if that vehicle is alone.
    pub(crate) fn leader_id(&self, idx: usize) -> Option<VehicleId> {
        match self.vehicles.len() {
            0 | 1 => None,
            n => Some(self.vehicles[(idx + 1) % n]),
        }
    }

    /// Describes the vehicle ahead of the `idx`-th vehicle, as seen by that vehicle.
    pub(crate) fn leader(&self, vehicles: &VehicleSet, idx: usize, road_length: f64) -> Option<Leader> {
        let follower = &vehicles[self.vehicles[idx]];
        self.leader_id(idx).map(|id| {
            let leader = &vehicles[id];
            let dist = ring_distance(follower.pos(), leader.pos(), road_length);
            Leader {
                gap: f64::max(dist - leader.length(), 0.0),
                vel: leader.vel(),
                acc: leader.acc(),
            }
        })
    }

    /// Describes the lane as seen by a vehicle beside it at `pos`.
    pub(crate) fn as_adjacent(&self, vehicles: &VehicleSet, pos: f64) -> AdjacentLane {
        match (self.car_in_front(vehicles, pos), self.car_in_back(vehicles, pos)) {
            (Some(front), Some(behind)) => AdjacentLane::Occupied {
                front: vehicles[front].as_neighbour(),
                behind: vehicles[behind].as_neighbour(),
            },
            _ => AdjacentLane::Empty,
        }
    }

    /// The mean velocity of the vehicles on the lane, or `None` if it is empty.
    pub fn mean_speed(&self, vehicles: &VehicleSet) -> Option<f64> {
        mean(self.vehicles.iter().map(|id| vehicles[*id].vel()))
    }
}
