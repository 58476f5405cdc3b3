pub use cgmath;
pub use config::ModelConfig;
pub use control::{preferred_per_lane, CentralControl, SpeedControl};
pub use error::{Error, Result};
pub use lane::Lane;
pub use model::{DensityResult, Model, RunResult, Statistic};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use track::{LaneSplit, Track, TrackAttributes};
pub use vehicle::{
    AdjacentLane, Decision, LaneChange, LaneChangeInput, LaneChangeStrategy, Leader, Neighbour,
    Sample, Vehicle, VehicleAttributes,
};

pub mod animation;
mod config;
mod control;
mod error;
pub mod export;
mod lane;
pub mod math;
mod model;
pub mod plot;
mod track;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
