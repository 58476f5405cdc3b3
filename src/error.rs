//! Error types for the traffic simulation.

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

/// Main error type for simulation, export and rendering operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Too many vehicles were requested for a single lane.
    #[error("Cannot fit {vehicles} vehicles of length {length} m on a {road_length} m lane")]
    TooDense {
        /// Vehicles requested for the lane
        vehicles: usize,
        /// Length of each vehicle in m
        length: f64,
        /// Length of the ring road in m
        road_length: f64,
    },

    /// A vehicle was asked to move to a lane which doesn't exist.
    #[error("Lane {lane} is out of bounds (the track has {lane_count} lanes)")]
    LaneOutOfBounds {
        /// The requested lane index
        lane: isize,
        /// Number of lanes on the track
        lane_count: usize,
    },

    /// The vehicle is not on the track.
    #[error("No such vehicle on the track")]
    UnknownVehicle,

    /// A statistic name could not be parsed.
    #[error("Unrecognised statistic '{0}'")]
    UnknownStatistic(String),

    /// A lane change strategy name could not be parsed.
    #[error("Unrecognised lane change strategy '{0}'")]
    UnknownStrategy(String),

    /// A trajectory file contained no records.
    #[error("No trajectory records in {0}")]
    EmptyTrajectories(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Drawing a chart or animation frame failed.
    #[error("Plotting error: {0}")]
    Plot(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for Error {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        Error::Plot(err.to_string())
    }
}

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, Error>;
