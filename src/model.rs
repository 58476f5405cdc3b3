//! The density sweep experiment: populate a ring road at a range of
//! densities, simulate each one, and measure the resulting traffic flow.

use crate::export;
use crate::math::{linspace, mean};
use crate::{Error, ModelConfig, Result, Track};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Seconds per hour, for converting crossings into flow.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// A quantity measured at each density.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Statistic {
    /// Vehicles passing the start of the ring, in veh/h.
    Flow,
    /// Mean vehicle speed at the end of the simulation, in m/s.
    Speed,
}

impl FromStr for Statistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flow" | "position" => Ok(Statistic::Flow),
            "speed" | "velocity" => Ok(Statistic::Speed),
            _ => Err(Error::UnknownStatistic(s.to_string())),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Flow => write!(f, "flow"),
            Statistic::Speed => write!(f, "speed"),
        }
    }
}

impl Statistic {
    /// The chart title.
    pub fn title(&self) -> &'static str {
        match self {
            Statistic::Flow => "The relationship between flow and density",
            Statistic::Speed => "The relationship between mean-speed and density",
        }
    }

    /// The y-axis label.
    pub fn axis_label(&self) -> &'static str {
        match self {
            Statistic::Flow => "Flow (veh/h)",
            Statistic::Speed => "Mean Speed (m/s)",
        }
    }

    /// The legend entry of the mean curve.
    pub fn legend(&self) -> &'static str {
        match self {
            Statistic::Flow => "Mean flow",
            Statistic::Speed => "Mean speed",
        }
    }

    /// Extracts this statistic from a result.
    pub fn value(&self, result: &DensityResult) -> Option<f64> {
        match self {
            Statistic::Flow => Some(result.flow),
            Statistic::Speed => result.mean_speed,
        }
    }
}

/// The outcome of simulating one density.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DensityResult {
    /// The requested density in veh/km.
    pub density: f64,
    /// The number of vehicles placed on the track.
    pub vehicles: usize,
    /// The number of times a vehicle crossed the start of the ring.
    pub crossings: usize,
    /// The traffic flow in veh/h.
    pub flow: f64,
    /// The mean vehicle speed at the end of the simulation, if there were any vehicles.
    pub mean_speed: Option<f64>,
}

/// The outcome of one sweep over all densities.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    /// The index of the run.
    pub index: usize,
    /// One result per density, in increasing density order.
    pub densities: Vec<DensityResult>,
}

/// A density sweep experiment.
#[derive(Clone, Debug)]
pub struct Model {
    config: ModelConfig,
    densities: Vec<f64>,
    results: Vec<RunResult>,
}

impl Model {
    /// Creates a model from a validated configuration.
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        let densities = linspace(config.min_density, config.max_density, config.density_steps);
        Ok(Self {
            config,
            densities,
            results: vec![],
        })
    }

    /// The configuration of the experiment.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The densities simulated by each run, in veh/km.
    pub fn densities(&self) -> &[f64] {
        &self.densities
    }

    /// The results of every run so far.
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    /// Creates the random number generator of the given run.
    fn rng(&self, idx: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(idx as u64)),
            None => StdRng::from_entropy(),
        }
    }

    /// Sweeps over every density once.
    /// When `export_dir` is given, the first run writes each density's trajectories there.
    pub fn run(&self, idx: usize, export_dir: Option<&Path>) -> Result<RunResult> {
        let mut rng = self.rng(idx);
        let export_dir = export_dir.filter(|_| idx == 0);
        let attributes = self.config.track_attributes(export_dir.is_some());
        let steps = self.config.steps();
        let time = self.config.simulated_time();

        let mut densities = Vec::with_capacity(self.densities.len());
        for &density in &self.densities {
            let mut track = Track::new(&attributes)?;
            let vehicles =
                track.populate(density, self.config.lane_split, &self.config.vehicle, &mut rng)?;

            let mut crossings = 0;
            for _ in 0..steps {
                crossings += track.step(&mut rng)?;
            }

            let result = DensityResult {
                density,
                vehicles,
                crossings,
                flow: crossings as f64 * SECONDS_PER_HOUR / time,
                mean_speed: track.mean_speed(),
            };
            debug!(
                "Run {} density {:.1}: {} vehicles, flow {:.1} veh/h, mean speed {:?}",
                idx, density, vehicles, result.flow, result.mean_speed
            );

            if let Some(dir) = export_dir {
                let name = export::file_name(
                    self.config.central_control,
                    self.config.lane_count,
                    density,
                );
                export::write_trajectories(dir.join(name), &track)?;
            }
            densities.push(result);
        }

        Ok(RunResult {
            index: idx,
            densities,
        })
    }

    /// Performs every run of the experiment, replacing any earlier results.
    pub fn run_all(&mut self, export_dir: Option<&Path>) -> Result<&[RunResult]> {
        if let Some(dir) = export_dir {
            std::fs::create_dir_all(dir)?;
        }
        info!(
            "Simulating {} runs of {} densities on {} lane(s), {} control",
            self.config.runs,
            self.densities.len(),
            self.config.lane_count,
            if self.config.central_control { "central" } else { "individual" },
        );

        let mut results = Vec::with_capacity(self.config.runs);
        for idx in 0..self.config.runs {
            results.push(self.run(idx, export_dir)?);
            info!("Run {}/{} complete", idx + 1, self.config.runs);
        }
        self.results = results;
        Ok(&self.results)
    }

    /// The value of the statistic averaged over all runs, for each density.
    /// Densities at which no run produced a value are omitted.
    pub fn mean_curve(&self, stat: Statistic) -> Vec<(f64, f64)> {
        self.densities
            .iter()
            .enumerate()
            .filter_map(|(i, &density)| {
                let values = self
                    .results
                    .iter()
                    .filter_map(|run| run.densities.get(i))
                    .filter_map(|result| stat.value(result));
                mean(values).map(|value| (density, value))
            })
            .collect()
    }

    /// Every (density, value) point of every run.
    pub fn points(&self, stat: Statistic) -> Vec<(f64, f64)> {
        self.results
            .iter()
            .flat_map(|run| run.densities.iter())
            .filter_map(|result| stat.value(result).map(|value| (result.density, value)))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn small_config() -> ModelConfig {
        ModelConfig {
            total_time: 50.0,
            road_length: 500.0,
            runs: 2,
            max_density: 40.0,
            density_steps: 3,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn parse_statistic() {
        assert_eq!("flow".parse::<Statistic>().unwrap(), Statistic::Flow);
        assert_eq!("position".parse::<Statistic>().unwrap(), Statistic::Flow);
        assert_eq!("Speed".parse::<Statistic>().unwrap(), Statistic::Speed);
        assert_eq!("velocity".parse::<Statistic>().unwrap(), Statistic::Speed);
        assert!(matches!(
            "density".parse::<Statistic>(),
            Err(Error::UnknownStatistic(_))
        ));
    }

    #[test]
    fn densities_span_range() {
        let model = Model::new(ModelConfig::default()).unwrap();
        assert_eq!(model.densities().len(), 10);
        assert_eq!(model.densities()[0], 0.0);
        assert_approx_eq!(model.densities()[9], 140.0);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ModelConfig {
            lane_count: 0,
            ..Default::default()
        };
        assert!(Model::new(config).is_err());
    }

    #[test]
    fn run_measures_each_density() {
        let model = Model::new(small_config()).unwrap();
        let run = model.run(1, None).unwrap();
        assert_eq!(run.index, 1);
        assert_eq!(run.densities.len(), 3);

        let empty = &run.densities[0];
        assert_eq!(empty.vehicles, 0);
        assert_eq!(empty.crossings, 0);
        assert_eq!(empty.flow, 0.0);
        assert_eq!(empty.mean_speed, None);

        let busiest = &run.densities[2];
        assert_eq!(busiest.vehicles, 20);
        assert_approx_eq!(busiest.flow, busiest.crossings as f64 * 72.0);
        assert!(busiest.mean_speed.is_some());
    }

    #[test]
    fn seeded_runs_repeat() {
        let model = Model::new(small_config()).unwrap();
        assert_eq!(model.run(0, None).unwrap(), model.run(0, None).unwrap());
    }

    #[test]
    fn mean_curve_skips_undefined_speeds() {
        let mut model = Model::new(small_config()).unwrap();
        model.run_all(None).unwrap();
        assert_eq!(model.results().len(), 2);

        let flow = model.mean_curve(Statistic::Flow);
        assert_eq!(flow.len(), 3);
        assert_eq!(flow[0], (0.0, 0.0));

        let speed = model.mean_curve(Statistic::Speed);
        assert_eq!(speed.len(), 2);
        assert_eq!(speed[0].0, 20.0);
        assert_eq!(model.points(Statistic::Speed).len(), 4);
    }
}
