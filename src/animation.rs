//! Animated side by side comparison of two recorded simulations,
//! with each lane drawn as a concentric circle.

use crate::export::TrajectoryRecord;
use crate::math::{ring_point, Point2d};
use crate::{Error, Result};
use itertools::Itertools;
use plotters::prelude::*;
use std::f64::consts::TAU;
use std::path::Path;

/// The distance between the circles of adjacent lanes, in m.
pub const LANE_SPACING: f64 = 10.0;

/// Empty space around the outermost lane, in m.
const PADDING: f64 = 100.0;

/// The panel titles.
const TITLES: [&str; 2] = ["Human-Based", "Smart-City"];

/// Points per lane circle.
const CIRCLE_RESOLUTION: usize = 360;

/// Options for rendering an animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationSettings {
    /// The length of the ring road the records were taken on, in m.
    pub road_length: f64,
    /// The time each frame is shown for, in ms.
    pub frame_delay: u32,
    /// The size of the image in pixels.
    pub size: (u32, u32),
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            road_length: 2000.0,
            frame_delay: 100,
            size: (1200, 600),
        }
    }
}

/// The radius of the circle lane `lane` is drawn on.
/// The rightmost lane is drawn at the radius whose circumference is the road length.
pub fn lane_radius(lane: usize, road_length: f64) -> f64 {
    road_length / TAU + lane as f64 * LANE_SPACING
}

/// Where a record is drawn.
pub fn record_point(record: &TrajectoryRecord, road_length: f64) -> Point2d {
    ring_point(record.alpha, road_length, lane_radius(record.lane, road_length))
}

/// The `q`-th quantile of the values, interpolating linearly between samples.
pub(crate) fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let sorted: Vec<f64> = values.iter().copied().sorted_by(f64::total_cmp).collect();
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Maps speeds onto a diverging blue to red colour scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedScale {
    /// The speed drawn in the coolest colour.
    pub min: f64,
    /// The speed drawn in the warmest colour. Faster vehicles are clamped to it.
    pub max: f64,
}

impl SpeedScale {
    /// The colour stops of the scale.
    const STOPS: [(u8, u8, u8); 3] = [(59, 76, 192), (221, 221, 221), (180, 4, 38)];

    /// A scale from the slowest speed in either data set to the larger of their
    /// 95th percentile speeds, so a few outliers don't wash out the colours.
    pub fn new(a: &[TrajectoryRecord], b: &[TrajectoryRecord]) -> Option<Self> {
        let speeds_a: Vec<f64> = a.iter().map(|r| r.speed).collect();
        let speeds_b: Vec<f64> = b.iter().map(|r| r.speed).collect();
        let min = speeds_a
            .iter()
            .chain(&speeds_b)
            .copied()
            .min_by(f64::total_cmp)?;
        let max = [quantile(&speeds_a, 0.95), quantile(&speeds_b, 0.95)]
            .into_iter()
            .flatten()
            .max_by(f64::total_cmp)?;
        Some(Self { min, max })
    }

    /// The position of a speed on the scale, from 0 to 1.
    pub fn normalize(&self, speed: f64) -> f64 {
        if self.max > self.min {
            ((speed - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    /// The colour of a vehicle travelling at `speed`.
    pub fn color(&self, speed: f64) -> RGBColor {
        let t = self.normalize(speed) * 2.0;
        let (from, to, t) = if t <= 1.0 {
            (Self::STOPS[0], Self::STOPS[1], t)
        } else {
            (Self::STOPS[1], Self::STOPS[2], t - 1.0)
        };
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
    }
}

/// Every distinct timestep in either data set, in order.
pub fn timesteps(a: &[TrajectoryRecord], b: &[TrajectoryRecord]) -> Vec<f64> {
    a.iter()
        .chain(b)
        .map(|r| r.timestep)
        .sorted_by(f64::total_cmp)
        .dedup()
        .collect()
}

/// Renders the two data sets side by side as an animated GIF, with one frame
/// per timestep. Returns the number of frames drawn.
pub fn animate(
    human: &[TrajectoryRecord],
    smart: &[TrajectoryRecord],
    settings: &AnimationSettings,
    out: impl AsRef<Path>,
) -> Result<usize> {
    if settings.road_length <= 0.0 || !settings.road_length.is_finite() {
        return Err(Error::InvalidConfig(format!(
            "road length must be positive, got {}",
            settings.road_length
        )));
    }
    let scale = SpeedScale::new(human, smart)
        .ok_or_else(|| Error::EmptyTrajectories("both data sets".into()))?;
    let frames = timesteps(human, smart);
    let max_lane = human.iter().chain(smart).map(|r| r.lane).max().unwrap_or(0);
    let extent = lane_radius(max_lane, settings.road_length) + PADDING;

    let data = [human, smart].map(|records| {
        records
            .iter()
            .into_group_map_by(|r| r.timestep.to_bits())
    });
    let circles: Vec<Vec<(f64, f64)>> = (0..=max_lane)
        .map(|lane| circle(lane_radius(lane, settings.road_length)))
        .collect();

    let root = BitMapBackend::gif(out.as_ref(), settings.size, settings.frame_delay)
        .map_err(|err| Error::Plot(err.to_string()))?
        .into_drawing_area();
    log::info!(
        "Rendering {} frames, speeds {:.1} to {:.1} m/s",
        frames.len(),
        scale.min,
        scale.max
    );

    for &t in &frames {
        root.fill(&WHITE)?;
        let panels = root.split_evenly((1, 2));
        for (idx, panel) in panels.iter().enumerate() {
            let mut chart = ChartBuilder::on(panel)
                .caption(TITLES[idx], ("sans-serif", 22))
                .margin(10)
                .build_cartesian_2d(-extent..extent, -extent..extent)?;

            for points in &circles {
                chart.draw_series(LineSeries::new(points.iter().copied(), RGBColor(128, 128, 128)))?;
            }

            let records = data[idx].get(&t.to_bits()).map(Vec::as_slice).unwrap_or(&[]);
            chart.draw_series(records.iter().map(|r| {
                let p = record_point(r, settings.road_length);
                Circle::new((p.x, p.y), 3, scale.color(r.speed).mix(0.8).filled())
            }))?;
        }
        panels[0].draw(&Text::new(
            format!("t = {}", t),
            (15, 40),
            ("sans-serif", 18).into_font(),
        ))?;
        root.present()?;
    }
    log::info!("Saved animation to {}", out.as_ref().display());
    Ok(frames.len())
}

/// A closed polyline around a circle centred on the origin.
fn circle(radius: f64) -> Vec<(f64, f64)> {
    (0..=CIRCLE_RESOLUTION)
        .map(|i| {
            let theta = TAU * i as f64 / CIRCLE_RESOLUTION as f64;
            (radius * theta.cos(), radius * theta.sin())
        })
        .collect()
}
