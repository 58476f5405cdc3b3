//! Fundamental diagram charts: flow or mean speed against density.

use crate::{Model, Result, Statistic};
use itertools::{Itertools, MinMaxResult};
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

/// Chart size in pixels.
const SIZE: (u32, u32) = (1024, 768);

/// Plots every run's value of `stat` at each density as gray points,
/// with the mean over all runs as a black line, and saves the chart as a PNG.
pub fn plot_statistic(model: &Model, stat: Statistic, out: impl AsRef<Path>) -> Result<()> {
    let points = model.points(stat);
    let curve = model.mean_curve(stat);
    let x_range = padded_range(model.densities().iter().copied());
    let y_range = padded_range(points.iter().map(|(_, y)| *y));

    let root = BitMapBackend::new(out.as_ref(), SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(stat.title(), ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Density (veh/km)")
        .y_desc(stat.axis_label())
        .draw()?;

    let gray = RGBColor(128, 128, 128).mix(0.5);
    chart.draw_series(
        points
            .iter()
            .map(|&point| Circle::new(point, 3, gray.filled())),
    )?;

    chart
        .draw_series(LineSeries::new(curve, BLACK.stroke_width(2)))?
        .label(stat.legend())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    log::info!("Saved {} chart to {}", stat, out.as_ref().display());
    Ok(())
}

/// The range spanned by the values, widened by 5% on each side.
/// An empty or flat set of values still gives a drawable range.
pub(crate) fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = match values.minmax_by(f64::total_cmp) {
        MinMaxResult::NoElements => (0.0, 1.0),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    let pad = match max - min {
        span if span > 0.0 => span * 0.05,
        _ => f64::max(min.abs() * 0.05, 1.0),
    };
    (min - pad)..(max + pad)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn renders_png() {
        let mut model = Model::new(crate::ModelConfig {
            total_time: 10.0,
            road_length: 200.0,
            runs: 2,
            max_density: 50.0,
            density_steps: 3,
            seed: Some(2),
            ..Default::default()
        })
        .unwrap();
        model.run_all(None).unwrap();

        let out = std::env::temp_dir().join(format!("traffic-agents-speed-{}.png", std::process::id()));
        plot_statistic(&model, Statistic::Speed, &out).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
        std::fs::remove_file(&out).unwrap();
    }

    #[test]
    fn range_is_padded() {
        let range = padded_range([0.0, 140.0, 70.0].into_iter());
        assert_approx_eq!(range.start, -7.0);
        assert_approx_eq!(range.end, 147.0);
    }

    #[test]
    fn degenerate_ranges() {
        let range = padded_range(std::iter::empty());
        assert_approx_eq!(range.start, -0.05);
        assert_approx_eq!(range.end, 1.05);
        assert_eq!(padded_range([0.0, 0.0].into_iter()), -1.0..1.0);
        let range = padded_range([100.0].into_iter());
        assert_approx_eq!(range.start, 95.0);
        assert_approx_eq!(range.end, 105.0);
    }
}
