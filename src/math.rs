//! Ring road geometry and small numeric helpers.

use cgmath::Point2;
use std::f64::consts::TAU;

/// A 2D point
pub type Point2d = Point2<f64>;

/// The forward distance from `from` to `to` around a ring of the given length,
/// in the range `[0, length)`.
pub fn ring_distance(from: f64, to: f64, length: f64) -> f64 {
    (to - from).rem_euclid(length)
}

/// Maps an arc length along a circle of the given circumference and radius
/// to cartesian coordinates. Arc length 0 lies on the positive x-axis.
pub fn ring_point(alpha: f64, circumference: f64, radius: f64) -> Point2d {
    let theta = TAU * (alpha / circumference);
    Point2d::new(radius * theta.cos(), radius * theta.sin())
}

/// Returns `num` evenly spaced values over the closed interval `[start, end]`.
pub fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    match num {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (num - 1) as f64;
            (0..num).map(|i| start + step * i as f64).collect()
        }
    }
}

/// The arithmetic mean of the values, or `None` if there are none.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn ring_distance_wraps() {
        assert_approx_eq!(ring_distance(1990.0, 10.0, 2000.0), 20.0);
        assert_approx_eq!(ring_distance(10.0, 1990.0, 2000.0), 1980.0);
        assert_approx_eq!(ring_distance(500.0, 500.0, 2000.0), 0.0);
    }

    #[test]
    fn ring_point_quarter_turns() {
        let p = ring_point(500.0, 2000.0, 10.0);
        assert_approx_eq!(p.x, 0.0);
        assert_approx_eq!(p.y, 10.0);
        let p = ring_point(1000.0, 2000.0, 10.0);
        assert_approx_eq!(p.x, -10.0);
    }

    #[test]
    fn linspace_matches_density_sweep() {
        let values = linspace(0.0, 140.0, 10);
        assert_eq!(values.len(), 10);
        assert_approx_eq!(values[1], 140.0 / 9.0);
        assert_approx_eq!(values[9], 140.0);
        assert_eq!(linspace(3.0, 7.0, 1), vec![3.0]);
    }

    #[test]
    fn mean_of_nothing() {
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(mean([1.0, 2.0, 3.0]), Some(2.0));
    }
}
