use super::Point3;

/// Returns the Euclidean distance between two 3D points.
#[must_use]
pub fn euclidean_distance(a: &Point3, b: &Point3) -> f64 {
    nalgebra::distance(a, b)
}

/// Returns the length of the open chain through `points`.
///
/// Sums the distances between consecutive points. Fewer than two points
/// yields `0.0`.
#[must_use]
pub fn polyline_length(points: &[Point3]) -> f64 {
    points
        .windows(2)
        .map(|w| euclidean_distance(&w[0], &w[1]))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn distance_3_4_12() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 4.0, 12.0);
        assert_relative_eq!(euclidean_distance(&a, &b), 13.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Point3::new(1.5, -2.0, 0.25);
        let b = Point3::new(-4.0, 7.0, 3.0);
        assert_relative_eq!(euclidean_distance(&a, &b), euclidean_distance(&b, &a));
    }

    #[test]
    fn length_of_short_chains_is_zero() {
        assert_relative_eq!(polyline_length(&[]), 0.0);
        assert_relative_eq!(polyline_length(&[Point3::new(1.0, 2.0, 3.0)]), 0.0);
    }

    #[test]
    fn length_sums_segments() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(3.0, 4.0, 0.0),
            Point3::new(3.0, 4.0, 2.0),
        ];
        assert_relative_eq!(polyline_length(&pts), 9.0);
    }

    #[test]
    fn reversed_chain_has_same_length() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.5),
            Point3::new(-1.0, 0.5, 3.0),
        ];
        let mut rev = pts.clone();
        rev.reverse();
        assert_relative_eq!(polyline_length(&pts), polyline_length(&rev));
    }
}
