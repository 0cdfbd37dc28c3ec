//! Perpendicular distance from the current position to the start line.

use crate::gis::{LocalScale, Position};
use crate::line::DefinedLine;

/// Perpendicular distance in metres from `current` to `line`.
///
/// The line is treated as infinite, so the distance keeps meaning even when
/// the boat sails past either end of the marked segment.
pub fn distance_to_line(line: &DefinedLine, current: Position, scale: &LocalScale) -> f64 {
    let current_local = scale.project(current, line.origin);
    let along = line.direction.dot(current_local);
    let closest = line.direction * along;
    (current_local - closest).norm()
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use chrono::{DateTime, Utc};

    use super::distance_to_line;
    use crate::fix::Fix;
    use crate::gis::{LocalScale, Position};
    use crate::line::StartLine;

    fn fix(time: &str, latitude: f64, longitude: f64) -> Fix {
        Fix {
            time: DateTime::parse_from_rfc3339(time)
                .unwrap()
                .with_timezone(&Utc),
            position: Position::new(latitude, longitude),
        }
    }

    fn north_south_line() -> (StartLine, LocalScale) {
        let scale = LocalScale::default();
        let mut line = StartLine::default();
        line.mark(fix("2022-11-10T22:14:31.000Z", 47.0000, -122.0000), &scale);
        line.mark(fix("2022-11-10T22:15:02.000Z", 47.0010, -122.0000), &scale);
        (line, scale)
    }

    #[test]
    fn test_distance_west_of_line() {
        let (line, scale) = north_south_line();
        let defined = line.defined().unwrap();

        let distance = distance_to_line(&defined, Position::new(47.0005, -122.0005), &scale);
        assert_relative_eq!(37.3125, distance, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_on_line_is_zero() {
        let (line, scale) = north_south_line();
        let defined = line.defined().unwrap();

        let distance = distance_to_line(&defined, Position::new(47.0005, -122.0000), &scale);
        assert_relative_eq!(0.0, distance, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_beyond_segment_end() {
        let (line, scale) = north_south_line();
        let defined = line.defined().unwrap();

        // Collinear with the marks but well past the second one.
        let distance = distance_to_line(&defined, Position::new(47.0100, -122.0000), &scale);
        assert_relative_eq!(0.0, distance, epsilon = 1e-9);

        // Past the end and to one side, only the offset counts.
        let distance = distance_to_line(&defined, Position::new(47.0100, -122.0004), &scale);
        assert_relative_eq!(29.85, distance, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_same_both_sides() {
        let (line, scale) = north_south_line();
        let defined = line.defined().unwrap();

        let west = distance_to_line(&defined, Position::new(47.0005, -122.0005), &scale);
        let east = distance_to_line(&defined, Position::new(47.0005, -121.9995), &scale);
        assert_relative_eq!(west, east, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_grows_with_offset() {
        let (line, scale) = north_south_line();
        let defined = line.defined().unwrap();

        let longitudes = [-122.0001, -122.0002, -122.0005, -122.0010];
        let distances: Vec<f64> = longitudes
            .iter()
            .map(|&lon| distance_to_line(&defined, Position::new(47.0005, lon), &scale))
            .collect();
        for pair in distances.windows(2) {
            assert!(pair[0] < pair[1], "expected {} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_distance_invariant_under_translation() {
        let scale = LocalScale::default();

        let mut original = StartLine::default();
        original.mark(fix("2022-11-10T22:14:31.000Z", 47.0000, -122.0000), &scale);
        original.mark(fix("2022-11-10T22:15:02.000Z", 47.0010, -122.0000), &scale);

        // The same line and boat, shifted by a common offset.
        let mut translated = StartLine::default();
        translated.mark(fix("2022-11-10T22:14:31.000Z", 47.3000, -121.3000), &scale);
        translated.mark(fix("2022-11-10T22:15:02.000Z", 47.3010, -121.3000), &scale);

        let here = distance_to_line(
            &original.defined().unwrap(),
            Position::new(47.0005, -122.0005),
            &scale,
        );
        let there = distance_to_line(
            &translated.defined().unwrap(),
            Position::new(47.3005, -121.3005),
            &scale,
        );
        assert_relative_eq!(here, there, epsilon = 1e-6);
    }
}
