//! Types and functions relating to geography computation.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position<CRS = WGS84> {
    /// Latitude of the position (in degrees).
    pub latitude: f64,
    /// Longitude of the position (in degrees).
    pub longitude: f64,
    #[serde(skip)]
    coordinate_reference_system: PhantomData<CRS>,
}

impl<CRS> Position<CRS> {
    /// Construct a new [`Position`].
    pub fn new(latitude: f64, longitude: f64) -> Position<CRS> {
        Self {
            latitude,
            longitude,
            coordinate_reference_system: PhantomData,
        }
    }
}

/// WGS84 Coordinate system.
#[derive(PartialEq, Debug, Copy, Clone, Serialize, Deserialize)]
pub struct WGS84;

/// Metres per degree along each axis, used to project positions into a flat
/// local frame. Only valid within a narrow latitude band; the default values
/// are calibrated for around 48° N.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LocalScale {
    /// Metres of northing per degree of latitude.
    pub meters_per_degree_lat: f64,
    /// Metres of easting per degree of longitude.
    pub meters_per_degree_lon: f64,
}

impl Default for LocalScale {
    fn default() -> Self {
        Self {
            meters_per_degree_lat: 111190.0,
            meters_per_degree_lon: 74625.0,
        }
    }
}

impl LocalScale {
    /// Project `point` into the local frame anchored at `origin`, scaling
    /// the degree offsets per axis.
    pub fn project(&self, point: Position, origin: Position) -> LocalVector {
        LocalVector {
            north: (point.latitude - origin.latitude) * self.meters_per_degree_lat,
            east: (point.longitude - origin.longitude) * self.meters_per_degree_lon,
        }
    }
}

/// A vector in the local flat frame, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalVector {
    /// Northing component in metres.
    pub north: f64,
    /// Easting component in metres.
    pub east: f64,
}

impl LocalVector {
    /// Dot product with `other`.
    pub fn dot(&self, other: LocalVector) -> f64 {
        self.north * other.north + self.east * other.east
    }

    /// Euclidean length of this vector.
    pub fn norm(&self) -> f64 {
        self.north.hypot(self.east)
    }

    /// The unit vector pointing in the same direction, or `None` for a
    /// zero-length vector.
    pub fn unit(&self) -> Option<LocalVector> {
        let norm = self.norm();
        if norm > 0.0 {
            Some(LocalVector {
                north: self.north / norm,
                east: self.east / norm,
            })
        } else {
            None
        }
    }
}

impl std::ops::Sub for LocalVector {
    type Output = LocalVector;

    fn sub(self, rhs: LocalVector) -> Self::Output {
        LocalVector {
            north: self.north - rhs.north,
            east: self.east - rhs.east,
        }
    }
}

impl std::ops::Mul<f64> for LocalVector {
    type Output = LocalVector;

    fn mul(self, rhs: f64) -> Self::Output {
        LocalVector {
            north: self.north * rhs,
            east: self.east * rhs,
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::{LocalScale, LocalVector, Position};

    #[test]
    fn test_project() {
        let scale = LocalScale::default();
        let origin = Position::new(47.0000, -122.0000);
        let projected = scale.project(Position::new(47.0005, -122.0005), origin);
        assert_relative_eq!(55.595, projected.north, epsilon = 1e-6);
        assert_relative_eq!(-37.3125, projected.east, epsilon = 1e-6);
    }

    #[test]
    fn test_project_origin_is_zero() {
        let scale = LocalScale::default();
        let origin = Position::new(47.0000, -122.0000);
        let projected = scale.project(origin, origin);
        assert_eq!(0.0, projected.north);
        assert_eq!(0.0, projected.east);
    }

    #[test]
    fn test_unit() {
        let unit = LocalVector {
            north: 3.0,
            east: 4.0,
        }
        .unit()
        .unwrap();
        assert_relative_eq!(0.6, unit.north, epsilon = 1e-12);
        assert_relative_eq!(0.8, unit.east, epsilon = 1e-12);
        assert_relative_eq!(1.0, unit.norm(), epsilon = 1e-12);
    }

    #[test]
    fn test_unit_of_zero_vector() {
        assert!(LocalVector {
            north: 0.0,
            east: 0.0
        }
        .unit()
        .is_none());
    }

    #[test]
    fn test_dot() {
        let a = LocalVector {
            north: 1.0,
            east: 0.0,
        };
        let b = LocalVector {
            north: 55.595,
            east: -37.3125,
        };
        assert_relative_eq!(55.595, a.dot(b), epsilon = 1e-12);
    }
}
