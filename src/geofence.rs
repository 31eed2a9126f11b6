//! Great-circle distance and geofence containment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Haversine distance to `other` in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_meters(self, other)
    }
}

/// A center point plus an allowed radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub center: GeoPoint,
    pub radius_m: f64,
}

/// The reporter was outside the fence.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("reporter is {distance_m:.1} m from the center, allowed radius is {radius_m:.1} m")]
pub struct OutsideGeofence {
    pub distance_m: f64,
    pub radius_m: f64,
}

/// A reporter position that has passed a geofence check.
///
/// Only [`Geofence::verify`] builds one, so holding a value proves the check happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerifiedLocation {
    point: GeoPoint,
    distance_m: f64,
}

impl VerifiedLocation {
    pub fn point(&self) -> GeoPoint {
        self.point
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }
}

impl Geofence {
    pub fn new(center: GeoPoint, radius_m: f64) -> Self {
        Self { center, radius_m }
    }

    /// Inclusive containment: a reporter exactly `radius_m` away is inside.
    pub fn contains(&self, reporter: &GeoPoint) -> bool {
        is_within_geofence(reporter, self)
    }

    pub fn verify(&self, reporter: GeoPoint) -> Result<VerifiedLocation, OutsideGeofence> {
        let distance_m = distance_meters(&reporter, &self.center);
        if distance_m <= self.radius_m {
            Ok(VerifiedLocation {
                point: reporter,
                distance_m,
            })
        } else {
            Err(OutsideGeofence {
                distance_m,
                radius_m: self.radius_m,
            })
        }
    }
}

pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

pub fn is_within_geofence(reporter: &GeoPoint, fence: &Geofence) -> bool {
    distance_meters(reporter, &fence.center) <= fence.radius_m
}
