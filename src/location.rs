//! Platform geolocation boundary.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::LocationError;
use crate::geofence::GeoPoint;

/// One-shot "get current position" capability.
///
/// The controller calls this once per mutation attempt and never caches the answer
/// across operations.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<GeoPoint, LocationError>;
}

#[async_trait]
impl<T: LocationProvider + ?Sized> LocationProvider for Arc<T> {
    async fn current_position(&self) -> Result<GeoPoint, LocationError> {
        (**self).current_position().await
    }
}

/// A provider whose answer is set by hand. Clones share the same answer.
///
/// Useful for kiosks with a known position and for tests.
#[derive(Debug, Clone)]
pub struct FixedLocation {
    answer: Arc<Mutex<Result<GeoPoint, LocationError>>>,
}

impl FixedLocation {
    pub fn at(point: GeoPoint) -> Self {
        Self {
            answer: Arc::new(Mutex::new(Ok(point))),
        }
    }

    pub fn failing(err: LocationError) -> Self {
        Self {
            answer: Arc::new(Mutex::new(Err(err))),
        }
    }

    pub fn move_to(&self, point: GeoPoint) {
        *self.answer.lock().unwrap_or_else(PoisonError::into_inner) = Ok(point);
    }

    pub fn fail_with(&self, err: LocationError) {
        *self.answer.lock().unwrap_or_else(PoisonError::into_inner) = Err(err);
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<GeoPoint, LocationError> {
        self.answer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
