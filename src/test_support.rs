use time::macros::datetime;
use time::Duration;

use crate::geofence::{GeoPoint, Geofence};
use crate::model::{CampusRef, ClassSession, CourseRef, Student};

pub(crate) const CAMPUS_CENTER: GeoPoint = GeoPoint {
    latitude: 6.9271,
    longitude: 79.8612,
};

pub(crate) fn student(id: i64, name: &str, department_id: i64, batch_id: i64) -> Student {
    Student {
        id,
        name: name.to_string(),
        registration_number: format!("REG-{id:04}"),
        department_id,
        batch_id,
    }
}

pub(crate) fn class_session(id: i64, department_id: i64, batch_id: i64) -> ClassSession {
    ClassSession {
        id,
        course: CourseRef {
            id: 100 + id,
            department_id,
            batch_id,
        },
        campus: CampusRef {
            id: 1,
            geofence: Geofence::new(CAMPUS_CENTER, 100.0),
        },
        lecturer_id: 42,
        starts_at: datetime!(2025-03-01 09:00 UTC),
        duration: Duration::hours(2),
        room: Some("B-201".to_string()),
    }
}
