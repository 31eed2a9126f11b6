#![allow(dead_code)]

use std::sync::Arc;

use attendance_capture::{
    AttendanceController, CampusRef, ClassSession, CourseRef, FixedLocation, GeoPoint, Geofence,
    ManualClock, MemoryStore, Student,
};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

pub const T0: OffsetDateTime = datetime!(2025-03-01 09:00 UTC);

pub const CENTER: GeoPoint = GeoPoint {
    latitude: 6.9271,
    longitude: 79.8612,
};

pub const SESSION_ID: i64 = 7;
pub const ASHA: i64 = 1;
pub const BIMAL: i64 = 2;
pub const CHEN: i64 = 3;

const METERS_PER_DEGREE_LAT: f64 = 111_194.93;

/// A point `meters` due north of the campus center.
pub fn north_of_center(meters: f64) -> GeoPoint {
    GeoPoint::new(CENTER.latitude + meters / METERS_PER_DEGREE_LAT, CENTER.longitude)
}

pub fn student(id: i64, name: &str, department_id: i64, batch_id: i64) -> Student {
    Student {
        id,
        name: name.to_string(),
        registration_number: format!("CS/{batch_id}/{id:03}"),
        department_id,
        batch_id,
    }
}

pub fn class_session() -> ClassSession {
    ClassSession {
        id: SESSION_ID,
        course: CourseRef {
            id: 30,
            department_id: 10,
            batch_id: 2024,
        },
        campus: CampusRef {
            id: 1,
            geofence: Geofence::new(CENTER, 100.0),
        },
        lecturer_id: 42,
        starts_at: T0,
        duration: Duration::hours(2),
        room: Some("Hall A".to_string()),
    }
}

pub type Controller = AttendanceController<Arc<MemoryStore>, FixedLocation>;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub location: FixedLocation,
    pub clock: ManualClock,
    pub controller: Controller,
}

/// Three enrolled students in the session's cohort plus one from another batch.
pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.add_class_session(class_session());
    store.add_student(student(CHEN, "chen", 10, 2024));
    store.add_student(student(ASHA, "Asha", 10, 2024));
    store.add_student(student(BIMAL, "Bimal", 10, 2024));
    store.add_student(student(4, "Dilan", 10, 2023));

    let location = FixedLocation::at(CENTER);
    let clock = ManualClock::new(T0);
    let controller = AttendanceController::new(Arc::clone(&store), location.clone())
        .with_clock(clock.clone());

    Harness {
        store,
        location,
        clock,
        controller,
    }
}
