//! Attendance record entity model.
//!
//! The only table [`SeaOrmStore`](crate::SeaOrmStore) writes to. A unique index on
//! `(session_id, student_id)` backs the one-record-per-student rule that the
//! delete-then-insert reconciliation maintains.

use sea_orm::entity::prelude::*;

/// Stored attendance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Status {
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "absent")]
    Absent,
    #[sea_orm(string_value = "late")]
    Late,
}

/// Sea-ORM entity model representing an attendance record.
///
/// | Column      | Type                 | Description                            |
/// |-------------|----------------------|----------------------------------------|
/// | id          | BIGINT (Primary Key) | Record id                              |
/// | session_id  | BIGINT               | Class session                          |
/// | student_id  | BIGINT               | Student                                |
/// | status      | TEXT                 | `present`, `absent` or `late`          |
/// | recorded_at | TIMESTAMPTZ          | When the lecturer recorded the status  |
/// | latitude    | DOUBLE NULL          | Reporter position at recording time    |
/// | longitude   | DOUBLE NULL          | Reporter position at recording time    |
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    pub student_id: i64,
    pub status: Status,
    pub recorded_at: DateTimeWithTimeZone,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class_session::Entity",
        from = "Column::SessionId",
        to = "super::class_session::Column::Id"
    )]
    ClassSession,
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClassSession.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
