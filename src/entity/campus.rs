//! Campus entity model.

use sea_orm::entity::prelude::*;

/// A campus and the geofence every session held there inherits.
///
/// | Column           | Type               | Description                        |
/// |------------------|--------------------|------------------------------------|
/// | id               | BIGINT (Primary)   | Campus id                          |
/// | name             | TEXT               | Display name                       |
/// | latitude         | DOUBLE             | Registered center, degrees         |
/// | longitude        | DOUBLE             | Registered center, degrees         |
/// | allowed_radius_m | DOUBLE             | Reporting radius around the center |
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "campuses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub allowed_radius_m: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::class_session::Entity")]
    ClassSessions,
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClassSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
