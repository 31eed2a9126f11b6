use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000001_create_attendance_tables"
    }
}

#[derive(DeriveIden)]
enum Campuses {
    Table,
    Id,
    Name,
    Latitude,
    Longitude,
    AllowedRadiusM,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    Code,
    Name,
    DepartmentId,
    BatchId,
}

#[derive(DeriveIden)]
enum ClassSessions {
    Table,
    Id,
    CourseId,
    CampusId,
    LecturerId,
    StartsAt,
    DurationMinutes,
    Room,
}

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    FullName,
    RegistrationNumber,
    DepartmentId,
    BatchId,
}

#[derive(DeriveIden)]
enum AttendanceRecords {
    Table,
    Id,
    SessionId,
    StudentId,
    Status,
    RecordedAt,
    Latitude,
    Longitude,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Campuses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campuses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Campuses::Name).string().not_null())
                    .col(ColumnDef::new(Campuses::Latitude).double().not_null())
                    .col(ColumnDef::new(Campuses::Longitude).double().not_null())
                    .col(ColumnDef::new(Campuses::AllowedRadiusM).double().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Courses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Courses::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Courses::Code).string().not_null())
                    .col(ColumnDef::new(Courses::Name).string().not_null())
                    .col(ColumnDef::new(Courses::DepartmentId).big_integer().not_null())
                    .col(ColumnDef::new(Courses::BatchId).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ClassSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClassSessions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClassSessions::CourseId).big_integer().not_null())
                    .col(ColumnDef::new(ClassSessions::CampusId).big_integer().not_null())
                    .col(ColumnDef::new(ClassSessions::LecturerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(ClassSessions::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClassSessions::DurationMinutes)
                            .integer()
                            .not_null()
                            .default(60),
                    )
                    .col(ColumnDef::new(ClassSessions::Room).string().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_class_sessions_course")
                            .from(ClassSessions::Table, ClassSessions::CourseId)
                            .to(Courses::Table, Courses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_class_sessions_campus")
                            .from(ClassSessions::Table, ClassSessions::CampusId)
                            .to(Campuses::Table, Campuses::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Students::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Students::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Students::FullName).string().not_null())
                    .col(
                        ColumnDef::new(Students::RegistrationNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Students::DepartmentId).big_integer().not_null())
                    .col(ColumnDef::new(Students::BatchId).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_students_cohort")
                    .table(Students::Table)
                    .col(Students::DepartmentId)
                    .col(Students::BatchId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AttendanceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AttendanceRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AttendanceRecords::SessionId).big_integer().not_null())
                    .col(ColumnDef::new(AttendanceRecords::StudentId).big_integer().not_null())
                    .col(ColumnDef::new(AttendanceRecords::Status).string().not_null())
                    .col(
                        ColumnDef::new(AttendanceRecords::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AttendanceRecords::Latitude).double().null())
                    .col(ColumnDef::new(AttendanceRecords::Longitude).double().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_records_session")
                            .from(AttendanceRecords::Table, AttendanceRecords::SessionId)
                            .to(ClassSessions::Table, ClassSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendance_records_student")
                            .from(AttendanceRecords::Table, AttendanceRecords::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_attendance_records_session_student")
                    .table(AttendanceRecords::Table)
                    .col(AttendanceRecords::SessionId)
                    .col(AttendanceRecords::StudentId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AttendanceRecords::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClassSessions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courses::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campuses::Table).if_exists().to_owned())
            .await
    }
}
