//! Embedded schema for `bankline.duckdb`
//!
//! Scripts run in list order and are recorded by name in `sys_migrations`.
//! New scripts are appended as `NNN_description.sql`; applied ones are never
//! edited.

pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
