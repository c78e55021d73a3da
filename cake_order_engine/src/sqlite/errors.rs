use thiserror::Error;

/// Errors from the SQLite-specific housekeeping methods on [`super::SqliteDatabase`] (seeding users and products,
/// running migrations). Trait methods report the storage errors defined alongside each trait instead.
#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("A user with email {0} already exists")]
    DuplicateUser(String),
    #[error("Product #{0} does not exist")]
    ProductNotFound(i64),
}
