//! Database access layer with domain-specific DAOs
//!
//! The durable store is the authoritative side of the usage ledger and the
//! target of the run-persistence transaction. Each domain has its own DAO
//! for focused operations.

use sea_orm::{ConnectOptions, DatabaseConnection};
use thiserror::Error;

pub mod config;
pub mod dao;
pub mod entities;
pub mod migration;

pub use dao::{PromptsDao, UsersDao};

use crate::database::config::DatabaseConfig;

/// Database error types
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Record not found")]
    NotFound,
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Migration error: {0}")]
    Migration(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Database connection manager
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Create database manager from configuration
    pub async fn new_from_config(config: &DatabaseConfig) -> DatabaseResult<Self> {
        let mut options = ConnectOptions::new(config.url.clone());
        options.max_connections(config.max_connections);

        let connection = sea_orm::Database::connect(options)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(Self { connection })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> DatabaseResult<()> {
        use crate::database::migration::Migrator;
        use sea_orm_migration::MigratorTrait;

        tracing::info!("Running database migrations");

        Migrator::up(&self.connection, None)
            .await
            .map_err(|e| DatabaseError::Migration(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Successfully completed all migrations");
        Ok(())
    }

    /// Health check for database connection
    pub async fn health_check(&self) -> DatabaseResult<()> {
        self.connection
            .ping()
            .await
            .map_err(|e| DatabaseError::Database(format!("db error: {}", e)))
    }

    /// Get prompts DAO
    pub fn prompts(&self) -> PromptsDao {
        PromptsDao::new(self.connection.clone())
    }

    /// Get users DAO
    pub fn users(&self) -> UsersDao {
        UsersDao::new(self.connection.clone())
    }

    /// Get direct database connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}
