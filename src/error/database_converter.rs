//! Conversion of diesel errors into the application error taxonomy.
//!
//! Unique violations become `Duplicate` with entity/field extracted from the
//! constraint name; everything else keeps the diesel error as source context.

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::error::AppError;

pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    /// Converts a diesel error into an `AppError`, attaching the operation
    /// name for logging context.
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::NotFound => AppError::NotFound {
                entity: "record".to_string(),
                field: "query".to_string(),
                value: operation.to_string(),
            },
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                let (entity, field) = Self::parse_constraint(
                    info.constraint_name().unwrap_or(""),
                    info.table_name().unwrap_or("record"),
                );
                AppError::Duplicate {
                    entity,
                    field,
                    value: info.details().unwrap_or("").to_string(),
                }
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                AppError::Validation {
                    field: info.constraint_name().unwrap_or("reference").to_string(),
                    reason: "Referenced record does not exist".to_string(),
                }
            }
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }

    /// Pulls (entity, field) out of Postgres constraint names such as
    /// `users_email_key` or `idx_attempts_campaign_recipient`.
    fn parse_constraint(constraint: &str, table: &str) -> (String, String) {
        let trimmed = constraint
            .trim_start_matches("idx_")
            .trim_end_matches("_key")
            .trim_end_matches("_unique");

        if let Some(field) = trimmed.strip_prefix(&format!("{}_", table)) {
            return (table.to_string(), field.to_string());
        }

        (table.to_string(), trimmed.to_string())
    }
}
