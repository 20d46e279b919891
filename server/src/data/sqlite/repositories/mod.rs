//! SQLite repositories
//!
//! Free functions over `&SqlitePool`, one module per table family. Types
//! (UserRow, PromptRow, etc.) live in `crate::data::types`.

pub mod invitation;
pub mod membership;
pub mod organization;
pub mod profile;
pub mod prompt;
pub mod provider_key;
pub mod scenario;
pub mod user;
pub mod variable;

use super::SqliteError;

/// Parse a stored enum column, reporting the column on failure
pub(crate) fn decode<T>(
    column: &str,
    value: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, SqliteError> {
    parse(value).ok_or_else(|| {
        SqliteError::Database(sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: format!("unexpected value {:?}", value).into(),
        })
    })
}
