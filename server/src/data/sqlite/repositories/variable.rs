//! Variable repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{NewVariable, VariableRow, VariableUpdate};

const VARIABLE_COLUMNS: &str =
    "id, organization_id, user_id, key, value, description, created_at, updated_at";

type VariableTuple = (String, String, String, String, String, Option<String>, i64, i64);

fn to_row(
    (id, organization_id, user_id, key, value, description, created_at, updated_at): VariableTuple,
) -> VariableRow {
    VariableRow {
        id,
        organization_id,
        user_id,
        key,
        value,
        description,
        created_at,
        updated_at,
    }
}

/// List variables ordered by key
pub async fn list_variables(
    pool: &SqlitePool,
    org_id: &str,
) -> Result<Vec<VariableRow>, SqliteError> {
    let rows = sqlx::query_as::<_, VariableTuple>(&format!(
        "SELECT {VARIABLE_COLUMNS} FROM variables WHERE organization_id = ? ORDER BY key ASC"
    ))
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(to_row).collect())
}

pub async fn get_variable(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
) -> Result<Option<VariableRow>, SqliteError> {
    let row = sqlx::query_as::<_, VariableTuple>(&format!(
        "SELECT {VARIABLE_COLUMNS} FROM variables WHERE organization_id = ? AND id = ?"
    ))
    .bind(org_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_row))
}

/// Whether `key` is taken in the organization, ignoring `exclude_id`
pub async fn key_exists(
    pool: &SqlitePool,
    org_id: &str,
    key: &str,
    exclude_id: Option<&str>,
) -> Result<bool, SqliteError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM variables WHERE organization_id = ? AND key = ? AND (? IS NULL OR id != ?)",
    )
    .bind(org_id)
    .bind(key)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn create_variable(
    pool: &SqlitePool,
    org_id: &str,
    user_id: &str,
    new: &NewVariable,
) -> Result<VariableRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(&format!(
        "INSERT INTO variables ({VARIABLE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&id)
    .bind(org_id)
    .bind(user_id)
    .bind(&new.key)
    .bind(&new.value)
    .bind(&new.description)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(VariableRow {
        id,
        organization_id: org_id.to_string(),
        user_id: user_id.to_string(),
        key: new.key.clone(),
        value: new.value.clone(),
        description: new.description.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn update_variable(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
    update: &VariableUpdate,
) -> Result<Option<VariableRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        UPDATE variables SET
            key = COALESCE(?, key),
            value = COALESCE(?, value),
            description = CASE WHEN ? THEN ? ELSE description END,
            updated_at = ?
        WHERE organization_id = ? AND id = ?
        "#,
    )
    .bind(&update.key)
    .bind(&update.value)
    .bind(update.description.is_some())
    .bind(update.description.clone().flatten())
    .bind(now)
    .bind(org_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_variable(pool, org_id, id).await
}

pub async fn delete_variable(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM variables WHERE organization_id = ? AND id = ?")
        .bind(org_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
