//! Scenario repository for SQLite operations
//!
//! A scenario owns an ordered list of turns; EXPECT turns own expectations.
//! Turn sets are always written whole, inside the scenario's transaction.

use std::collections::HashMap;

use sqlx::{Sqlite, SqlitePool, Transaction};

use super::decode;
use crate::data::sqlite::SqliteError;
use crate::data::types::{
    Expectation, NewScenario, NewTurn, ResourceRef, ScenarioDetail, ScenarioRow,
    ScenarioSummaryRow, ScenarioUpdate, TurnDetail, TurnType,
};

const SCENARIO_COLUMNS: &str =
    "id, organization_id, user_id, name, description, version, created_at, updated_at";

type ScenarioTuple = (String, String, String, String, Option<String>, i64, i64, i64);

fn to_row(
    (id, organization_id, user_id, name, description, version, created_at, updated_at): ScenarioTuple,
) -> ScenarioRow {
    ScenarioRow {
        id,
        organization_id,
        user_id,
        name,
        description,
        version,
        created_at,
        updated_at,
    }
}

fn encode_err(e: serde_json::Error) -> SqliteError {
    SqliteError::Database(sqlx::Error::Encode(Box::new(e)))
}

fn decode_err(e: serde_json::Error) -> SqliteError {
    SqliteError::Database(sqlx::Error::Decode(Box::new(e)))
}

/// List scenarios with turn counts, most recently updated first
pub async fn list_scenarios(
    pool: &SqlitePool,
    org_id: &str,
) -> Result<Vec<ScenarioSummaryRow>, SqliteError> {
    let rows = sqlx::query_as::<_, (String, String, String, String, Option<String>, i64, i64, i64, i64, i64)>(
        r#"
        SELECT s.id, s.organization_id, s.user_id, s.name, s.description, s.version,
               s.created_at, s.updated_at,
               (SELECT COUNT(*) FROM scenario_turns t WHERE t.scenario_id = s.id),
               (SELECT COUNT(*) FROM scenario_turns t WHERE t.scenario_id = s.id AND t.turn_type = 'USER')
        FROM scenarios s
        WHERE s.organization_id = ?
        ORDER BY s.updated_at DESC, s.id ASC
        "#,
    )
    .bind(org_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(id, org, user, name, desc, version, created, updated, turn_count, user_turn_count)| {
                ScenarioSummaryRow {
                    scenario: to_row((id, org, user, name, desc, version, created, updated)),
                    turn_count,
                    user_turn_count,
                }
            },
        )
        .collect())
}

pub async fn get_scenario(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
) -> Result<Option<ScenarioRow>, SqliteError> {
    let row = sqlx::query_as::<_, ScenarioTuple>(&format!(
        "SELECT {SCENARIO_COLUMNS} FROM scenarios WHERE organization_id = ? AND id = ?"
    ))
    .bind(org_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(to_row))
}

/// Scenario with its turns (by `turn_index`) and expectations (by `position`)
pub async fn get_scenario_detail(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
) -> Result<Option<ScenarioDetail>, SqliteError> {
    let Some(scenario) = get_scenario(pool, org_id, id).await? else {
        return Ok(None);
    };

    let turn_rows = sqlx::query_as::<_, (String, i64, String, Option<String>)>(
        "SELECT id, turn_index, turn_type, user_text FROM scenario_turns WHERE scenario_id = ? ORDER BY turn_index ASC",
    )
    .bind(&scenario.id)
    .fetch_all(pool)
    .await?;

    let expectation_rows = sqlx::query_as::<_, (String, String, String)>(
        r#"
        SELECT e.turn_id, e.expectation_type, e.args_json
        FROM scenario_expectations e
        JOIN scenario_turns t ON t.id = e.turn_id
        WHERE t.scenario_id = ?
        ORDER BY e.turn_id, e.position ASC
        "#,
    )
    .bind(&scenario.id)
    .fetch_all(pool)
    .await?;

    let mut by_turn: HashMap<String, Vec<Expectation>> = HashMap::new();
    for (turn_id, expectation_type, args_json) in expectation_rows {
        let expectation =
            Expectation::from_stored(&expectation_type, &args_json).map_err(decode_err)?;
        by_turn.entry(turn_id).or_default().push(expectation);
    }

    let turns = turn_rows
        .into_iter()
        .map(|(id, turn_index, turn_type, user_text)| {
            Ok(TurnDetail {
                expectations: by_turn.remove(&id).unwrap_or_default(),
                id,
                turn_index,
                turn_type: decode("turn_type", &turn_type, TurnType::parse)?,
                user_text,
            })
        })
        .collect::<Result<Vec<_>, SqliteError>>()?;

    Ok(Some(ScenarioDetail { scenario, turns }))
}

/// Whether `name` is taken in the organization, ignoring `exclude_id`
pub async fn name_exists(
    pool: &SqlitePool,
    org_id: &str,
    name: &str,
    exclude_id: Option<&str>,
) -> Result<bool, SqliteError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM scenarios WHERE organization_id = ? AND name = ? AND (? IS NULL OR id != ?)",
    )
    .bind(org_id)
    .bind(name)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

async fn insert_turns(
    tx: &mut Transaction<'_, Sqlite>,
    scenario_id: &str,
    turns: &[NewTurn],
) -> Result<(), SqliteError> {
    for (index, turn) in turns.iter().enumerate() {
        let turn_id = cuid2::create_id();
        sqlx::query(
            "INSERT INTO scenario_turns (id, scenario_id, turn_index, turn_type, user_text) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&turn_id)
        .bind(scenario_id)
        .bind(index as i64)
        .bind(turn.turn_type.as_str())
        .bind(&turn.user_text)
        .execute(&mut **tx)
        .await?;

        for (position, expectation) in turn.expectations.iter().enumerate() {
            sqlx::query(
                "INSERT INTO scenario_expectations (id, turn_id, position, expectation_type, args_json) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(cuid2::create_id())
            .bind(&turn_id)
            .bind(position as i64)
            .bind(expectation.type_str())
            .bind(expectation.args_json().map_err(encode_err)?)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

/// Create a scenario and its turn set atomically
pub async fn create_scenario(
    pool: &SqlitePool,
    org_id: &str,
    user_id: &str,
    new: &NewScenario,
) -> Result<ScenarioDetail, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;
    sqlx::query(&format!(
        "INSERT INTO scenarios ({SCENARIO_COLUMNS}) VALUES (?, ?, ?, ?, ?, 1, ?, ?)"
    ))
    .bind(&id)
    .bind(org_id)
    .bind(user_id)
    .bind(&new.name)
    .bind(&new.description)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    insert_turns(&mut tx, &id, &new.turns).await?;
    tx.commit().await?;

    get_scenario_detail(pool, org_id, &id)
        .await?
        .ok_or_else(|| SqliteError::Conflict(format!("scenario {} vanished after insert", id)))
}

/// Apply a partial update and bump `version`
///
/// When `turns` is present the previous turn set is deleted and the new one
/// inserted in the same transaction.
pub async fn update_scenario(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
    update: &ScenarioUpdate,
) -> Result<Option<ScenarioDetail>, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE scenarios SET
            name = COALESCE(?, name),
            description = CASE WHEN ? THEN ? ELSE description END,
            version = version + 1,
            updated_at = ?
        WHERE organization_id = ? AND id = ?
        "#,
    )
    .bind(&update.name)
    .bind(update.description.is_some())
    .bind(update.description.clone().flatten())
    .bind(now)
    .bind(org_id)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    if let Some(turns) = &update.turns {
        sqlx::query("DELETE FROM scenario_turns WHERE scenario_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_turns(&mut tx, id, turns).await?;
    }

    tx.commit().await?;
    get_scenario_detail(pool, org_id, id).await
}

pub async fn delete_scenario(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM scenarios WHERE organization_id = ? AND id = ?")
        .bind(org_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Scenarios having a turn whose `user_text` contains `needle`
pub async fn find_with_turn_text(
    pool: &SqlitePool,
    org_id: &str,
    needle: &str,
) -> Result<Vec<ResourceRef>, SqliteError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT DISTINCT s.id, s.name
        FROM scenarios s
        JOIN scenario_turns t ON t.scenario_id = s.id
        WHERE s.organization_id = ? AND t.user_text IS NOT NULL AND instr(t.user_text, ?) > 0
        ORDER BY s.name ASC
        "#,
    )
    .bind(org_id)
    .bind(needle)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name)| ResourceRef { id, name })
        .collect())
}
