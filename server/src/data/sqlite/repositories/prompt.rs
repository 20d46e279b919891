//! Prompt repository for SQLite operations
//!
//! Every query is scoped by `organization_id`.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::decode;
use crate::data::sqlite::SqliteError;
use crate::data::types::{
    NewPrompt, PromptFilter, PromptRow, PromptStatus, PromptUpdate, ResourceRef,
};

const PROMPT_COLUMNS: &str =
    "id, organization_id, user_id, name, description, content, status, created_at, updated_at";

type PromptTuple = (
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    i64,
    i64,
);

fn to_row(
    (id, organization_id, user_id, name, description, content, status, created_at, updated_at): PromptTuple,
) -> Result<PromptRow, SqliteError> {
    Ok(PromptRow {
        id,
        organization_id,
        user_id,
        name,
        description,
        content,
        status: decode("status", &status, PromptStatus::parse)?,
        created_at,
        updated_at,
    })
}

/// List prompts, most recently updated first
pub async fn list_prompts(
    pool: &SqlitePool,
    org_id: &str,
    filter: &PromptFilter,
) -> Result<Vec<PromptRow>, SqliteError> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {PROMPT_COLUMNS} FROM prompts WHERE organization_id = "));
    qb.push_bind(org_id);

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND lower(name) LIKE ")
            .push_bind(format!("%{}%", escape_like(&search.to_lowercase())))
            .push(" ESCAPE '\\'");
    }
    qb.push(" ORDER BY updated_at DESC, id ASC");

    let rows = qb.build_query_as::<PromptTuple>().fetch_all(pool).await?;
    rows.into_iter().map(to_row).collect()
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub async fn get_prompt(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
) -> Result<Option<PromptRow>, SqliteError> {
    let row = sqlx::query_as::<_, PromptTuple>(&format!(
        "SELECT {PROMPT_COLUMNS} FROM prompts WHERE organization_id = ? AND id = ?"
    ))
    .bind(org_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(to_row).transpose()
}

/// Whether `name` is taken in the organization, ignoring `exclude_id`
pub async fn name_exists(
    pool: &SqlitePool,
    org_id: &str,
    name: &str,
    exclude_id: Option<&str>,
) -> Result<bool, SqliteError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM prompts WHERE organization_id = ? AND name = ? AND (? IS NULL OR id != ?)",
    )
    .bind(org_id)
    .bind(name)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn create_prompt(
    pool: &SqlitePool,
    org_id: &str,
    user_id: &str,
    new: &NewPrompt,
) -> Result<PromptRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(&format!(
        "INSERT INTO prompts ({PROMPT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&id)
    .bind(org_id)
    .bind(user_id)
    .bind(&new.name)
    .bind(&new.description)
    .bind(&new.content)
    .bind(new.status.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(PromptRow {
        id,
        organization_id: org_id.to_string(),
        user_id: user_id.to_string(),
        name: new.name.clone(),
        description: new.description.clone(),
        content: new.content.clone(),
        status: new.status,
        created_at: now,
        updated_at: now,
    })
}

/// Apply a partial update, returning the new row (`None` if absent)
pub async fn update_prompt(
    pool: &SqlitePool,
    org_id: &str,
    id: &str,
    update: &PromptUpdate,
) -> Result<Option<PromptRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE prompts SET updated_at = ");
    qb.push_bind(now);
    if let Some(name) = &update.name {
        qb.push(", name = ").push_bind(name);
    }
    if let Some(description) = &update.description {
        qb.push(", description = ").push_bind(description);
    }
    if let Some(content) = &update.content {
        qb.push(", content = ").push_bind(content);
    }
    if let Some(status) = update.status {
        qb.push(", status = ").push_bind(status.as_str());
    }
    qb.push(" WHERE organization_id = ")
        .push_bind(org_id)
        .push(" AND id = ")
        .push_bind(id);

    let result = qb.build().execute(pool).await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_prompt(pool, org_id, id).await
}

pub async fn delete_prompt(pool: &SqlitePool, org_id: &str, id: &str) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM prompts WHERE organization_id = ? AND id = ?")
        .bind(org_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Prompts whose content contains `needle` as a literal substring
pub async fn find_containing(
    pool: &SqlitePool,
    org_id: &str,
    needle: &str,
) -> Result<Vec<ResourceRef>, SqliteError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT id, name FROM prompts WHERE organization_id = ? AND instr(content, ?) > 0 ORDER BY name ASC",
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

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        for org in ["o1", "o2"] {
            sqlx::query(
                "INSERT INTO organizations (id, name, slug, created_at, updated_at) VALUES (?, ?, ?, 0, 0)",
            )
            .bind(org)
            .bind(format!("Org {}", org))
            .bind(org)
            .execute(&pool)
            .await
            .unwrap();
        }
        pool
    }

    fn new_prompt(name: &str, content: &str, status: PromptStatus) -> NewPrompt {
        NewPrompt {
            name: name.to_string(),
            description: None,
            content: content.to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_scoped() {
        let pool = setup_test_pool().await;
        let p = create_prompt(&pool, "o1", "u1", &new_prompt("Greeter", "Hi", PromptStatus::Draft))
            .await
            .unwrap();

        assert!(get_prompt(&pool, "o1", &p.id).await.unwrap().is_some());
        assert!(get_prompt(&pool, "o2", &p.id).await.unwrap().is_none());
        assert!(!delete_prompt(&pool, "o2", &p.id).await.unwrap());
        assert!(
            update_prompt(&pool, "o2", &p.id, &PromptUpdate::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_filters() {
        let pool = setup_test_pool().await;
        create_prompt(&pool, "o1", "u1", &new_prompt("Support Bot", "", PromptStatus::Published))
            .await
            .unwrap();
        create_prompt(&pool, "o1", "u1", &new_prompt("Sales_Bot", "", PromptStatus::Draft))
            .await
            .unwrap();
        create_prompt(&pool, "o2", "u1", &new_prompt("Support Bot", "", PromptStatus::Draft))
            .await
            .unwrap();

        let all = list_prompts(&pool, "o1", &PromptFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let published = PromptFilter {
            status: Some(PromptStatus::Published),
            search: None,
        };
        assert_eq!(list_prompts(&pool, "o1", &published).await.unwrap().len(), 1);

        let search = PromptFilter {
            status: None,
            search: Some("SUPPORT".to_string()),
        };
        let found = list_prompts(&pool, "o1", &search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Support Bot");

        // `_` is matched literally, not as a wildcard
        let underscore = PromptFilter {
            status: None,
            search: Some("s_b".to_string()),
        };
        assert_eq!(list_prompts(&pool, "o1", &underscore).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_name_exists_excludes_self() {
        let pool = setup_test_pool().await;
        let p = create_prompt(&pool, "o1", "u1", &new_prompt("A", "", PromptStatus::Draft))
            .await
            .unwrap();

        assert!(name_exists(&pool, "o1", "A", None).await.unwrap());
        assert!(!name_exists(&pool, "o1", "A", Some(&p.id)).await.unwrap());
        assert!(!name_exists(&pool, "o2", "A", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_partial_update() {
        let pool = setup_test_pool().await;
        let p = create_prompt(&pool, "o1", "u1", &new_prompt("A", "body", PromptStatus::Draft))
            .await
            .unwrap();

        let updated = update_prompt(
            &pool,
            "o1",
            &p.id,
            &PromptUpdate {
                description: Some(Some("desc".to_string())),
                status: Some(PromptStatus::Archived),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.name, "A");
        assert_eq!(updated.content, "body");
        assert_eq!(updated.description.as_deref(), Some("desc"));
        assert_eq!(updated.status, PromptStatus::Archived);
    }

    #[tokio::test]
    async fn test_find_containing() {
        let pool = setup_test_pool().await;
        create_prompt(&pool, "o1", "u1", &new_prompt("A", "Hello {{name}}", PromptStatus::Draft))
            .await
            .unwrap();
        create_prompt(&pool, "o1", "u1", &new_prompt("B", "Hello {{names}}", PromptStatus::Draft))
            .await
            .unwrap();
        create_prompt(&pool, "o2", "u1", &new_prompt("C", "{{name}}", PromptStatus::Draft))
            .await
            .unwrap();

        let refs = find_containing(&pool, "o1", "{{name}}").await.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "A");
    }
}
