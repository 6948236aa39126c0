use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

use super::{ContainerStore, DUPLICATE_ID_MESSAGE};
use crate::db::DatabasePool;
use crate::error::{AppError, AppResult};
use crate::models::{Container, ContainerFilter, SYSTEM_USER};

const COLUMNS: &str = "id, status, location, contents, assigned_to, date_dropped, date_dumped, weight, last_updated, updated_by";

/// Stores containers in the `containers` table. Every call is a single
/// statement; id uniqueness comes from the primary key.
pub struct DatabaseContainerStore {
    db: DatabasePool,
}

impl DatabaseContainerStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    fn insert_sql(&self) -> String {
        let values = (1..=10)
            .map(|n| self.placeholder(n))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO containers ({}) VALUES ({}) RETURNING {}",
            COLUMNS, values, COLUMNS
        )
    }

    // Binds in the same order as insert_sql, id first.
    fn update_sql(&self) -> String {
        let assignments = [
            "status",
            "location",
            "contents",
            "assigned_to",
            "date_dropped",
            "date_dumped",
            "weight",
            "last_updated",
            "updated_by",
        ]
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = {}", column, self.placeholder(i + 2)))
        .collect::<Vec<_>>()
        .join(", ");
        format!(
            "UPDATE containers SET {} WHERE id = {} RETURNING {}",
            assignments,
            self.placeholder(1),
            COLUMNS
        )
    }

    fn placeholder(&self, n: usize) -> String {
        match &self.db {
            DatabasePool::Postgres(_) => format!("${}", n),
            DatabasePool::Sqlite(_) => format!("?{}", n),
        }
    }

    /// Builds the filtered listing query and the parameters to bind, in order.
    ///
    /// SQLite's `LOWER` only folds ASCII, so on SQLite the text filters are
    /// left out of the SQL and applied with `ContainerFilter::matches` instead.
    fn search_sql(&self, filter: &ContainerFilter) -> (String, Vec<String>) {
        let text_in_sql = matches!(self.db, DatabasePool::Postgres(_));
        let mut query = format!("SELECT {} FROM containers WHERE 1=1", COLUMNS);
        let mut params: Vec<String> = Vec::new();

        if let Some(q) = filter.query().filter(|_| text_in_sql) {
            params.push(like_pattern(q));
            let p = self.placeholder(params.len());
            query.push_str(&format!(
                " AND (LOWER(id) LIKE {p} ESCAPE '\\' OR LOWER(contents) LIKE {p} ESCAPE '\\' OR LOWER(location) LIKE {p} ESCAPE '\\')"
            ));
        }

        if let Some(status) = filter.status() {
            params.push(status.to_string());
            query.push_str(&format!(" AND status = {}", self.placeholder(params.len())));
        }

        if let Some(location) = filter.location().filter(|_| text_in_sql) {
            params.push(like_pattern(location));
            query.push_str(&format!(
                " AND LOWER(location) LIKE {} ESCAPE '\\'",
                self.placeholder(params.len())
            ));
        }

        query.push_str(" ORDER BY last_updated DESC");
        (query, params)
    }
}

/// Case-insensitive substring pattern with LIKE wildcards in `term` escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn map_insert_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::ValidationError(DUPLICATE_ID_MESSAGE.to_string());
        }
    }
    AppError::DatabaseError(err)
}

fn container_from_pg_row(row: &PgRow) -> AppResult<Container> {
    Ok(Container {
        id: row.try_get("id")?,
        status: row.try_get("status")?,
        location: row.try_get("location")?,
        contents: row.try_get("contents")?,
        assigned_to: row.try_get("assigned_to")?,
        date_dropped: row.try_get("date_dropped")?,
        date_dumped: row.try_get("date_dumped")?,
        weight: row.try_get("weight")?,
        last_updated: row.try_get("last_updated")?,
        updated_by: row
            .try_get::<Option<String>, _>("updated_by")?
            .unwrap_or_else(|| SYSTEM_USER.to_string()),
    })
}

fn container_from_sqlite_row(row: &SqliteRow) -> AppResult<Container> {
    let weight = row
        .try_get::<Option<String>, _>("weight")?
        .map(|raw| {
            Decimal::from_str(&raw)
                .map_err(|e| AppError::StorageError(format!("Invalid weight '{}': {}", raw, e)))
        })
        .transpose()?;

    Ok(Container {
        id: row.try_get("id")?,
        status: row.try_get("status")?,
        location: row.try_get("location")?,
        contents: row.try_get("contents")?,
        assigned_to: row.try_get("assigned_to")?,
        date_dropped: row.try_get("date_dropped")?,
        date_dumped: row.try_get("date_dumped")?,
        weight,
        last_updated: row.try_get("last_updated")?,
        updated_by: row
            .try_get::<Option<String>, _>("updated_by")?
            .unwrap_or_else(|| SYSTEM_USER.to_string()),
    })
}

#[async_trait]
impl ContainerStore for DatabaseContainerStore {
    async fn list(&self, filter: &ContainerFilter) -> AppResult<Vec<Container>> {
        let (query, params) = self.search_sql(filter);

        match &self.db {
            DatabasePool::Postgres(pool) => {
                let mut query_builder = sqlx::query(&query);
                for param in params {
                    query_builder = query_builder.bind(param);
                }
                let rows = query_builder.fetch_all(pool).await?;
                rows.iter().map(container_from_pg_row).collect()
            }
            DatabasePool::Sqlite(pool) => {
                let mut query_builder = sqlx::query(&query);
                for param in params {
                    query_builder = query_builder.bind(param);
                }
                let rows = query_builder.fetch_all(pool).await?;
                let mut containers = Vec::with_capacity(rows.len());
                for row in &rows {
                    let container = container_from_sqlite_row(row)?;
                    if filter.matches(&container) {
                        containers.push(container);
                    }
                }
                Ok(containers)
            }
        }
    }

    async fn get(&self, id: &str) -> AppResult<Option<Container>> {
        let query = format!(
            "SELECT {} FROM containers WHERE id = {}",
            COLUMNS,
            self.placeholder(1)
        );

        match &self.db {
            DatabasePool::Postgres(pool) => {
                let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(container_from_pg_row).transpose()
            }
            DatabasePool::Sqlite(pool) => {
                let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(container_from_sqlite_row).transpose()
            }
        }
    }

    async fn insert(&self, container: Container) -> AppResult<Container> {
        let query = self.insert_sql();

        match &self.db {
            DatabasePool::Postgres(pool) => {
                let row = sqlx::query(&query)
                    .bind(&container.id)
                    .bind(&container.status)
                    .bind(&container.location)
                    .bind(&container.contents)
                    .bind(&container.assigned_to)
                    .bind(container.date_dropped)
                    .bind(container.date_dumped)
                    .bind(container.weight)
                    .bind(container.last_updated)
                    .bind(&container.updated_by)
                    .fetch_one(pool)
                    .await
                    .map_err(map_insert_error)?;
                container_from_pg_row(&row)
            }
            DatabasePool::Sqlite(pool) => {
                let row = sqlx::query(&query)
                    .bind(&container.id)
                    .bind(&container.status)
                    .bind(&container.location)
                    .bind(&container.contents)
                    .bind(&container.assigned_to)
                    .bind(container.date_dropped)
                    .bind(container.date_dumped)
                    .bind(container.weight.map(|w| w.to_string()))
                    .bind(container.last_updated)
                    .bind(&container.updated_by)
                    .fetch_one(pool)
                    .await
                    .map_err(map_insert_error)?;
                container_from_sqlite_row(&row)
            }
        }
    }

    async fn update(&self, container: Container) -> AppResult<Option<Container>> {
        let query = self.update_sql();

        match &self.db {
            DatabasePool::Postgres(pool) => {
                let row = sqlx::query(&query)
                    .bind(&container.id)
                    .bind(&container.status)
                    .bind(&container.location)
                    .bind(&container.contents)
                    .bind(&container.assigned_to)
                    .bind(container.date_dropped)
                    .bind(container.date_dumped)
                    .bind(container.weight)
                    .bind(container.last_updated)
                    .bind(&container.updated_by)
                    .fetch_optional(pool)
                    .await?;
                row.as_ref().map(container_from_pg_row).transpose()
            }
            DatabasePool::Sqlite(pool) => {
                let row = sqlx::query(&query)
                    .bind(&container.id)
                    .bind(&container.status)
                    .bind(&container.location)
                    .bind(&container.contents)
                    .bind(&container.assigned_to)
                    .bind(container.date_dropped)
                    .bind(container.date_dumped)
                    .bind(container.weight.map(|w| w.to_string()))
                    .bind(container.last_updated)
                    .bind(&container.updated_by)
                    .fetch_optional(pool)
                    .await?;
                row.as_ref().map(container_from_sqlite_row).transpose()
            }
        }
    }

    async fn delete(&self, id: &str) -> AppResult<Option<Container>> {
        let query = format!(
            "DELETE FROM containers WHERE id = {} RETURNING {}",
            self.placeholder(1),
            COLUMNS
        );

        match &self.db {
            DatabasePool::Postgres(pool) => {
                let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(container_from_pg_row).transpose()
            }
            DatabasePool::Sqlite(pool) => {
                let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(container_from_sqlite_row).transpose()
            }
        }
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = match &self.db {
            DatabasePool::Postgres(pool) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM containers")
                    .fetch_one(pool)
                    .await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM containers")
                    .fetch_one(pool)
                    .await?
            }
        };
        Ok(count)
    }
}
