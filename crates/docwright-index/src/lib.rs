//! IndexSource (C3): streams [`IndexRow`]s from the symbol index. The
//! index is read-only to this core (§5); a connection failure is fatal
//! (`ConfigError`), but a single malformed row is skipped with a logged
//! reason rather than aborting the run.

use docwright_patch_model::{IndexRow, SymbolType};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to connect to index at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to query table {table}: {source}")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },
}

#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub url: String,
    pub table: String,
    pub status_filter: Option<String>,
    pub max_rows: Option<i64>,
}

pub struct IndexSource {
    pool: SqlitePool,
}

impl IndexSource {
    pub async fn connect(url: &str) -> Result<Self, IndexError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|source| IndexError::Connect {
                url: url.to_string(),
                source,
            })?;
        Ok(Self { pool })
    }

    /// Streams rows matching `query`, skipping any row whose
    /// `symbol_type` can't be parsed (logged, never fatal: IoError
    /// recovery policy, §7).
    pub async fn stream(&self, query: &IndexQuery) -> Result<Vec<IndexRow>, IndexError> {
        // `table` can't be bound as a parameter; it comes from the
        // operator's own config file, not row data, so it's trusted
        // the way a connection string is.
        let mut sql = format!(
            "SELECT id, filepath, lineno, symbol_type, name, description, unique_key_hash, status FROM {}",
            query.table
        );
        if query.status_filter.is_some() {
            sql.push_str(" WHERE status = ?");
        }
        if query.max_rows.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut bound = sqlx::query(&sql);
        if let Some(status) = &query.status_filter {
            bound = bound.bind(status);
        }
        if let Some(max_rows) = query.max_rows {
            bound = bound.bind(max_rows);
        }

        let rows = bound
            .fetch_all(&self.pool)
            .await
            .map_err(|source| IndexError::Query {
                table: query.table.clone(),
                source,
            })?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let symbol_type_raw: String = row.get("symbol_type");
            let Some(symbol_type) = parse_symbol_type(&symbol_type_raw) else {
                tracing::warn!(id, symbol_type_raw, "skipping row with unknown symbol_type");
                continue;
            };
            out.push(IndexRow {
                id,
                filepath: row.get("filepath"),
                lineno: row.get::<i64, _>("lineno").max(0) as u32,
                symbol_type,
                name: row.get("name"),
                description: row.get("description"),
                unique_key_hash: row.get("unique_key_hash"),
                status: row.get("status"),
            });
        }
        Ok(out)
    }
}

fn parse_symbol_type(raw: &str) -> Option<SymbolType> {
    match raw {
        "module" => Some(SymbolType::Module),
        "class" => Some(SymbolType::Class),
        "function" => Some(SymbolType::Function),
        "unknown" => Some(SymbolType::Unknown),
        _ => None,
    }
}
