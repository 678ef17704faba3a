use sqlx::mysql::MySqlConnection;
use tracing::{info, warn};

use crate::error::EtlResult;
use crate::loader::connection::quote_identifier;

/// One foreign key column and how many child rows point at nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanReport {
    pub key: ForeignKey,
    pub orphan_rows: i64,
}

impl ForeignKey {
    pub fn orphan_count_sql(&self) -> String {
        let column = quote_identifier(&self.column);
        let referenced = quote_identifier(&self.referenced_column);
        format!(
            "SELECT COUNT(*) FROM {} c LEFT JOIN {} p ON c.{} = p.{} \
             WHERE c.{} IS NOT NULL AND p.{} IS NULL",
            quote_identifier(&self.table),
            quote_identifier(&self.referenced_table),
            column,
            referenced,
            column,
            referenced
        )
    }
}

impl std::fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.table, self.column, self.referenced_table, self.referenced_column
        )
    }
}

/// Count orphan rows for every foreign key of `database`.
///
/// Composite keys are checked column by column.
pub async fn find_orphans(
    conn: &mut MySqlConnection,
    database: &str,
) -> EtlResult<Vec<OrphanReport>> {
    let keys: Vec<(String, String, String, String)> = sqlx::query_as(
        "SELECT CAST(TABLE_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR), \
                CAST(REFERENCED_TABLE_NAME AS CHAR), CAST(REFERENCED_COLUMN_NAME AS CHAR) \
         FROM information_schema.KEY_COLUMN_USAGE \
         WHERE TABLE_SCHEMA = ? AND REFERENCED_TABLE_NAME IS NOT NULL \
         ORDER BY TABLE_NAME, CONSTRAINT_NAME, ORDINAL_POSITION",
    )
    .bind(database)
    .fetch_all(&mut *conn)
    .await?;

    info!("Verifying {} foreign key columns", keys.len());

    let mut orphans = Vec::new();
    for (table, column, referenced_table, referenced_column) in keys {
        let key = ForeignKey {
            table,
            column,
            referenced_table,
            referenced_column,
        };

        let (orphan_rows,): (i64,) = sqlx::query_as(&key.orphan_count_sql())
            .fetch_one(&mut *conn)
            .await?;

        if orphan_rows > 0 {
            warn!("⚠️ {} orphan rows on {}", orphan_rows, key);
            orphans.push(OrphanReport { key, orphan_rows });
        }
    }

    Ok(orphans)
}
