use sqlx::Connection;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::{EtlError, EtlResult};
use crate::loader::connection::{connect, quote_identifier};

/// Drops and recreates the target database, then replays the DDL script.
///
/// Any failure is fatal for the run: loading into a half-built schema has no
/// correctness basis.
pub struct SchemaInitializer<'a> {
    database: &'a DatabaseConfig,
    schema_path: &'a Path,
}

impl<'a> SchemaInitializer<'a> {
    pub fn new(database: &'a DatabaseConfig, schema_path: &'a Path) -> Self {
        Self {
            database,
            schema_path,
        }
    }

    /// Returns the number of DDL statements executed.
    pub async fn initialize(&self) -> EtlResult<usize> {
        info!("--- Initializing Database Schema ---");

        // Read the script first so a missing file never costs us the old database
        let script = self.read_script()?;
        let statements = split_statements(&script);

        let db_name = quote_identifier(&self.database.database);
        let mut server = connect(&self.database.server_options()).await?;
        sqlx::raw_sql(&format!("DROP DATABASE IF EXISTS {}", db_name))
            .execute(&mut server)
            .await?;
        sqlx::raw_sql(&format!("CREATE DATABASE {}", db_name))
            .execute(&mut server)
            .await?;
        server.close().await?;

        let mut conn = connect(&self.database.database_options()).await?;
        for (index, statement) in statements.iter().enumerate() {
            sqlx::raw_sql(statement)
                .execute(&mut conn)
                .await
                .map_err(|source| EtlError::SchemaStatement {
                    index: index + 1,
                    source,
                })?;
        }
        conn.close().await?;

        info!(
            "Database '{}' and {} schema statements created successfully.",
            self.database.database,
            statements.len()
        );
        Ok(statements.len())
    }

    fn read_script(&self) -> EtlResult<String> {
        if !self.schema_path.exists() {
            return Err(EtlError::SchemaNotFound(self.schema_path.to_path_buf()));
        }
        Ok(fs::read_to_string(self.schema_path)?)
    }
}

/// Split a DDL script on `;`. Whole-line `--` comments are dropped and
/// statements that end up blank are skipped.
pub fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(|chunk| {
            chunk
                .lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_skips_blank_statements() {
        let script = "CREATE TABLE a (id INT);\n\n  ;\nCREATE TABLE b (id INT);\n";
        assert_eq!(
            split_statements(script),
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
        );
    }

    #[test]
    fn test_split_drops_comment_only_chunks() {
        let script =
            "-- header\nCREATE TABLE a (\n  id INT -- inline stays\n);\n-- trailing note\n";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("CREATE TABLE a ("));
        assert!(statements[0].contains("inline stays"));
    }

    #[test]
    fn test_bundled_schema_defines_every_table() {
        let script = include_str!("../../sql/schema.sql");
        let statements = split_statements(script);
        for spec in crate::models::LOAD_PLAN {
            assert!(
                statements
                    .iter()
                    .any(|s| s.starts_with(&format!("CREATE TABLE {}", spec.table))),
                "no CREATE TABLE for {}",
                spec.table
            );
        }
    }

    #[tokio::test]
    async fn test_missing_schema_file_is_fatal() {
        let database = DatabaseConfig::default();
        let initializer = SchemaInitializer::new(&database, Path::new("does/not/exist.sql"));

        let err = initializer.initialize().await.unwrap_err();
        assert!(matches!(err, EtlError::SchemaNotFound(_)));
    }
}
