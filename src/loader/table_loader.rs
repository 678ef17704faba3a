use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use sqlx::mysql::{MySql, MySqlConnection};
use sqlx::QueryBuilder;
use tracing::debug;

use crate::error::EtlResult;
use crate::loader::connection::quote_identifier;
use crate::models::TableSpec;
use crate::processor::date_parser::parse_timestamp;

// MySQL caps a prepared statement at 65535 placeholders
const MAX_BIND_PARAMS: usize = 65_535;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Timestamp(NaiveDateTime),
}

/// Rows of one cleaned file, shaped for its destination table.
#[derive(Debug, Clone)]
pub struct PreparedTable {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl PreparedTable {
    pub fn column_values(&self, column: &str) -> Option<Vec<&SqlValue>> {
        let index = self.columns.iter().position(|c| c == column)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    fn insert_prefix(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_identifier(c)).collect();
        format!(
            "INSERT INTO {} ({}) ",
            quote_identifier(&self.table),
            columns.join(", ")
        )
    }
}

/// Project onto the allow-list, turn nulls into SQL NULL and coerce date columns.
///
/// Allow-listed columns missing from the file are left out rather than padded.
/// Unparseable dates become NULL.
pub fn prepare_table(spec: &TableSpec, df: &DataFrame) -> EtlResult<PreparedTable> {
    let source_columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let columns: Vec<String> = match spec.allowed_columns {
        Some(allowed) => allowed
            .iter()
            .filter(|name| source_columns.iter().any(|source| source.as_str() == **name))
            .map(|name| name.to_string())
            .collect(),
        None => source_columns,
    };

    let mut rows: Vec<Vec<SqlValue>> = (0..df.height())
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();

    for col_name in &columns {
        let is_date = spec.date_columns.contains(&col_name.as_str());
        let values = df.column(col_name)?.str()?;
        for (row, value) in rows.iter_mut().zip(values.into_iter()) {
            row.push(to_sql_value(value, is_date));
        }
    }

    debug!(
        "Prepared {} rows x {} columns for {}",
        rows.len(),
        columns.len(),
        spec.table
    );

    Ok(PreparedTable {
        table: spec.table.to_string(),
        columns,
        rows,
    })
}

fn to_sql_value(value: Option<&str>, is_date: bool) -> SqlValue {
    match value {
        None => SqlValue::Null,
        Some(raw) if is_date => parse_timestamp(raw)
            .map(SqlValue::Timestamp)
            .unwrap_or(SqlValue::Null),
        Some(raw) => SqlValue::Text(raw.to_string()),
    }
}

/// Rows per INSERT: the configured size, shrunk if the placeholder cap demands it.
pub fn effective_batch_size(batch_size: usize, column_count: usize) -> usize {
    let cap = MAX_BIND_PARAMS / column_count.max(1);
    batch_size.clamp(1, cap.max(1))
}

/// Append all rows with multi-row INSERTs. Returns rows affected.
pub async fn insert_rows(
    conn: &mut MySqlConnection,
    prepared: &PreparedTable,
    batch_size: usize,
) -> EtlResult<u64> {
    if prepared.columns.is_empty() || prepared.rows.is_empty() {
        return Ok(0);
    }

    let batch_size = effective_batch_size(batch_size, prepared.columns.len());
    let prefix = prepared.insert_prefix();
    let mut inserted = 0;

    for (batch_index, chunk) in prepared.rows.chunks(batch_size).enumerate() {
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(prefix.as_str());
        builder.push_values(chunk, |mut row_builder, row| {
            for value in row {
                match value {
                    SqlValue::Null => {
                        row_builder.push_bind(None::<String>);
                    }
                    SqlValue::Text(text) => {
                        row_builder.push_bind(text.clone());
                    }
                    SqlValue::Timestamp(ts) => {
                        row_builder.push_bind(*ts);
                    }
                }
            }
        });

        let result = builder.build().execute(&mut *conn).await?;
        inserted += result.rows_affected();
        debug!(
            "{}: batch {} inserted {} rows",
            prepared.table,
            batch_index + 1,
            result.rows_affected()
        );
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::find_table;
    use polars::prelude::*;

    #[test]
    fn test_flipkart_projection() {
        let spec = find_table("competitor_flipkart").unwrap();
        // No "brand" column in this file, plus two columns the table doesn't have
        let df = df!(
            "uniq_id" => &["u1"],
            "product_url" => &["http://x"],
            "crawl_timestamp" => &["2016-03-25 22:59:23"],
            "product_name" => &["shirt"],
            "retail_price" => &["100.0"],
            "description" => &["long text"],
        )
        .unwrap();

        let prepared = prepare_table(spec, &df).unwrap();

        assert_eq!(
            prepared.columns,
            vec!["uniq_id", "crawl_timestamp", "product_name", "retail_price"]
        );
        assert_eq!(prepared.rows[0].len(), 4);
        assert_eq!(
            prepared.insert_prefix(),
            "INSERT INTO `competitor_flipkart` \
             (`uniq_id`, `crawl_timestamp`, `product_name`, `retail_price`) "
        );
    }

    #[test]
    fn test_dates_and_nulls() {
        let spec = find_table("fact_reviews").unwrap();
        let df = df!(
            "review_id" => &[Some("r1"), Some("r2")],
            "review_comment_message" => &[Some("ok"), None],
            "review_creation_date" => &[Some("2018-01-18 00:00:00"), Some("someday")],
        )
        .unwrap();

        let prepared = prepare_table(spec, &df).unwrap();

        let created = prepared.column_values("review_creation_date").unwrap();
        let expected = parse_timestamp("2018-01-18 00:00:00").unwrap();
        assert_eq!(created[0], &SqlValue::Timestamp(expected));
        assert_eq!(created[1], &SqlValue::Null);

        let messages = prepared.column_values("review_comment_message").unwrap();
        assert_eq!(messages[0], &SqlValue::Text("ok".to_string()));
        assert_eq!(messages[1], &SqlValue::Null);
    }

    #[test]
    fn test_unprojected_table_keeps_all_columns() {
        let spec = find_table("dim_sellers").unwrap();
        let df = df!(
            "seller_id" => &["s1"],
            "seller_city" => &["campinas"],
            "extra" => &["x"],
        )
        .unwrap();

        let prepared = prepare_table(spec, &df).unwrap();
        assert_eq!(prepared.columns, vec!["seller_id", "seller_city", "extra"]);
    }

    #[test]
    fn test_effective_batch_size() {
        assert_eq!(effective_batch_size(1000, 11), 1000);
        assert_eq!(effective_batch_size(100_000, 10), 6553);
        assert_eq!(effective_batch_size(0, 5), 1);
    }
}
