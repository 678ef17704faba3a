use chrono::NaiveDateTime;
use polars::prelude::*;
use std::str::FromStr;
use tracing::debug;

use crate::error::{EtlError, EtlResult};
use crate::processor::date_parser::{format_timestamp, parse_optional_timestamp};

/// Textual form a missing value takes after a lossy string round-trip.
pub const MISSING_TOKEN: &str = "nan";

/// Column-level rules shared by every dataset cleaner.
pub struct RuleNormalizer;

impl RuleNormalizer {
    /// Trim + lowercase each declared text column. Blank cells and the missing
    /// token become real nulls. Declared columns absent from the frame are skipped.
    pub fn normalize_text_columns(&self, df: &mut DataFrame, columns: &[&str]) -> EtlResult<()> {
        for col_name in columns {
            if df.column(col_name).is_err() {
                debug!("Text column '{}' not present, skipping", col_name);
                continue;
            }
            self.normalize_string_column(df, col_name)?;
        }

        Ok(())
    }

    fn normalize_string_column(&self, df: &mut DataFrame, col_name: &str) -> EtlResult<()> {
        let normalized: Vec<Option<String>> = df
            .column(col_name)?
            .str()?
            .into_iter()
            .map(normalize_text)
            .collect();

        df.with_column(Series::new(col_name.into(), normalized))?;
        Ok(())
    }

    /// Replace a price column with a non-null `f64` column; bad values become 0.
    pub fn coerce_price_column(
        &self,
        df: &mut DataFrame,
        dataset: &str,
        col_name: &str,
    ) -> EtlResult<Vec<f64>> {
        let prices: Vec<f64> = required_str(df, dataset, col_name)?
            .into_iter()
            .map(|value| parse_number(value).unwrap_or(0.0))
            .collect();

        df.with_column(Series::new(col_name.into(), prices.clone()))?;
        Ok(prices)
    }

    /// Re-emit a timestamp column in the canonical format, unparseable values as null.
    /// Returns the parsed values for derived columns.
    pub fn coerce_timestamp_column(
        &self,
        df: &mut DataFrame,
        dataset: &str,
        col_name: &str,
    ) -> EtlResult<Vec<Option<NaiveDateTime>>> {
        let parsed: Vec<Option<NaiveDateTime>> = required_str(df, dataset, col_name)?
            .into_iter()
            .map(parse_optional_timestamp)
            .collect();

        let formatted: Vec<Option<String>> = parsed
            .iter()
            .map(|value| value.as_ref().map(format_timestamp))
            .collect();

        df.with_column(Series::new(col_name.into(), formatted))?;
        Ok(parsed)
    }
}

pub fn normalize_text(value: Option<&str>) -> Option<String> {
    let cleaned = value?.trim().to_lowercase();
    if cleaned.is_empty() || cleaned == MISSING_TOKEN {
        None
    } else {
        Some(cleaned)
    }
}

/// Finite number or nothing; "nan"/"inf" are not prices.
pub fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|s| f64::from_str(s.trim()).ok())
        .filter(|number| number.is_finite())
}

/// Two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// String view of a column a rule cannot work without.
pub fn required_str<'a>(
    df: &'a DataFrame,
    dataset: &str,
    col_name: &str,
) -> EtlResult<&'a StringChunked> {
    let column = df
        .column(col_name)
        .map_err(|_| EtlError::missing_column(dataset, col_name))?;
    Ok(column.str()?)
}
