use polars::prelude::*;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::EtlResult;
use crate::processor::rule_normalizer::{RuleNormalizer, required_str, round2};

pub const DATASET: &str = "flipkart";

const UNCATEGORIZED: &str = "uncategorized";
const PARSE_ERROR: &str = "error";

const TREE_WRAPPERS: [&str; 4] = ["[\"", "\"]", "['", "']"];

static SEGMENT_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*>>\s*").expect("separator pattern is valid"));

/// Outcome of reading a breadcrumb like `["Clothing >> Women's Clothing"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainCategory {
    Parsed(String),
    /// No tree at all.
    Uncategorized,
    /// A tree was present but no usable first segment came out of it.
    Error,
}

impl MainCategory {
    pub fn as_str(&self) -> &str {
        match self {
            MainCategory::Parsed(name) => name,
            MainCategory::Uncategorized => UNCATEGORIZED,
            MainCategory::Error => PARSE_ERROR,
        }
    }
}

pub fn extract_main_category(tree: Option<&str>) -> MainCategory {
    let Some(tree) = tree.filter(|t| !t.trim().is_empty()) else {
        return MainCategory::Uncategorized;
    };

    let unwrapped = TREE_WRAPPERS
        .iter()
        .fold(tree.to_string(), |acc, wrapper| acc.replace(wrapper, ""));

    let first = SEGMENT_SEPARATOR
        .split(&unwrapped)
        .next()
        .unwrap_or_default()
        .trim();

    if first.is_empty() || first.contains(['[', ']']) {
        return MainCategory::Error;
    }

    MainCategory::Parsed(first.to_lowercase())
}

/// Percentage off the retail price, 2 decimals; 0 when there is no retail price.
pub fn discount_pct(retail_price: f64, discounted_price: f64) -> f64 {
    if retail_price > 0.0 {
        round2((retail_price - discounted_price) / retail_price * 100.0)
    } else {
        0.0
    }
}

/// Competitor catalog: timestamp, main category, numeric prices and discount.
pub fn clean_flipkart(normalizer: &RuleNormalizer, mut df: DataFrame) -> EtlResult<DataFrame> {
    normalizer.coerce_timestamp_column(&mut df, DATASET, "crawl_timestamp")?;

    let categories: Vec<String> = required_str(&df, DATASET, "product_category_tree")?
        .into_iter()
        .map(|tree| extract_main_category(tree).as_str().to_string())
        .collect();
    df.with_column(Series::new("main_category".into(), categories))?;

    let retail = normalizer.coerce_price_column(&mut df, DATASET, "retail_price")?;
    let discounted = normalizer.coerce_price_column(&mut df, DATASET, "discounted_price")?;

    let discounts: Vec<f64> = retail
        .iter()
        .zip(discounted.iter())
        .map(|(retail, discounted)| discount_pct(*retail, *discounted))
        .collect();
    df.with_column(Series::new("discount_pct".into(), discounts))?;

    Ok(df)
}
