use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::info;

use crate::error::EtlResult;
use crate::models::{ORDER_ITEMS, ORDER_TIMESTAMP_COLUMNS};
use crate::processor::date_parser::days_between;
use crate::processor::rule_normalizer::{
    MISSING_TOKEN, RuleNormalizer, normalize_text, parse_number, required_str,
};

const PURCHASE: &str = "order_purchase_timestamp";
const DELIVERED: &str = "order_delivered_customer_date";
const ESTIMATED: &str = "order_estimated_delivery_date";

/// Orders: canonical timestamps plus `delivery_days` and `is_late`.
pub fn clean_orders(normalizer: &RuleNormalizer, mut df: DataFrame) -> EtlResult<DataFrame> {
    let mut parsed: HashMap<&str, Vec<Option<NaiveDateTime>>> = HashMap::new();
    for col_name in ORDER_TIMESTAMP_COLUMNS {
        let values = normalizer.coerce_timestamp_column(&mut df, "orders", col_name)?;
        parsed.insert(col_name, values);
    }

    let purchase = &parsed[PURCHASE];
    let delivered = &parsed[DELIVERED];
    let estimated = &parsed[ESTIMATED];

    let delivery_days: Vec<Option<i64>> = purchase
        .iter()
        .zip(delivered.iter())
        .map(|(purchase, delivered)| match (purchase, delivered) {
            (Some(start), Some(end)) => Some(days_between(start, end)),
            _ => None,
        })
        .collect();

    let is_late: Vec<i32> = delivered
        .iter()
        .zip(estimated.iter())
        .map(|(delivered, estimated)| i32::from(is_late(delivered.as_ref(), estimated.as_ref())))
        .collect();

    df.with_column(Series::new("delivery_days".into(), delivery_days))?;
    df.with_column(Series::new("is_late".into(), is_late))?;

    Ok(df)
}

/// Late only when both dates are known and delivery came after the estimate.
pub fn is_late(delivered: Option<&NaiveDateTime>, estimated: Option<&NaiveDateTime>) -> bool {
    matches!((delivered, estimated), (Some(delivered), Some(estimated)) if delivered > estimated)
}

/// Order items: text rule, then drop rows without a non-negative price.
pub fn clean_order_items(normalizer: &RuleNormalizer, mut df: DataFrame) -> EtlResult<DataFrame> {
    normalizer.normalize_text_columns(&mut df, ORDER_ITEMS.text_columns)?;

    let keep: BooleanChunked = required_str(&df, "order_items", "price")?
        .into_iter()
        .map(|price| parse_number(price).is_some_and(|p| p >= 0.0))
        .collect();

    let before = df.height();
    let filtered = df.filter(&keep)?;
    let dropped = before - filtered.height();
    if dropped > 0 {
        info!("Dropped {} order items with a missing or negative price", dropped);
    }

    Ok(filtered)
}

/// Products: swap the Portuguese category for its English translation.
///
/// The join key is the trimmed, lowercased category name. Untranslated
/// categories keep that normalized name; the Portuguese column is dropped and
/// `category_name` lands at the end. Without a translation table the column
/// is only renamed.
pub fn clean_products(
    mut products: DataFrame,
    translation: Option<&DataFrame>,
) -> EtlResult<DataFrame> {
    let Some(translation) = translation else {
        products.rename("product_category_name", "category_name".into())?;
        return Ok(products);
    };

    let lookup = translation_lookup(translation)?;

    let category_names: Vec<Option<String>> =
        required_str(&products, "products", "product_category_name")?
            .into_iter()
            .map(|name| {
                let key = name.map(|n| n.trim().to_lowercase())?;
                Some(lookup.get(&key).cloned().unwrap_or(key))
            })
            .collect();

    let mut merged = products.drop("product_category_name")?;
    merged.with_column(Series::new("category_name".into(), category_names))?;

    Ok(merged)
}

fn translation_lookup(translation: &DataFrame) -> EtlResult<HashMap<String, String>> {
    let keys = required_str(translation, "category_translation", "product_category_name")?;
    let english = required_str(
        translation,
        "category_translation",
        "product_category_name_english",
    )?;

    let mut lookup = HashMap::new();
    for (key, english) in keys.into_iter().zip(english.into_iter()) {
        if let (Some(key), Some(english)) = (key, english) {
            // First entry wins so duplicate keys never fan out product rows
            lookup
                .entry(key.trim().to_lowercase())
                .or_insert_with(|| english.trim().to_string());
        }
    }

    Ok(lookup)
}

/// Reviews: comment text trimmed, missing comments become "" rather than null.
pub fn clean_reviews(mut df: DataFrame) -> EtlResult<DataFrame> {
    let messages: Vec<String> = required_str(&df, "reviews", "review_comment_message")?
        .into_iter()
        .map(|message| {
            let trimmed = message.map(str::trim).unwrap_or_default();
            if trimmed == MISSING_TOKEN {
                String::new()
            } else {
                trimmed.to_string()
            }
        })
        .collect();

    df.with_column(Series::new("review_comment_message".into(), messages))?;
    Ok(df)
}

/// Customers, geolocation, sellers, payments: text rule only.
pub fn clean_text_only(
    normalizer: &RuleNormalizer,
    mut df: DataFrame,
    text_columns: &[&str],
) -> EtlResult<DataFrame> {
    normalizer.normalize_text_columns(&mut df, text_columns)?;
    Ok(df)
}

/// True when every declared text cell is null or already normalized.
pub fn text_columns_are_normalized(df: &DataFrame, text_columns: &[&str]) -> bool {
    text_columns.iter().all(|col_name| {
        let Ok(values) = df.column(col_name).and_then(|c| c.str()) else {
            return true;
        };
        values
            .into_iter()
            .all(|value| value.is_none() || normalize_text(value).as_deref() == value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SELLERS;
    use crate::processor::date_parser::parse_timestamp;

    #[test]
    fn test_orders_derived_columns() {
        let df = df!(
            "order_id" => &["o1", "o2", "o3"],
            "order_purchase_timestamp" => &[
                Some("2017-10-02 10:56:33"),
                Some("2018-07-24 20:41:37"),
                None,
            ],
            "order_approved_at" => &[Some("2017-10-02 11:07:15"), None, None],
            "order_delivered_carrier_date" => &[Some("2017-10-04 19:55:00"), None, None],
            "order_delivered_customer_date" => &[
                Some("2017-10-20 21:25:13"),
                None,
                Some("2017-10-20 21:25:13"),
            ],
            "order_estimated_delivery_date" => &[
                Some("2017-10-18 00:00:00"),
                Some("2018-08-13 00:00:00"),
                Some("2017-10-25 00:00:00"),
            ],
        )
        .unwrap();

        let cleaned = clean_orders(&RuleNormalizer, df).unwrap();

        let days = cleaned.column("delivery_days").unwrap().i64().unwrap();
        assert_eq!(days.get(0), Some(18));
        assert_eq!(days.get(1), None);
        assert_eq!(days.get(2), None);

        let late = cleaned.column("is_late").unwrap().i32().unwrap();
        assert_eq!(late.get(0), Some(1));
        assert_eq!(late.get(1), Some(0));
        assert_eq!(late.get(2), Some(0));
        assert_eq!(late.null_count(), 0);
    }

    #[test]
    fn test_is_late_truth_table() {
        let early = parse_timestamp("2017-10-01 00:00:00").unwrap();
        let later = parse_timestamp("2017-10-05 00:00:00").unwrap();

        assert!(is_late(Some(&later), Some(&early)));
        assert!(!is_late(Some(&early), Some(&later)));
        assert!(!is_late(Some(&early), Some(&early)));
        assert!(!is_late(None, Some(&early)));
        assert!(!is_late(Some(&later), None));
        assert!(!is_late(None, None));
    }

    #[test]
    fn test_order_items_drop_negative_prices() {
        let df = df!(
            "order_id" => &[" A1 ", "a2", "a3", "a4"],
            "product_id" => &["P1", "p2", "p3", "p4"],
            "seller_id" => &["S1", "s2", "s3", "s4"],
            "price" => &[Some("58.90"), Some("-1.00"), None, Some("0")],
        )
        .unwrap();

        let cleaned = clean_order_items(&RuleNormalizer, df).unwrap();

        assert_eq!(cleaned.height(), 2);
        let ids = cleaned.column("order_id").unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("a1"));
        assert_eq!(ids.get(1), Some("a4"));
    }

    #[test]
    fn test_products_translation_with_fallback() {
        let products = df!(
            "product_id" => &["p1", "p2", "p3"],
            "product_category_name" => &[Some(" Beleza_Saude "), Some("pc_gamer"), None],
            "product_weight_g" => &["225", "1000", "154"],
        )
        .unwrap();
        let translation = df!(
            "product_category_name" => &["beleza_saude", "beleza_saude"],
            "product_category_name_english" => &["health_beauty", "duplicate"],
        )
        .unwrap();

        let cleaned = clean_products(products, Some(&translation)).unwrap();

        let names: Vec<String> = cleaned.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["product_id", "product_weight_g", "category_name"]);
        assert_eq!(cleaned.height(), 3);

        let category = cleaned.column("category_name").unwrap().str().unwrap();
        assert_eq!(category.get(0), Some("health_beauty"));
        assert_eq!(category.get(1), Some("pc_gamer"));
        assert_eq!(category.get(2), None);
    }

    #[test]
    fn test_products_without_translation_only_rename() {
        let products = df!(
            "product_id" => &["p1"],
            "product_category_name" => &["Perfumaria"],
        )
        .unwrap();

        let cleaned = clean_products(products, None).unwrap();

        let category = cleaned.column("category_name").unwrap().str().unwrap();
        assert_eq!(category.get(0), Some("Perfumaria"));
        assert!(cleaned.column("product_category_name").is_err());
    }

    #[test]
    fn test_reviews_comment_never_null() {
        let df = df!(
            "review_id" => &["r1", "r2", "r3"],
            "review_comment_message" => &[Some("  Recebi bem antes do prazo  "), None, Some("nan")],
        )
        .unwrap();

        let cleaned = clean_reviews(df).unwrap();

        let messages = cleaned.column("review_comment_message").unwrap().str().unwrap();
        assert_eq!(messages.get(0), Some("Recebi bem antes do prazo"));
        assert_eq!(messages.get(1), Some(""));
        assert_eq!(messages.get(2), Some(""));
        assert_eq!(messages.null_count(), 0);
    }

    #[test]
    fn test_text_only_invariant() {
        let df = df!(
            "seller_id" => &[Some("ABC "), None],
            "seller_zip_code_prefix" => &[Some("13023"), Some("4195")],
            "seller_city" => &[Some(" Campinas"), Some("NaN")],
            "seller_state" => &[Some("SP"), Some("")],
        )
        .unwrap();
        assert!(!text_columns_are_normalized(&df, SELLERS.text_columns));

        let cleaned = clean_text_only(&RuleNormalizer, df, SELLERS.text_columns).unwrap();
        assert!(text_columns_are_normalized(&cleaned, SELLERS.text_columns));
        assert_eq!(cleaned.height(), 2);
    }
}
