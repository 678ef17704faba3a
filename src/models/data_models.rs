//! Static catalog of the raw extracts and the warehouse tables they feed.

/// A raw extract and the columns the generic text rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDataset {
    pub file_name: &'static str,
    pub text_columns: &'static [&'static str],
}

pub const ORDERS: RawDataset = RawDataset {
    file_name: "olist_orders_dataset.csv",
    text_columns: &[],
};

pub const ORDER_ITEMS: RawDataset = RawDataset {
    file_name: "olist_order_items_dataset.csv",
    text_columns: &["order_id", "product_id", "seller_id", "shipping_limit_date"],
};

pub const PRODUCTS: RawDataset = RawDataset {
    file_name: "olist_products_dataset.csv",
    text_columns: &[],
};

pub const CATEGORY_TRANSLATION: RawDataset = RawDataset {
    file_name: "product_category_name_translation.csv",
    text_columns: &[],
};

pub const REVIEWS: RawDataset = RawDataset {
    file_name: "olist_order_reviews_dataset.csv",
    text_columns: &[],
};

pub const FLIPKART: RawDataset = RawDataset {
    file_name: "flipkart_com-ecommerce_sample.csv",
    text_columns: &[],
};

pub const CUSTOMERS: RawDataset = RawDataset {
    file_name: "olist_customers_dataset.csv",
    text_columns: &["customer_id", "customer_unique_id", "customer_city", "customer_state"],
};

pub const GEOLOCATION: RawDataset = RawDataset {
    file_name: "olist_geolocation_dataset.csv",
    text_columns: &["geolocation_city", "geolocation_state"],
};

pub const SELLERS: RawDataset = RawDataset {
    file_name: "olist_sellers_dataset.csv",
    text_columns: &["seller_id", "seller_city", "seller_state"],
};

pub const PAYMENTS: RawDataset = RawDataset {
    file_name: "olist_order_payments_dataset.csv",
    text_columns: &["order_id", "payment_type"],
};

/// Datasets that only get the generic text rule, in processing order.
pub const TEXT_ONLY_DATASETS: [RawDataset; 4] = [CUSTOMERS, GEOLOCATION, SELLERS, PAYMENTS];

pub const ORDER_TIMESTAMP_COLUMNS: [&str; 5] = [
    "order_purchase_timestamp",
    "order_approved_at",
    "order_delivered_carrier_date",
    "order_delivered_customer_date",
    "order_estimated_delivery_date",
];

pub const FLIPKART_COLUMNS: [&str; 11] = [
    "uniq_id",
    "crawl_timestamp",
    "product_name",
    "main_category",
    "pid",
    "retail_price",
    "discounted_price",
    "discount_pct",
    "brand",
    "product_rating",
    "overall_rating",
];

/// Where one cleaned file goes in the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub source_file: &'static str,
    pub table: &'static str,
    pub date_columns: &'static [&'static str],
    pub allowed_columns: Option<&'static [&'static str]>,
}

impl TableSpec {
    const fn new(source_file: &'static str, table: &'static str) -> Self {
        Self {
            source_file,
            table,
            date_columns: &[],
            allowed_columns: None,
        }
    }

    const fn with_dates(mut self, date_columns: &'static [&'static str]) -> Self {
        self.date_columns = date_columns;
        self
    }

    const fn with_allowed(mut self, allowed_columns: &'static [&'static str]) -> Self {
        self.allowed_columns = Some(allowed_columns);
        self
    }
}

/// Load order. Dimensions come first but FK checks are off during the load anyway.
pub const LOAD_PLAN: [TableSpec; 9] = [
    TableSpec::new(PRODUCTS.file_name, "dim_products"),
    TableSpec::new(SELLERS.file_name, "dim_sellers"),
    TableSpec::new(CUSTOMERS.file_name, "dim_customers"),
    TableSpec::new(GEOLOCATION.file_name, "dim_geo"),
    TableSpec::new(FLIPKART.file_name, "competitor_flipkart")
        .with_dates(&["crawl_timestamp"])
        .with_allowed(&FLIPKART_COLUMNS),
    TableSpec::new(ORDERS.file_name, "fact_orders").with_dates(&ORDER_TIMESTAMP_COLUMNS),
    TableSpec::new(ORDER_ITEMS.file_name, "fact_order_items").with_dates(&["shipping_limit_date"]),
    TableSpec::new(PAYMENTS.file_name, "fact_payments"),
    TableSpec::new(REVIEWS.file_name, "fact_reviews")
        .with_dates(&["review_creation_date", "review_answer_timestamp"]),
];

pub fn find_table(table: &str) -> Option<&'static TableSpec> {
    LOAD_PLAN.iter().find(|spec| spec.table == table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_plan_tables_are_unique() {
        let mut tables: Vec<&str> = LOAD_PLAN.iter().map(|spec| spec.table).collect();
        tables.sort();
        tables.dedup();
        assert_eq!(tables.len(), LOAD_PLAN.len());
    }

    #[test]
    fn test_only_flipkart_is_projected() {
        let projected: Vec<&str> = LOAD_PLAN
            .iter()
            .filter(|spec| spec.allowed_columns.is_some())
            .map(|spec| spec.table)
            .collect();
        assert_eq!(projected, vec!["competitor_flipkart"]);
    }

    #[test]
    fn test_find_table() {
        let orders = find_table("fact_orders").unwrap();
        assert_eq!(orders.source_file, "olist_orders_dataset.csv");
        assert_eq!(orders.date_columns.len(), 5);
        assert!(find_table("fact_unknown").is_none());
    }
}
