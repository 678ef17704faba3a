pub mod date_parser;
pub mod flipkart_rules;
pub mod olist_rules;
pub mod rule_normalizer;

pub use rule_normalizer::*;
