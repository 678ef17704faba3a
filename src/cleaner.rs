use polars::prelude::DataFrame;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::PathsConfig;
use crate::error::{EtlError, EtlResult};
use crate::models::{
    CATEGORY_TRANSLATION, FLIPKART, ORDER_ITEMS, ORDERS, PRODUCTS, REVIEWS, RawDataset,
    TEXT_ONLY_DATASETS,
};
use crate::processor::RuleNormalizer;
use crate::processor::flipkart_rules::clean_flipkart;
use crate::processor::olist_rules::{
    clean_order_items, clean_orders, clean_products, clean_reviews, clean_text_only,
};
use crate::storage::CsvStorage;

#[derive(Debug)]
pub enum FileOutcome {
    Saved { path: PathBuf, rows: usize },
    Skipped,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub files: Vec<(String, FileOutcome)>,
}

impl CleanReport {
    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Saved { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed(_)))
    }

    pub fn outcome(&self, file_name: &str) -> Option<&FileOutcome> {
        self.files
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|(_, outcome)| pred(outcome)).count()
    }
}

/// Stage one: raw extracts in, one cleaned CSV per extract out.
///
/// Every file is independent. A missing extract is skipped and a failing one
/// is logged; neither stops the rest of the batch.
pub struct EcommerceCleaner {
    storage: CsvStorage,
    normalizer: RuleNormalizer,
}

impl EcommerceCleaner {
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            storage: CsvStorage::new(&paths.raw_dir, &paths.cleaned_dir),
            normalizer: RuleNormalizer,
        }
    }

    pub fn run_all(&self) -> EtlResult<CleanReport> {
        info!("--- STARTING CLEANING PROCESS ---");
        self.storage.ensure_cleaned_dir()?;

        let mut report = CleanReport::default();

        self.record(&mut report, ORDERS, |df| clean_orders(&self.normalizer, df));
        self.record(&mut report, ORDER_ITEMS, |df| clean_order_items(&self.normalizer, df));
        let outcome = self.process_products();
        report.files.push((PRODUCTS.file_name.to_string(), outcome));
        self.record(&mut report, REVIEWS, clean_reviews);
        self.record(&mut report, FLIPKART, |df| clean_flipkart(&self.normalizer, df));

        for dataset in TEXT_ONLY_DATASETS {
            self.record(&mut report, dataset, |df| {
                clean_text_only(&self.normalizer, df, dataset.text_columns)
            });
        }

        info!(
            "--- CLEANING COMPLETE: {} saved, {} skipped, {} failed. Output in {} ---",
            report.saved(),
            report.skipped(),
            report.failed(),
            self.storage.cleaned_dir().display()
        );

        Ok(report)
    }

    fn record<F>(&self, report: &mut CleanReport, dataset: RawDataset, rule: F)
    where
        F: FnOnce(DataFrame) -> EtlResult<DataFrame>,
    {
        let outcome = into_outcome(dataset.file_name, self.process(dataset.file_name, rule));
        report.files.push((dataset.file_name.to_string(), outcome));
    }

    /// Read, transform, write one file.
    pub fn process<F>(&self, file_name: &str, rule: F) -> EtlResult<(PathBuf, usize)>
    where
        F: FnOnce(DataFrame) -> EtlResult<DataFrame>,
    {
        let raw = self.storage.load_raw(file_name)?;
        let mut cleaned = rule(raw)?;
        let path = self.storage.store_cleaned(file_name, &mut cleaned)?;
        Ok((path, cleaned.height()))
    }

    fn process_products(&self) -> FileOutcome {
        // The translation table is optional; without it categories are only renamed
        let translation = match self.storage.load_raw_optional(CATEGORY_TRANSLATION.file_name) {
            Ok(translation) => translation,
            Err(e) => {
                warn!("Ignoring unreadable category translation table: {}", e);
                None
            }
        };

        let result = self.process(PRODUCTS.file_name, |products| {
            clean_products(products, translation.as_ref())
        });
        into_outcome(PRODUCTS.file_name, result)
    }
}

fn into_outcome(file_name: &str, result: EtlResult<(PathBuf, usize)>) -> FileOutcome {
    match result {
        Ok((path, rows)) => FileOutcome::Saved { path, rows },
        Err(EtlError::MissingInput(path)) => {
            warn!("!! WARNING: {} not found ({}), skipping", file_name, path.display());
            FileOutcome::Skipped
        }
        Err(e) => {
            error!("❌ Failed to clean {}: {}", file_name, e);
            FileOutcome::Failed(e.to_string())
        }
    }
}
