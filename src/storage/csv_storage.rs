use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{EtlError, EtlResult};
use crate::storage::storage_manager::StorageManager;

/// Reads raw extracts and cleaned files, writes cleaned files.
///
/// Every column is read as nullable text; empty fields arrive as nulls and
/// typing is left to the rules that need it.
pub struct CsvStorage {
    raw_dir: PathBuf,
    cleaned_dir: PathBuf,
}

impl CsvStorage {
    pub fn new(raw_dir: impl Into<PathBuf>, cleaned_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            cleaned_dir: cleaned_dir.into(),
        }
    }

    pub fn cleaned_dir(&self) -> &Path {
        &self.cleaned_dir
    }

    pub fn ensure_cleaned_dir(&self) -> EtlResult<()> {
        fs::create_dir_all(&self.cleaned_dir)?;
        Ok(())
    }

    pub fn load_raw(&self, file_name: &str) -> EtlResult<DataFrame> {
        let path = StorageManager::raw_path(&self.raw_dir, file_name);
        let df = read_text_csv(&path)?;
        info!("Processing: {} ({} rows)", file_name, df.height());
        Ok(df)
    }

    /// Like `load_raw`, but a missing file is just `None`.
    pub fn load_raw_optional(&self, file_name: &str) -> EtlResult<Option<DataFrame>> {
        match self.load_raw(file_name) {
            Ok(df) => Ok(Some(df)),
            Err(EtlError::MissingInput(path)) => {
                warn!("{} not found, continuing without it", path.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn load_cleaned(&self, file_name: &str) -> EtlResult<DataFrame> {
        read_text_csv(&StorageManager::cleaned_path(&self.cleaned_dir, file_name))
    }

    pub fn store_cleaned(&self, file_name: &str, df: &mut DataFrame) -> EtlResult<PathBuf> {
        let path = StorageManager::cleaned_path(&self.cleaned_dir, file_name);
        write_csv(df, &path)?;
        info!("Saved: {} | Shape: ({}, {})", path.display(), df.height(), df.width());
        Ok(path)
    }
}

pub fn read_text_csv(path: &Path) -> EtlResult<DataFrame> {
    if !path.exists() {
        return Err(EtlError::MissingInput(path.to_path_buf()));
    }

    CsvReadOptions::default()
        .with_has_header(true)
        // Zero inference rows: every column stays a string column
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|source| EtlError::Read {
            path: path.to_path_buf(),
            source,
        })
}

pub fn write_csv(df: &mut DataFrame, path: &Path) -> EtlResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|source| EtlError::Write {
            path: path.to_path_buf(),
            source,
        })
}
