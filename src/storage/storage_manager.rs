use std::path::{Path, PathBuf};

/// Prefix every cleaned file carries in front of its raw file name.
pub const CLEANED_PREFIX: &str = "cleaned_";

/// Deterministic locations of raw and cleaned files.
pub struct StorageManager;

impl StorageManager {
    pub fn raw_path(raw_dir: &Path, file_name: &str) -> PathBuf {
        raw_dir.join(file_name)
    }

    pub fn cleaned_file_name(file_name: &str) -> String {
        format!("{}{}", CLEANED_PREFIX, file_name)
    }

    pub fn cleaned_path(cleaned_dir: &Path, file_name: &str) -> PathBuf {
        cleaned_dir.join(Self::cleaned_file_name(file_name))
    }
}
