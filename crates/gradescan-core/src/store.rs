//! Result persistence.
//!
//! The engine saves finished sheets through a [`ResultStore`] so callers can
//! swap the backing medium; the shipped implementation is one JSON file per
//! sheet under a results directory.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::results::SheetResult;

/// Persistence collaborator for finished sheet analyses, keyed by sheet id.
pub trait ResultStore: Send + Sync {
    /// Persist a finished sheet result.
    fn save(&self, result: &SheetResult) -> Result<()>;

    /// Fetch a previously saved result, `None` when the id is unknown.
    fn load(&self, sheet_id: &str) -> Result<Option<SheetResult>>;
}

/// Stores each sheet as `{root}/{sheet_id}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, sheet_id: &str) -> PathBuf {
        // Sheet ids may be user-supplied; keep them filename-safe.
        let safe_id = sheet_id.replace(['/', ':'], "_");
        self.root.join(format!("{safe_id}.json"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResultStore for JsonFileStore {
    fn save(&self, result: &SheetResult) -> Result<()> {
        result.save_json(&self.path_for(&result.sheet_id))
    }

    fn load(&self, sheet_id: &str) -> Result<Option<SheetResult>> {
        let path = self.path_for(sheet_id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(SheetResult::load_json(&path)?))
    }
}
