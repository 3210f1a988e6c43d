// src/sink/local.rs
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::StructuredNote;
use crate::storage::append_json_line;

/// Append-only JSONL file of saved notes. Always written before any remote store.
#[derive(Clone, Debug)]
pub struct LocalNotes {
    path: PathBuf,
}

impl LocalNotes {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, note: &StructuredNote) -> Result<()> {
        append_json_line(&self.path, note)
    }
}
