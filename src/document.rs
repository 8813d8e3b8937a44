//! Notebook document model.
//!
//! A notebook on disk is a JSON object with a top-level `cells` array; each
//! cell carries a `source` array of line strings plus whatever metadata,
//! outputs, and format fields the viewer owns. Only the source lines are
//! interpreted here. The document is kept as a raw JSON tree so a rewrite of
//! one line leaves every other field, and the key order, exactly as loaded.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Position of one source line: cell index, then line index within the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRef {
    pub cell: usize,
    pub line: usize,
}

#[derive(Debug)]
pub struct NotebookDocument {
    root: Value,
}

impl NotebookDocument {
    /// Parse the notebook at `path`. Invalid JSON or a missing `cells` array
    /// is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read notebook {}", path.display()))?;
        let root: Value = serde_json::from_str(&raw)
            .with_context(|| format!("notebook {} is not valid JSON", path.display()))?;
        if !root.get("cells").map_or(false, Value::is_array) {
            anyhow::bail!("notebook {} has no `cells` array", path.display());
        }
        Ok(Self { root })
    }

    /// Write the document back, pretty-printed with two-space indentation,
    /// the same shape the hosting editor saves.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.root)
            .context("failed to serialize notebook")?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write notebook {}", path.display()))
    }

    fn cells(&self) -> &[Value] {
        // Presence of the array is checked at load time.
        self.root
            .get("cells")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All source lines in document order: cells top to bottom, lines top to
    /// bottom within each cell. Cells without a `source` array and non-string
    /// source entries are skipped.
    pub fn source_lines(&self) -> impl Iterator<Item = (LineRef, &str)> + '_ {
        self.cells().iter().enumerate().flat_map(|(cell, c)| {
            c.get("source")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .enumerate()
                .filter_map(move |(line, v)| v.as_str().map(|s| (LineRef { cell, line }, s)))
        })
    }

    /// Replace the line at `at` with `text`. Returns false when the position
    /// does not exist in the tree.
    pub fn rewrite_line(&mut self, at: LineRef, text: String) -> bool {
        let slot = self
            .root
            .get_mut("cells")
            .and_then(|c| c.get_mut(at.cell))
            .and_then(|c| c.get_mut("source"))
            .and_then(|s| s.get_mut(at.line));
        match slot {
            Some(v) if v.is_string() => {
                *v = Value::String(text);
                true
            }
            _ => false,
        }
    }
}
