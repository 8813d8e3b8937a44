//! User-facing run log.
//!
//! One append-only file of timestamped progress lines, echoed to stdout so a
//! terminal run reads the same as the file afterwards. Built once in main
//! and passed by reference to everything that reports progress. Sink write
//! failures are swallowed; losing a log line never takes down a run.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct RunLog {
    file: Mutex<File>,
    path: PathBuf,
}

impl RunLog {
    /// Open the log file for appending, creating it if needed.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open run log: {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line and echo it to stdout.
    pub fn line(&self, message: &str) {
        let stamped = format!("{} {}", chrono::Local::now().format("%H:%M:%S%.3f"), message);
        println!("{stamped}");
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{stamped}");
        }
    }
}
