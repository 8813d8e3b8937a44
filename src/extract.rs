//! Extraction step: runs the data-extract script and captures its output.

use crate::config::OutputEncoding;
use crate::runlog::RunLog;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

pub struct ExtractionStep {
    interpreter: String,
    script: PathBuf,
    workdir: PathBuf,
    encoding: OutputEncoding,
}

impl ExtractionStep {
    pub fn new(
        interpreter: &str,
        script: PathBuf,
        workdir: PathBuf,
        encoding: OutputEncoding,
    ) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            script,
            workdir,
            encoding,
        }
    }

    /// Run the script to completion and log what it printed. The process
    /// gets no stdin and runs with the workspace root as its working
    /// directory. Spawn failure or a non-zero exit aborts the cycle; there
    /// is no timeout, downloads legitimately take minutes.
    pub async fn run(&self, log: &RunLog) -> Result<String> {
        log.line(&format!("--- running extraction script: {} ---", self.script.display()));

        let output = Command::new(&self.interpreter)
            .arg(&self.script)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| {
                format!("failed to spawn {} {}", self.interpreter, self.script.display())
            })?;

        let stdout = decode(&output.stdout, self.encoding);
        let stderr = decode(&output.stderr, self.encoding);
        if !stdout.trim().is_empty() {
            log.line(stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            log.line(stderr.trim_end());
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let detail = last_line(&stderr);
            if detail.is_empty() {
                anyhow::bail!("extraction script exited with code {}", code);
            }
            anyhow::bail!("extraction script exited with code {}: {}", code, detail);
        }
        log.line("extraction finished");
        Ok(stdout)
    }
}

fn decode(bytes: &[u8], encoding: OutputEncoding) -> String {
    match encoding {
        OutputEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        OutputEncoding::Gbk => {
            let (text, _, _) = encoding_rs::GBK.decode(bytes);
            text.into_owned()
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("")
}
