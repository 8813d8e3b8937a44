use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which of the two observed per-cycle step orderings to run. They are kept
/// as distinct workflows rather than merged behind feature toggles.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CycleVariant {
    /// execute, wait, extract, clear outputs, restart runtime, advance date.
    FullReset,
    /// execute, wait, extract, advance date, execute again. No output clear,
    /// no runtime restart.
    DoubleRun,
}

impl fmt::Display for CycleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleVariant::FullReset => "full-reset",
            CycleVariant::DoubleRun => "double-run",
        })
    }
}

/// Text encoding of the extraction script's captured output. Interpreters on
/// localized Windows installs emit the legacy codepage, not UTF-8.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "gbk")]
    Gbk,
}

impl fmt::Display for OutputEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputEncoding::Utf8 => "utf-8",
            OutputEncoding::Gbk => "gbk",
        })
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub cooldowns: CooldownConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Directory the notebook and script paths are resolved against. Also the
    /// working directory of the extraction process.
    pub workspace_root: PathBuf,
    pub notebook: String,
    pub variant: CycleVariant,
    pub run_log: PathBuf,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            notebook: "02_data_download_run.ipynb".to_string(),
            variant: CycleVariant::FullReset,
            run_log: PathBuf::from("nb-cycle-run.log"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractionConfig {
    pub script: String,
    pub interpreter: String,
    pub output_encoding: OutputEncoding,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            script: "03_data_extract.py".to_string(),
            interpreter: "python".to_string(),
            output_encoding: OutputEncoding::Utf8,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HostConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:47821".to_string(),
            request_timeout_ms: 3000,
        }
    }
}

/// Fixed waits between steps, all in milliseconds. The defaults are the
/// values the workflow has always run with.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CooldownConfig {
    /// Pause between focusing the notebook and issuing execute-all.
    pub focus_settle_ms: u64,
    /// Fallback wait after execute-all when the host cannot report state.
    pub execute_wait_ms: u64,
    /// Pause after a runtime restart is acknowledged.
    pub restart_settle_ms: u64,
    pub state_poll_interval_ms: u64,
    pub state_poll_budget_ms: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            focus_settle_ms: 500,
            execute_wait_ms: 5000,
            restart_settle_ms: 15000,
            state_poll_interval_ms: 1000,
            state_poll_budget_ms: 120_000,
        }
    }
}

impl Config {
    /// Load config.toml. A missing file is not an error; the defaults
    /// reproduce the stock workflow.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))
            }
        };
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML: {}", path.display()))?;
        Ok(config)
    }

    pub fn notebook_path(&self) -> PathBuf {
        self.workflow.workspace_root.join(&self.workflow.notebook)
    }

    pub fn script_path(&self) -> PathBuf {
        self.workflow.workspace_root.join(&self.extraction.script)
    }
}
