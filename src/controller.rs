//! Cycle Controller: sequences one full workflow iteration and repeats it
//! until the Date Advancer runs out of months.
//!
//! Each iteration is strictly sequential. Execution trigger failures, a
//! failed extraction, and advancer errors abort the whole run; output-clear
//! and runtime-restart rejections are logged and skipped.

use crate::advancer::{self, Advance};
use crate::config::{Config, CooldownConfig, CycleVariant};
use crate::extract::ExtractionStep;
use crate::host::{ExecutionState, HostCommand, NotebookHost};
use crate::runlog::RunLog;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// What a finished run looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Iterations started, including the final one that hit the bound.
    pub iterations: u32,
}

pub struct CycleController<'a> {
    host: Box<dyn NotebookHost>,
    extraction: ExtractionStep,
    notebook: PathBuf,
    variant: CycleVariant,
    cooldowns: CooldownConfig,
    log: &'a RunLog,
}

impl<'a> CycleController<'a> {
    pub fn new(config: &Config, host: Box<dyn NotebookHost>, log: &'a RunLog) -> Self {
        Self {
            host,
            extraction: ExtractionStep::new(
                &config.extraction.interpreter,
                config.script_path(),
                config.workflow.workspace_root.clone(),
                config.extraction.output_encoding,
            ),
            notebook: config.notebook_path(),
            variant: config.workflow.variant,
            cooldowns: config.cooldowns.clone(),
            log,
        }
    }

    /// Run cycles until the date bound is reached. The caller owns the one
    /// failure boundary; any error out of here ends the run.
    pub async fn run(&mut self) -> Result<CycleSummary> {
        let mut iterations = 0u32;
        loop {
            iterations += 1;
            self.log.line(&format!("=== cycle {} ===", iterations));

            self.run_notebook().await?;
            self.wait_for_execution().await;
            self.extraction.run(self.log).await?;

            if self.variant == CycleVariant::FullReset {
                self.clear_outputs().await;
                self.restart_runtime().await;
            }

            let advanced = advancer::advance_notebook_date(&self.notebook, self.log)
                .with_context(|| format!("advancing date in {}", self.notebook.display()))?;
            match advanced {
                Advance::Advanced { .. } => {
                    if self.variant == CycleVariant::DoubleRun {
                        self.run_notebook().await?;
                    }
                }
                Advance::BoundReached => break,
            }
        }
        self.log.line("all cycles finished");
        Ok(CycleSummary { iterations })
    }

    /// Focus the notebook and trigger execute-all. Fatal on rejection.
    async fn run_notebook(&mut self) -> Result<()> {
        self.log.line("--- running notebook ---");
        self.host.dispatch(HostCommand::FocusFirstEditorGroup).await?;
        self.host.dispatch(HostCommand::FocusNotebookTop).await?;
        tokio::time::sleep(Duration::from_millis(self.cooldowns.focus_settle_ms)).await;
        self.host.dispatch(HostCommand::ExecuteAllCells).await?;
        self.log.line("notebook execution triggered");
        Ok(())
    }

    /// Wait out the triggered execution. Hosts that report execution state
    /// are polled until idle under a bounded budget; everything else gets
    /// the fixed cooldown. Never fails the run.
    async fn wait_for_execution(&mut self) {
        let interval = Duration::from_millis(self.cooldowns.state_poll_interval_ms);
        let budget = Duration::from_millis(self.cooldowns.state_poll_budget_ms);
        let fallback = Duration::from_millis(self.cooldowns.execute_wait_ms);

        // Give the host a beat to pick up the execute before the first poll.
        tokio::time::sleep(interval).await;
        let started = Instant::now();
        loop {
            match self.host.execution_state().await {
                Ok(ExecutionState::Idle) => {
                    self.log.line("notebook execution idle");
                    return;
                }
                Ok(ExecutionState::Busy) => {}
                Ok(ExecutionState::Unknown) => {
                    self.log.line(&format!(
                        "host does not report execution state, waiting {}ms",
                        fallback.as_millis()
                    ));
                    tokio::time::sleep(fallback).await;
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "execution-state query failed, using fixed cooldown");
                    tokio::time::sleep(fallback).await;
                    return;
                }
            }
            if started.elapsed() >= budget {
                self.log.line("execution-state poll budget exhausted, continuing");
                return;
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Clear all cell outputs. Rejection is logged, never fatal.
    async fn clear_outputs(&mut self) {
        self.log.line("clearing all cell outputs");
        if let Err(e) = self.host.dispatch(HostCommand::ClearAllCellOutputs).await {
            self.log.line(&format!("failed to clear outputs: {e:#}"));
            tracing::warn!(error = %e, "clear-outputs command rejected");
        }
    }

    /// Restart the execution runtime and let it settle. Never fatal.
    async fn restart_runtime(&mut self) {
        self.log.line("restarting execution runtime");
        match self.host.dispatch(HostCommand::RestartRuntime).await {
            Ok(()) => {
                self.log.line("runtime restart acknowledged");
                tokio::time::sleep(Duration::from_millis(self.cooldowns.restart_settle_ms)).await;
            }
            Err(e) => {
                self.log.line(&format!("failed to restart runtime: {e:#}"));
                tracing::warn!(error = %e, "restart command rejected");
            }
        }
    }
}
