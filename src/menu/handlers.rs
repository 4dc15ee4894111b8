use crate::component::{ConversionKind, JobOrchestrator, JobStore, SnapshotConverter};
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn run_snapshot_converter(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
    store: &Arc<JobStore>,
    kind: ConversionKind,
) -> Result<()> {
    let orchestrator = JobOrchestrator::from_settings(&config.settings, Arc::clone(store));
    let converter = SnapshotConverter::new(orchestrator, Arc::clone(shutdown_signal));

    if let Err(e) = converter.run(kind) {
        eprintln!("{} {:#}", style(t!("common.error")).red().bold(), e);
    }

    pause(term)?;
    Ok(())
}
