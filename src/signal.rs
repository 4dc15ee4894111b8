use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Ctrl+C 只停止進度追蹤與清理執行緒，已提交的工作會執行到結束
pub fn setup_shutdown_signal() -> Result<Arc<AtomicBool>> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    ctrlc::set_handler(move || {
        if !signal_clone.swap(true, Ordering::SeqCst) {
            eprintln!("\n收到中斷信號，停止追蹤工作...");
        }
    })
    .context("無法設定 Ctrl-C 處理器")?;

    Ok(shutdown_signal)
}
