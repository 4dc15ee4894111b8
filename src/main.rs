use anyhow::Result;
use console::{Term, style};
use log::{info, warn};
use rust_i18n::t;
use std::sync::Arc;
use video_snapshot_pdf::component::{CleanupSweeper, JobStore};
use video_snapshot_pdf::config::types::Config;
use video_snapshot_pdf::init;
use video_snapshot_pdf::menu::show_main_menu;
use video_snapshot_pdf::signal::setup_shutdown_signal;

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en-US");

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal()?;

    let mut config = Config::new()?;
    rust_i18n::set_locale(config.settings.language.as_str());

    let store = Arc::new(JobStore::new());
    let sweeper = CleanupSweeper::from_settings(&config.settings, Arc::clone(&store));
    if let Err(e) = sweeper.spawn(Arc::clone(&shutdown_signal)) {
        warn!("無法啟動清理執行緒: {e}");
    }

    loop {
        match show_main_menu(&term, &shutdown_signal, &mut config, &store) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style(t!("main_menu.goodbye")).green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                eprintln!("{} {}", style(t!("main_menu.error_prefix")).red().bold(), e);
                break;
            }
        }
    }

    Ok(())
}
