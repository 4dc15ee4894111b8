use crate::component::{ConversionKind, JobStore};
use crate::config::save::save_settings;
use crate::config::types::{Config, Language, ResolveMode};
use crate::menu::handlers::run_snapshot_converter;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
    store: &Arc<JobStore>,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let options = vec![
        t!("main_menu.opt_interval"),
        t!("main_menu.opt_timestamps"),
        t!("main_menu.opt_json"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    let kind = match selection {
        Some(0) => ConversionKind::Interval,
        Some(1) => ConversionKind::Timestamps,
        Some(2) => ConversionKind::JsonFile,
        Some(3) => {
            show_settings_menu(term, config)?;
            return Ok(true);
        }
        Some(4) | None => return Ok(false),
        _ => unreachable!(),
    };

    run_snapshot_converter(term, shutdown_signal, config, store, kind)?;
    Ok(true)
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_interval"),
            t!("settings.opt_resolve_mode"),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_interval_menu(term, config)?,
            Some(1) => show_resolve_mode_menu(term, config)?,
            Some(2) => show_language_menu(term, config)?,
            Some(3) | None => break,
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// 預設截圖間隔
fn show_interval_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.interval.title")).cyan().bold());

    let interval: u64 = Input::new()
        .with_prompt(t!("settings.interval.prompt"))
        .default(config.settings.interval_seconds)
        .validate_with(|value: &u64| {
            if *value >= crate::component::job_orchestrator::MIN_INTERVAL_SECONDS {
                Ok(())
            } else {
                Err(t!("settings.interval.too_small").to_string())
            }
        })
        .interact_text_on(term)?;

    if interval != config.settings.interval_seconds {
        config.settings.interval_seconds = interval;
        save_settings(&config.settings)?;
        println!("\n{} {}", style(t!("settings.saved")).green(), interval);
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

/// 影片取得方式
fn show_resolve_mode_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.resolve_mode.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    println!(
        "\n{} {}",
        style(t!("settings.current")).dim(),
        config.settings.resolve_mode
    );
    println!();

    let items: Vec<String> = vec![
        t!("settings.resolve_mode.stream").to_string(),
        t!("settings.resolve_mode.download").to_string(),
    ];

    let default_index = ResolveMode::ALL
        .iter()
        .position(|&m| m == config.settings.resolve_mode)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.resolve_mode.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_mode = ResolveMode::ALL[selection];

    if selected_mode != config.settings.resolve_mode {
        config.settings.resolve_mode = selected_mode;
        save_settings(&config.settings)?;
        println!(
            "\n{} {}",
            style(t!("settings.saved")).green(),
            selected_mode
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let items: Vec<String> = Language::ALL.iter().map(ToString::to_string).collect();

    let default_index = Language::ALL
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = Language::ALL[selection];

    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_settings(&config.settings)?;
        println!(
            "\n{} {}",
            style(t!("settings.saved")).green(),
            selected_lang
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}
