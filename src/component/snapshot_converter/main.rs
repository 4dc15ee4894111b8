use crate::component::job_orchestrator::{
    CaptureMode, JobOrchestrator, JobRequest, JobStatus, JobStatusView, TimestampEntry,
    resolve_entries,
};
use crate::tools::format_hms;
use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rust_i18n::t;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// 轉換方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// 固定間隔
    Interval,
    /// 逗號分隔的時間點
    Timestamps,
    /// JSON 檔案中的時間點列表
    JsonFile,
}

/// 互動式影片轉 PDF
///
/// 與背景工作共用同一個 [`JobOrchestrator`]，
/// 提交後以進度條輪詢直到工作結束
pub struct SnapshotConverter {
    orchestrator: JobOrchestrator,
    shutdown_signal: Arc<AtomicBool>,
}

impl SnapshotConverter {
    pub const fn new(orchestrator: JobOrchestrator, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            orchestrator,
            shutdown_signal,
        }
    }

    pub fn run(&self, kind: ConversionKind) -> Result<()> {
        let title = match kind {
            ConversionKind::Interval => t!("converter.title_interval"),
            ConversionKind::Timestamps => t!("converter.title_timestamps"),
            ConversionKind::JsonFile => t!("converter.title_json"),
        };
        println!("{}", style(title).cyan().bold());

        let video_ref = self.prompt_video_ref()?;
        let request = match kind {
            ConversionKind::Interval => {
                JobRequest::interval(video_ref, self.prompt_interval()?)
            }
            ConversionKind::Timestamps => {
                let entries = parse_timestamp_input(&self.prompt_timestamps()?);
                print_resolved_preview(&entries);
                JobRequest::custom(video_ref, &entries)
            }
            ConversionKind::JsonFile => JobRequest {
                video_ref,
                mode: CaptureMode::Custom,
                interval: None,
                timestamp_list: Some(self.prompt_json_file()?),
            },
        };

        let job_id = match self.orchestrator.submit(&request) {
            Ok(job_id) => job_id,
            Err(e) => {
                println!(
                    "{} {}",
                    style(t!("converter.invalid_request")).red().bold(),
                    e
                );
                return Ok(());
            }
        };

        println!(
            "{}",
            style(t!("converter.submitted", id = job_id.as_str())).dim()
        );

        match self.follow_job(&job_id) {
            Some(view) => self.print_summary(&view),
            None => println!("{}", style(t!("converter.detached")).yellow()),
        }

        Ok(())
    }

    fn prompt_video_ref(&self) -> Result<String> {
        let video_ref: String = Input::new()
            .with_prompt(t!("converter.prompt_video_ref"))
            .interact_text()?;
        Ok(video_ref.trim().to_string())
    }

    fn prompt_interval(&self) -> Result<u64> {
        let interval: u64 = Input::new()
            .with_prompt(t!("converter.prompt_interval"))
            .default(self.orchestrator.settings().interval_seconds)
            .interact_text()?;
        Ok(interval)
    }

    fn prompt_timestamps(&self) -> Result<String> {
        let input: String = Input::new()
            .with_prompt(t!("converter.prompt_timestamps"))
            .interact_text()?;
        Ok(input)
    }

    fn prompt_json_file(&self) -> Result<Value> {
        let path: String = Input::new()
            .with_prompt(t!("converter.prompt_json_path"))
            .interact_text()?;
        let path = path.trim();

        let content =
            fs::read_to_string(path).with_context(|| format!("無法讀取時間點檔案: {path}"))?;
        serde_json::from_str(&content).with_context(|| format!("無法解析時間點檔案: {path}"))
    }

    /// 輪詢工作直到結束；收到中斷訊號時回傳 `None`，工作本身繼續執行
    fn follow_job(&self, job_id: &str) -> Option<JobStatusView> {
        let progress_bar = ProgressBar::new(100);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );

        let poll_interval = self.orchestrator.settings().poll_interval();

        loop {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                warn!("收到中斷訊號，停止追蹤工作 {job_id}");
                progress_bar.abandon();
                return None;
            }

            let Some(view) = self.orchestrator.poll(job_id) else {
                progress_bar.abandon();
                return None;
            };

            progress_bar.set_position((view.progress * 100.0).round() as u64);
            progress_bar.set_message(view.detail.clone().unwrap_or_else(|| view.message.clone()));

            if view.status.is_finished() {
                progress_bar.finish_with_message(view.message.clone());
                return Some(view);
            }

            thread::sleep(poll_interval);
        }
    }

    fn print_summary(&self, view: &JobStatusView) {
        println!();
        match (view.status, &view.result_filename) {
            (JobStatus::Completed, Some(filename)) => {
                let path = self.orchestrator.settings().output_dir.join(filename);
                println!("{}", style(t!("converter.completed")).green().bold());
                println!("  {} {}", t!("converter.output_path"), path.display());
                info!("PDF 已建立: {}", path.display());
            }
            _ => {
                println!("{} {}", style(t!("converter.failed")).red().bold(), view.message);
                if let Some(detail) = &view.detail {
                    println!("  {}", style(detail).dim());
                }
            }
        }
    }
}

/// 解析逗號分隔的時間點輸入，忽略空白項目
#[must_use]
pub fn parse_timestamp_input(input: &str) -> Vec<TimestampEntry> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(TimestampEntry::from)
        .collect()
}

fn print_resolved_preview(entries: &[TimestampEntry]) {
    let (timestamps, _) = resolve_entries(entries);
    let preview: Vec<String> = timestamps
        .iter()
        .map(|t| format_hms(t.max(0.0).floor() as u64))
        .collect();
    println!(
        "{} {}",
        style(t!("converter.resolved_preview")).dim(),
        preview.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::TimestampToken;

    #[test]
    fn test_parse_timestamp_input() {
        let entries = parse_timestamp_input(" 0:30, bad ,, 2:00 ,");
        let tokens: Vec<&TimestampToken> = entries.iter().map(TimestampEntry::token).collect();

        assert_eq!(
            tokens,
            vec![
                &TimestampToken::from("0:30"),
                &TimestampToken::from("bad"),
                &TimestampToken::from("2:00"),
            ]
        );
    }

    #[test]
    fn test_parse_timestamp_input_empty() {
        assert!(parse_timestamp_input("  ,  ").is_empty());
    }
}
