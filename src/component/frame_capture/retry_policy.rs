use log::warn;
use std::thread;
use std::time::Duration;

/// 預設最多嘗試次數
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// 預設重試間隔
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// 有上限的重試策略：固定次數、固定間隔
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// 重試結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: Option<String> },
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// 執行 `attempt` 直到成功或用完次數
    ///
    /// `attempt` 回傳 `Ok(None)` 或 `Err` 都視為一次失敗；
    /// 最後一次失敗後不再等待
    pub fn run<T, F>(&self, label: &str, mut attempt: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> anyhow::Result<Option<T>>,
    {
        let mut last_error = None;

        for attempt_number in 1..=self.max_attempts {
            match attempt(attempt_number) {
                Ok(Some(value)) => {
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: attempt_number,
                    };
                }
                Ok(None) => {
                    warn!("{label}: 第 {attempt_number} 次嘗試沒有取得結果");
                    last_error = None;
                }
                Err(e) => {
                    warn!("{label}: 第 {attempt_number} 次嘗試失敗: {e:#}");
                    last_error = Some(format!("{e:#}"));
                }
            }

            if attempt_number < self.max_attempts && !self.backoff.is_zero() {
                thread::sleep(self.backoff);
            }
        }

        RetryOutcome::Exhausted {
            attempts: self.max_attempts,
            last_error,
        }
    }
}
