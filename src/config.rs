//! 协议参数配置
//!
//! 序号空间大小与两个定时器时长是固定常量，但允许通过 JSON 文件覆盖，
//! 加载后必须经过 `validate()` 才能交给协议引擎使用。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::proto::SeqSpace;

pub const DEFAULT_MAX_SEQ: u32 = 7;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 500;
/// `max_seq` 上限：窗口缓冲区与定时器表按 `(max_seq+1)/2` 预分配
pub const MAX_SEQ_LIMIT: u32 = 65_535;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_seq = {max_seq} 时窗口大小为 0")]
    EmptySequenceSpace { max_seq: u32 },
    #[error("max_seq = {max_seq} 超过上限 {limit}")]
    SequenceSpaceTooLarge { max_seq: u32, limit: u32 },
    #[error("窗口 {window} 超过序号空间的一半（上限 {max}），接收方无法区分新帧与回绕的旧帧")]
    WindowTooLarge { window: u32, max: u32 },
    #[error("窗口 {window} 与序号空间不匹配（应为 {expected}）")]
    WindowMismatch { window: u32, expected: u32 },
    #[error("ack_timeout_ms ({ack_timeout_ms}) 必须严格小于 timeout_ms ({timeout_ms})")]
    AckTimeoutNotShorter { ack_timeout_ms: u64, timeout_ms: u64 },
    #[error("定时器时长不能为 0")]
    ZeroTimeout,
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("解析配置 JSON 失败: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// 最大序号，序号空间为 `[0, max_seq]`
    #[serde(default = "default_max_seq")]
    pub max_seq: u32,
    /// 显式窗口大小；None 表示按 `(max_seq+1)/2` 推导
    #[serde(default)]
    pub window: Option<u32>,
    /// 重传定时器（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 延迟 ACK 定时器（毫秒）
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

fn default_max_seq() -> u32 {
    DEFAULT_MAX_SEQ
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_ack_timeout_ms() -> u64 {
    DEFAULT_ACK_TIMEOUT_MS
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_seq: DEFAULT_MAX_SEQ,
            window: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
        }
    }
}

/// 校验通过的配置。只能由 [`ProtocolConfig::validate`] 构造。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedConfig {
    space: SeqSpace,
    timeout: Duration,
    ack_timeout: Duration,
}

impl ValidatedConfig {
    pub fn space(&self) -> SeqSpace {
        self.space
    }

    pub fn window(&self) -> u32 {
        self.space.window()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }
}

impl ProtocolConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        if self.max_seq > MAX_SEQ_LIMIT {
            return Err(ConfigError::SequenceSpaceTooLarge {
                max_seq: self.max_seq,
                limit: MAX_SEQ_LIMIT,
            });
        }
        let space = SeqSpace::new(self.max_seq);
        let expected = space.window();
        if expected == 0 {
            return Err(ConfigError::EmptySequenceSpace {
                max_seq: self.max_seq,
            });
        }
        if let Some(window) = self.window {
            if window > expected {
                return Err(ConfigError::WindowTooLarge {
                    window,
                    max: expected,
                });
            }
            if window != expected {
                return Err(ConfigError::WindowMismatch { window, expected });
            }
        }
        if self.timeout_ms == 0 || self.ack_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.ack_timeout_ms >= self.timeout_ms {
            return Err(ConfigError::AckTimeoutNotShorter {
                ack_timeout_ms: self.ack_timeout_ms,
                timeout_ms: self.timeout_ms,
            });
        }
        Ok(ValidatedConfig {
            space,
            timeout: Duration::from_millis(self.timeout_ms),
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
        })
    }
}
