//! 故障注入信道
//!
//! 每个发出的帧按概率被丢弃、复制、损坏或额外延迟（从而乱序）。
//! 随机数使用固定种子，同一种子下结果可复现。
//!
//! 副本的寿命是有界的：同一方向上比它晚发出的帧一旦先到，它就过期，到达时按丢失处理
//! （见 [`ArrivalGate`]）。否则一份迟到的旧副本可能在序号回绕后被当作新帧接收。

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stats::LinkStats;

#[derive(Debug, Error, PartialEq)]
pub enum FaultError {
    #[error("{name} = {value} 不在 [0, 1] 区间内")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultModel {
    /// 丢帧概率
    #[serde(default)]
    pub loss: f64,
    /// 每个副本被损坏（接收端报告校验错误）的概率
    #[serde(default)]
    pub corrupt: f64,
    /// 帧被复制成两份的概率
    #[serde(default)]
    pub duplicate: f64,
    /// 副本被额外延迟 `U[0, jitter]` 的概率
    #[serde(default)]
    pub reorder: f64,
    /// 单向传播时延（毫秒）
    #[serde(default)]
    pub latency_ms: u64,
    /// 乱序时追加的最大延迟（毫秒）
    #[serde(default)]
    pub jitter_ms: u64,
}

impl FaultModel {
    /// 无故障的透明信道
    pub fn perfect(latency_ms: u64) -> Self {
        Self {
            latency_ms,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), FaultError> {
        for (name, value) in [
            ("loss", self.loss),
            ("corrupt", self.corrupt),
            ("duplicate", self.duplicate),
            ("reorder", self.reorder),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FaultError::ProbabilityOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// 一份将要到达对端的副本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// 该帧在本方向上的发送序号（同一帧的两份副本相同）
    pub frame_index: u64,
    pub delay: Duration,
    pub corrupted: bool,
}

/// 接收端的过期检查：记录已到达的最大发送序号，更早发出的副本一律丢弃
#[derive(Debug, Default, Clone)]
pub struct ArrivalGate {
    newest: Option<u64>,
    expired: u64,
}

impl ArrivalGate {
    /// 到达时调用；返回 false 表示副本已被后发的帧超越，应当丢弃
    pub fn admit(&mut self, frame_index: u64) -> bool {
        match self.newest {
            Some(newest) if frame_index < newest => {
                self.expired += 1;
                false
            }
            _ => {
                self.newest = Some(frame_index);
                true
            }
        }
    }

    /// 因过期被丢弃的副本数
    pub fn expired(&self) -> u64 {
        self.expired
    }
}

/// 单向信道
#[derive(Debug)]
pub struct Channel {
    model: FaultModel,
    rng: StdRng,
    next_index: u64,
    pub stats: LinkStats,
}

impl Channel {
    pub fn new(model: FaultModel, seed: u64) -> Result<Self, FaultError> {
        model.validate()?;
        Ok(Self {
            model,
            rng: StdRng::seed_from_u64(seed),
            next_index: 0,
            stats: LinkStats::default(),
        })
    }

    pub fn model(&self) -> &FaultModel {
        &self.model
    }

    /// 决定一个帧的命运：空表示丢失，两项表示被复制
    pub fn transmit(&mut self) -> Vec<Delivery> {
        let frame_index = self.next_index;
        self.next_index += 1;
        self.stats.sent_frames += 1;
        if self.rng.gen_bool(self.model.loss) {
            self.stats.lost_frames += 1;
            return Vec::new();
        }
        let copies = if self.rng.gen_bool(self.model.duplicate) {
            self.stats.duplicated_frames += 1;
            2
        } else {
            1
        };
        (0..copies)
            .map(|_| {
                let corrupted = self.rng.gen_bool(self.model.corrupt);
                if corrupted {
                    self.stats.corrupted_frames += 1;
                } else {
                    self.stats.delivered_frames += 1;
                }
                let mut delay_ms = self.model.latency_ms;
                if self.model.jitter_ms > 0 && self.rng.gen_bool(self.model.reorder) {
                    delay_ms = delay_ms.saturating_add(self.rng.gen_range(0..=self.model.jitter_ms));
                }
                Delivery {
                    frame_index,
                    delay: Duration::from_millis(delay_ms),
                    corrupted,
                }
            })
            .collect()
    }
}
