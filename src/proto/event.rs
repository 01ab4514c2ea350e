//! 协议事件
//!
//! 所有生产者（物理层、网络层、定时器）都只向引擎投递 [`Signal`]，
//! 引擎逐个处理，处理完一个再取下一个。

use serde::{Deserialize, Serialize};

use super::seq::Seq;
use super::timer::TimerFired;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// 网络层有额度且有分组待发
    SendReady,
    /// 物理层收到一个结构完好的帧，可通过 `receive_next()` 取出
    FrameArrival,
    /// 物理层检测到校验和错误，帧内容不可用
    CksumErr,
    /// 序号为 `seq` 的帧重传定时器到期
    Timeout(Seq),
    /// 延迟 ACK 定时器到期
    AckTimeout,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::SendReady => EventKind::SendReady,
            Event::FrameArrival => EventKind::FrameArrival,
            Event::CksumErr => EventKind::CksumErr,
            Event::Timeout(_) => EventKind::Timeout,
            Event::AckTimeout => EventKind::AckTimeout,
        }
    }
}

/// 事件类型标签（用于日志与回放记录）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SendReady,
    FrameArrival,
    CksumErr,
    Timeout,
    AckTimeout,
}

/// 事件队列中的一项：要么是协议事件，要么是尚未核验的定时器触发
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Event(Event),
    Timer(TimerFired),
}

impl From<Event> for Signal {
    fn from(ev: Event) -> Self {
        Signal::Event(ev)
    }
}

impl From<TimerFired> for Signal {
    fn from(fired: TimerFired) -> Self {
        Signal::Timer(fired)
    }
}
