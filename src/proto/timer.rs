//! 定时器服务
//!
//! 每个发送槽位一个重传定时器（按 `seq mod W` 编号），外加一个共享的延迟 ACK 定时器。
//! 实际计时交给 [`TimerScheduler`]；到期时调度器只把 [`TimerFired`] 投递回事件队列，
//! 由引擎持有的 [`TimerService`] 按代号核验后转换成 `Timeout(seq)` / `AckTimeout`。
//!
//! 每次启动定时器都会分配新代号，所以被取消或被重启覆盖的旧定时器即使已经在途，
//! 到达引擎时也会因代号不符被丢弃。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::event::Event;
use super::seq::{Seq, SeqSpace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "timer", content = "slot", rename_all = "snake_case")]
pub enum TimerKey {
    Retransmit(usize),
    DelayedAck,
}

/// 调度器在到期时交回的令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerFired {
    pub key: TimerKey,
    pub generation: u64,
}

/// 底层计时设施
///
/// `arm` 在 `after` 之后把 `fired` 投递回引擎的事件队列；同一个 key 再次 `arm` 之前
/// 服务一定会先 `cancel`。实现可以尽力取消，漏网的旧令牌由代号核验兜底。
pub trait TimerScheduler {
    fn arm(&mut self, fired: TimerFired, after: Duration);
    fn cancel(&mut self, key: TimerKey);
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    generation: u64,
    seq: Seq,
}

#[derive(Debug)]
pub struct TimerService<S> {
    space: SeqSpace,
    timeout: Duration,
    ack_timeout: Duration,
    retransmit: Vec<Option<Armed>>,
    ack: Option<u64>,
    next_generation: u64,
    scheduler: S,
}

impl<S: TimerScheduler> TimerService<S> {
    pub fn new(space: SeqSpace, timeout: Duration, ack_timeout: Duration, scheduler: S) -> Self {
        Self {
            space,
            timeout,
            ack_timeout,
            retransmit: vec![None; space.window() as usize],
            ack: None,
            next_generation: 0,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn bump(&mut self) -> u64 {
        self.next_generation = self.next_generation.wrapping_add(1);
        self.next_generation
    }

    pub fn start_retransmit_timer(&mut self, seq: Seq) {
        self.stop_retransmit_timer(seq);
        let slot = self.space.slot(seq);
        let generation = self.bump();
        self.retransmit[slot] = Some(Armed { generation, seq });
        trace!(seq, slot, generation, "启动重传定时器");
        self.scheduler.arm(
            TimerFired {
                key: TimerKey::Retransmit(slot),
                generation,
            },
            self.timeout,
        );
    }

    pub fn stop_retransmit_timer(&mut self, seq: Seq) {
        let slot = self.space.slot(seq);
        if self.retransmit[slot].take().is_some() {
            self.scheduler.cancel(TimerKey::Retransmit(slot));
        }
    }

    pub fn start_ack_timer(&mut self) {
        self.stop_ack_timer();
        let generation = self.bump();
        self.ack = Some(generation);
        self.scheduler.arm(
            TimerFired {
                key: TimerKey::DelayedAck,
                generation,
            },
            self.ack_timeout,
        );
    }

    pub fn stop_ack_timer(&mut self) {
        if self.ack.take().is_some() {
            self.scheduler.cancel(TimerKey::DelayedAck);
        }
    }

    pub fn is_retransmit_armed(&self, seq: Seq) -> bool {
        matches!(self.retransmit[self.space.slot(seq)], Some(a) if a.seq == seq)
    }

    pub fn is_ack_armed(&self) -> bool {
        self.ack.is_some()
    }

    /// 核验一次到期：仍是当前代号则解除武装并返回对应事件，否则返回 None。
    pub fn accept(&mut self, fired: TimerFired) -> Option<Event> {
        match fired.key {
            TimerKey::Retransmit(slot) => {
                let entry = self.retransmit.get_mut(slot)?;
                match *entry {
                    Some(armed) if armed.generation == fired.generation => {
                        *entry = None;
                        Some(Event::Timeout(armed.seq))
                    }
                    _ => None,
                }
            }
            TimerKey::DelayedAck => match self.ack {
                Some(generation) if generation == fired.generation => {
                    self.ack = None;
                    Some(Event::AckTimeout)
                }
                _ => None,
            },
        }
    }
}
