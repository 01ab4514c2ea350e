//! 仿真器
//!
//! 维护当前虚拟时间与事件队列，逐个执行事件（一个执行完再取下一个）。

use super::event::SimEvent;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::BinaryHeap;
use std::time::Duration;
use tracing::{debug, info, trace};

#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    executed: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 已执行的事件数
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// 队列中尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 调度事件在指定时间执行；早于当前时间的按当前时间处理
    pub fn schedule<E: SimEvent>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        trace!(now = ?self.now, ?at, seq, event_type = std::any::type_name::<E>(), "调度事件");
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });
    }

    /// 在 `delay` 之后执行
    pub fn schedule_after<E: SimEvent>(&mut self, delay: Duration, ev: E) {
        self.schedule(self.now.after(delay), ev);
    }

    fn step(&mut self, item: ScheduledEvent, world: &mut dyn World) {
        self.now = item.at;
        self.executed += 1;
        trace!(now = ?self.now, seq = item.seq, remaining = self.q.len(), "执行事件");
        item.ev.execute(self, world);
        world.on_tick(self);
    }

    /// 运行直到事件队列为空、世界报告完成或到达 `until`。
    #[tracing::instrument(skip(self, world))]
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        while let Some(top) = self.q.peek() {
            if top.at > until || world.is_done() {
                break;
            }
            let Some(item) = self.q.pop() else {
                break;
            };
            self.step(item, world);
        }
        if !world.is_done() {
            self.now = self.now.max(until);
        }
        debug!(now = ?self.now, pending = self.q.len(), "仿真暂停");
        info!(total_events = self.executed, final_time = ?self.now, "✅ 仿真结束");
    }

    /// 运行所有事件直到队列为空或世界报告完成。
    pub fn run(&mut self, world: &mut dyn World) {
        while !world.is_done() {
            let Some(item) = self.q.pop() else {
                break;
            };
            self.step(item, world);
        }
    }
}
