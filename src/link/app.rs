//! 上层应用（网络层协作者）
//!
//! 持有一串待发分组。拿到额度后，每有一个额度且还有未通知的分组，就记一次 `SendReady`
//! 通知，由驱动方（仿真世界或实时运行时）取走并投递到引擎的事件队列。

use std::collections::VecDeque;

use crate::proto::{NetworkLayer, Packet};

#[derive(Debug, Default)]
pub struct AppLayer {
    outgoing: VecDeque<Packet>,
    total: usize,
    credit: u32,
    /// 已通知但尚未被引擎取走的分组数
    announced: usize,
    /// 尚未被驱动方取走的 `SendReady` 通知
    ready: u32,
    delivered: Vec<Packet>,
}

impl AppLayer {
    pub fn new(packets: Vec<Packet>) -> Self {
        Self {
            total: packets.len(),
            outgoing: packets.into(),
            ..Self::default()
        }
    }

    /// 生成 `count` 个分组，载荷形如 `"{tag}-{i}"`
    pub fn generated(tag: &str, count: usize) -> Self {
        let packets = (0..count)
            .map(|i| Packet::new(i as u64, format!("{tag}-{i}")))
            .collect();
        Self::new(packets)
    }

    /// 取走积攒的 `SendReady` 通知数
    pub fn take_ready(&mut self) -> u32 {
        std::mem::take(&mut self.ready)
    }

    pub fn credit(&self) -> u32 {
        self.credit
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.outgoing.len()
    }

    /// 所有分组都已交给引擎
    pub fn is_complete(&self) -> bool {
        self.outgoing.is_empty()
    }

    pub fn delivered(&self) -> &[Packet] {
        &self.delivered
    }

    fn announce(&mut self) {
        while self.credit > 0 && self.outgoing.len() > self.announced {
            self.credit -= 1;
            self.announced += 1;
            self.ready += 1;
        }
    }
}

impl NetworkLayer for AppLayer {
    fn grant_credit(&mut self, n: u32) {
        self.credit = self.credit.saturating_add(n);
        self.announce();
    }

    fn pull_next_packet(&mut self) -> Option<Packet> {
        let packet = self.outgoing.pop_front()?;
        self.announced = self.announced.saturating_sub(1);
        Some(packet)
    }

    fn deliver(&mut self, packet: Packet) {
        self.delivered.push(packet);
    }
}
