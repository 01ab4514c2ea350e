//! 测试用的记录型协作者

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::{ProtocolConfig, ValidatedConfig};
use crate::proto::{
    Engine, Frame, NetworkLayer, Packet, PhysicalLayer, TimerFired, TimerKey, TimerScheduler,
};

#[derive(Debug, Default)]
pub struct RecNet {
    pub credit_grants: Vec<u32>,
    pub outgoing: VecDeque<Packet>,
    pub delivered: Vec<Packet>,
}

impl RecNet {
    pub fn total_credit(&self) -> u32 {
        self.credit_grants.iter().sum()
    }
}

impl NetworkLayer for RecNet {
    fn grant_credit(&mut self, n: u32) {
        self.credit_grants.push(n);
    }

    fn pull_next_packet(&mut self) -> Option<Packet> {
        self.outgoing.pop_front()
    }

    fn deliver(&mut self, packet: Packet) {
        self.delivered.push(packet);
    }
}

#[derive(Debug, Default)]
pub struct RecPhy {
    pub inbox: VecDeque<Frame>,
    pub sent: Vec<Frame>,
}

impl PhysicalLayer for RecPhy {
    fn transmit(&mut self, frame: Frame) {
        self.sent.push(frame);
    }

    fn receive_next(&mut self) -> Option<Frame> {
        self.inbox.pop_front()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOp {
    Arm(TimerFired, Duration),
    Cancel(TimerKey),
}

#[derive(Debug, Default)]
pub struct RecTimers {
    pub ops: Vec<TimerOp>,
}

impl RecTimers {
    /// 最近一次对 `key` 的武装
    pub fn last_armed(&self, key: TimerKey) -> Option<TimerFired> {
        self.ops.iter().rev().find_map(|op| match op {
            TimerOp::Arm(f, _) if f.key == key => Some(*f),
            _ => None,
        })
    }
}

impl TimerScheduler for RecTimers {
    fn arm(&mut self, fired: TimerFired, after: Duration) {
        self.ops.push(TimerOp::Arm(fired, after));
    }

    fn cancel(&mut self, key: TimerKey) {
        self.ops.push(TimerOp::Cancel(key));
    }
}

pub type TestEngine = Engine<RecNet, RecPhy, RecTimers>;

pub fn cfg(max_seq: u32) -> ValidatedConfig {
    ProtocolConfig {
        max_seq,
        ..ProtocolConfig::default()
    }
    .validate()
    .expect("valid test config")
}

pub fn packet(id: u64) -> Packet {
    Packet::new(id, format!("payload-{id}"))
}

/// 一个已启动、网络层有 `packets` 个待发分组的引擎
pub fn engine(max_seq: u32, packets: u64) -> TestEngine {
    let net = RecNet {
        outgoing: (0..packets).map(packet).collect(),
        ..RecNet::default()
    };
    let mut e = Engine::new("test", cfg(max_seq), net, RecPhy::default(), RecTimers::default());
    e.start();
    e
}
