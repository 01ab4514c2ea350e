//! 仿真物理层

use std::collections::VecDeque;

use crate::proto::{Frame, PhysicalLayer};

/// 发件箱/收件箱：真正的信道传输由 [`super::DuplexWorld`] 调度
#[derive(Debug, Default)]
pub struct SimPhy {
    inbox: VecDeque<Frame>,
    outbox: Vec<Frame>,
}

impl SimPhy {
    pub fn push_arrival(&mut self, frame: Frame) {
        self.inbox.push_back(frame);
    }

    pub fn take_outbox(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.outbox)
    }
}

impl PhysicalLayer for SimPhy {
    fn transmit(&mut self, frame: Frame) {
        self.outbox.push(frame);
    }

    fn receive_next(&mut self) -> Option<Frame> {
        self.inbox.pop_front()
    }
}
