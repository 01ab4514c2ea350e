//! 发送/接收窗口缓冲区
//!
//! 两个容量固定为 W 的环形缓冲区，加上"已到达未交付"位图，均按 `seq mod W` 索引。
//! 这里不做窗口检查：调用方必须先用 `between()` 确认序号在窗口内。

use super::frame::Packet;
use super::seq::{Seq, SeqSpace};

#[derive(Debug, Clone)]
pub struct WindowBuffers {
    space: SeqSpace,
    out_buf: Vec<Packet>,
    in_buf: Vec<Packet>,
    arrived: Vec<bool>,
}

impl WindowBuffers {
    pub fn new(space: SeqSpace) -> Self {
        let w = space.window() as usize;
        Self {
            space,
            out_buf: vec![Packet::default(); w],
            in_buf: vec![Packet::default(); w],
            arrived: vec![false; w],
        }
    }

    pub fn capacity(&self) -> usize {
        self.out_buf.len()
    }

    pub fn put_out(&mut self, seq: Seq, packet: Packet) {
        let i = self.space.slot(seq);
        self.out_buf[i] = packet;
    }

    pub fn get_out(&self, seq: Seq) -> &Packet {
        &self.out_buf[self.space.slot(seq)]
    }

    pub fn put_in(&mut self, seq: Seq, packet: Packet) {
        let i = self.space.slot(seq);
        self.in_buf[i] = packet;
    }

    pub fn get_in(&self, seq: Seq) -> &Packet {
        &self.in_buf[self.space.slot(seq)]
    }

    pub fn mark_arrived(&mut self, seq: Seq) {
        let i = self.space.slot(seq);
        self.arrived[i] = true;
    }

    pub fn clear_arrived(&mut self, seq: Seq) {
        let i = self.space.slot(seq);
        self.arrived[i] = false;
    }

    pub fn is_arrived(&self, seq: Seq) -> bool {
        self.arrived[self.space.slot(seq)]
    }

    /// 从 `*cursor` 开始取出连续的已到达分组，清除对应槽位，并把游标推进到第一个空洞。
    pub fn drain_in_order(&mut self, cursor: &mut Seq) -> Vec<Packet> {
        let mut run = Vec::new();
        while self.is_arrived(*cursor) {
            let i = self.space.slot(*cursor);
            run.push(std::mem::take(&mut self.in_buf[i]));
            self.arrived[i] = false;
            *cursor = self.space.inc(*cursor);
        }
        run
    }
}
