//! 协议引擎的外部协作者接口
//!
//! 上层"网络层"提供/接收分组，下层"物理层"收发帧，事件源把各路输入合并成一条有序流。

use super::event::Signal;
use super::frame::{Frame, Packet};

/// 上层（网络层）
pub trait NetworkLayer {
    /// 允许网络层再提交 `n` 个分组
    fn grant_credit(&mut self, n: u32);
    /// 取出下一个待发分组；只有在发出过 `SendReady` 后才会被调用
    fn pull_next_packet(&mut self) -> Option<Packet>;
    /// 按原始发送顺序、恰好一次地向上交付
    fn deliver(&mut self, packet: Packet);
}

/// 下层（物理层）
pub trait PhysicalLayer {
    /// 发出即不管：帧可能丢失、损坏、重复或乱序
    fn transmit(&mut self, frame: Frame);
    /// 取出下一个结构完好的帧（与 `FrameArrival` 事件一一对应）
    fn receive_next(&mut self) -> Option<Frame>;
}

/// 合并后的事件流；返回 None 表示外部已停止引擎
pub trait EventSource {
    fn wait_for_next_event(&mut self) -> Option<Signal>;
}

impl<I: Iterator<Item = Signal>> EventSource for I {
    fn wait_for_next_event(&mut self) -> Option<Signal> {
        self.next()
    }
}
