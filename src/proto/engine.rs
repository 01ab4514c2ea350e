//! 选择重传滑动窗口协议引擎
//!
//! 引擎是单线程、run-to-completion 的状态机：每次从事件源取出一个 [`Signal`]，
//! 把对应的状态转移执行完，再取下一个。窗口状态、缓冲区、定时器表都只归引擎所有，
//! 定时器回调和收发线程只能向事件队列投递，不能直接改状态。
//!
//! 机制：
//! - 累计确认捎带在每个发出的帧上（`ack = frame_expected - 1`）
//! - 接收方缓存窗口内的乱序帧，补齐空洞后按序交付
//! - 发现空洞或校验错误时发 NAK，同一空洞在下一次按序交付前只发一次
//! - 每个未确认帧一个重传定时器，外加一个延迟 ACK 定时器

use tracing::{debug, info, trace, warn};

use super::event::{Event, Signal};
use super::frame::{Frame, FrameKind, Packet};
use super::layer::{EventSource, NetworkLayer, PhysicalLayer};
use super::seq::{Seq, SeqSpace};
use super::timer::{TimerScheduler, TimerService};
use super::window::WindowBuffers;
use crate::config::ValidatedConfig;

/// 窗口边界与 NAK 抑制标志
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
    /// 发送窗口下沿：最早的已发送未确认序号
    pub ack_expected: Seq,
    /// 发送窗口上沿（不含）：下一个要分配的序号
    pub next_frame_to_send: Seq,
    /// 接收窗口下沿：仍在等待的最早序号
    pub frame_expected: Seq,
    /// 接收窗口上沿（不含）：`frame_expected + W`
    pub too_far: Seq,
    /// 已发送但未被累计确认的帧数，不超过 W
    pub nbuffered: u32,
    /// 自上次按序交付以来尚未发过 NAK
    pub no_nak: bool,
}

impl WindowState {
    fn new(space: SeqSpace) -> Self {
        Self {
            ack_expected: 0,
            next_frame_to_send: 0,
            frame_expected: 0,
            too_far: space.window(),
            nbuffered: 0,
            no_nak: true,
        }
    }
}

/// 引擎计数器
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub data_sent: u64,
    pub retransmissions: u64,
    pub fast_retransmits: u64,
    pub naks_sent: u64,
    pub acks_sent: u64,
    pub frames_received: u64,
    pub cksum_errors: u64,
    pub frames_discarded: u64,
    pub delivered: u64,
    pub stale_timers: u64,
    pub violations: u64,
}

pub struct Engine<N, P, T> {
    name: String,
    space: SeqSpace,
    state: WindowState,
    buffers: WindowBuffers,
    timers: TimerService<T>,
    net: N,
    phy: P,
    stats: EngineStats,
}

impl<N, P, T> Engine<N, P, T>
where
    N: NetworkLayer,
    P: PhysicalLayer,
    T: TimerScheduler,
{
    pub fn new(name: impl Into<String>, cfg: ValidatedConfig, net: N, phy: P, scheduler: T) -> Self {
        let space = cfg.space();
        Self {
            name: name.into(),
            space,
            state: WindowState::new(space),
            buffers: WindowBuffers::new(space),
            timers: TimerService::new(space, cfg.timeout(), cfg.ack_timeout(), scheduler),
            net,
            phy,
            stats: EngineStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn space(&self) -> SeqSpace {
        self.space
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn buffers(&self) -> &WindowBuffers {
        &self.buffers
    }

    pub fn timers(&self) -> &TimerService<T> {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerService<T> {
        &mut self.timers
    }

    pub fn network(&self) -> &N {
        &self.net
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.net
    }

    pub fn physical(&self) -> &P {
        &self.phy
    }

    pub fn physical_mut(&mut self) -> &mut P {
        &mut self.phy
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// 启动：把整个窗口的额度授予网络层
    pub fn start(&mut self) {
        let w = self.space.window();
        info!(station = %self.name, max_seq = self.space.max_seq(), window = w, "▶️  协议引擎启动");
        self.net.grant_credit(w);
    }

    /// 事件循环：直到事件源关闭才返回
    pub fn run<E: EventSource>(&mut self, source: &mut E) {
        self.start();
        while let Some(signal) = source.wait_for_next_event() {
            self.handle(signal);
        }
        info!(station = %self.name, stats = ?self.stats, "⏹️  事件源已关闭，引擎停止");
    }

    /// 处理一个信号，执行到底后返回
    #[tracing::instrument(skip(self), fields(station = %self.name))]
    pub fn handle(&mut self, signal: Signal) {
        let ev = match signal {
            Signal::Event(ev) => ev,
            Signal::Timer(fired) => match self.timers.accept(fired) {
                Some(ev) => ev,
                None => {
                    self.stats.stale_timers += 1;
                    trace!(?fired, "丢弃已取消/已重启的定时器");
                    return;
                }
            },
        };
        debug!(event = ?ev, state = ?self.state, "处理事件");
        match ev {
            Event::SendReady => self.on_send_ready(),
            Event::FrameArrival => self.on_frame_arrival(),
            Event::CksumErr => self.on_cksum_err(),
            Event::Timeout(seq) => self.on_timeout(seq),
            Event::AckTimeout => self.on_ack_timeout(),
        }
    }

    fn send_frame(&mut self, kind: FrameKind, frame_nr: Seq) {
        let ack = self.space.prev(self.state.frame_expected);
        let frame = match kind {
            FrameKind::Data => Frame::data(frame_nr, ack, self.buffers.get_out(frame_nr).clone()),
            FrameKind::Ack | FrameKind::Nak => Frame::control(kind, ack),
        };
        match kind {
            FrameKind::Data => self.stats.data_sent += 1,
            FrameKind::Nak => {
                self.state.no_nak = false;
                self.stats.naks_sent += 1;
            }
            FrameKind::Ack => self.stats.acks_sent += 1,
        }
        debug!(?kind, seq = frame.seq, ack, "发送帧");
        self.phy.transmit(frame);
        if kind == FrameKind::Data {
            self.timers.start_retransmit_timer(frame_nr);
        }
        // 任何帧都捎带了确认
        self.timers.stop_ack_timer();
    }

    fn on_send_ready(&mut self) {
        if self.state.nbuffered >= self.space.window() {
            self.stats.violations += 1;
            warn!(nbuffered = self.state.nbuffered, "发送窗口已满，网络层超额提交");
            return;
        }
        let Some(packet) = self.net.pull_next_packet() else {
            self.stats.violations += 1;
            warn!("SendReady 但网络层没有分组");
            return;
        };
        let seq = self.state.next_frame_to_send;
        self.state.nbuffered += 1;
        self.buffers.put_out(seq, packet);
        self.send_frame(FrameKind::Data, seq);
        self.state.next_frame_to_send = self.space.inc(seq);
    }

    fn on_frame_arrival(&mut self) {
        let Some(frame) = self.phy.receive_next() else {
            self.stats.violations += 1;
            warn!("FrameArrival 但物理层没有帧");
            return;
        };
        self.stats.frames_received += 1;
        trace!(kind = ?frame.kind, seq = frame.seq, ack = frame.ack, "收到帧");

        match frame.kind {
            FrameKind::Data => self.on_data(frame.seq, frame.payload.unwrap_or_default()),
            FrameKind::Nak => {
                let wanted = self.space.inc(frame.ack);
                if self.space.between(self.state.ack_expected, wanted, self.state.next_frame_to_send) {
                    self.stats.fast_retransmits += 1;
                    debug!(seq = wanted, "NAK 触发快速重传");
                    self.send_frame(FrameKind::Data, wanted);
                }
            }
            FrameKind::Ack => {}
        }

        while self
            .space
            .between(self.state.ack_expected, frame.ack, self.state.next_frame_to_send)
        {
            self.state.nbuffered -= 1;
            self.timers.stop_retransmit_timer(self.state.ack_expected);
            self.state.ack_expected = self.space.inc(self.state.ack_expected);
            self.net.grant_credit(1);
        }
    }

    fn on_data(&mut self, seq: Seq, payload: Packet) {
        if seq != self.state.frame_expected && self.state.no_nak {
            self.send_frame(FrameKind::Nak, 0);
        } else {
            self.timers.start_ack_timer();
        }

        let admitted = self
            .space
            .between(self.state.frame_expected, seq, self.state.too_far);
        if !admitted || self.buffers.is_arrived(seq) {
            self.stats.frames_discarded += 1;
            trace!(seq, admitted, "重复或窗口外的帧，丢弃");
            return;
        }

        self.buffers.mark_arrived(seq);
        self.buffers.put_in(seq, payload);
        for packet in self.buffers.drain_in_order(&mut self.state.frame_expected) {
            trace!(packet_id = packet.id, "按序交付");
            self.net.deliver(packet);
            self.stats.delivered += 1;
            self.state.no_nak = true;
            self.state.too_far = self.space.inc(self.state.too_far);
            self.timers.start_ack_timer();
        }
    }

    fn on_cksum_err(&mut self) {
        self.stats.cksum_errors += 1;
        if self.state.no_nak {
            self.send_frame(FrameKind::Nak, 0);
        }
    }

    fn on_timeout(&mut self, seq: Seq) {
        if !self
            .space
            .between(self.state.ack_expected, seq, self.state.next_frame_to_send)
        {
            self.stats.violations += 1;
            warn!(seq, "超时序号不在发送窗口内，忽略");
            return;
        }
        self.stats.retransmissions += 1;
        debug!(seq, "⏰ 重传超时");
        self.send_frame(FrameKind::Data, seq);
    }

    fn on_ack_timeout(&mut self) {
        self.send_frame(FrameKind::Ack, 0);
        self.timers.stop_ack_timer();
    }
}
