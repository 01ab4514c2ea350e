//! 双站仿真事件
//!
//! 每个事件只向某个站的引擎投递一个信号；引擎产生的输出在 `on_tick` 中统一取走。

use tracing::trace;

use super::world::{DuplexWorld, StationId};
use crate::proto::{Event, Frame, Signal, TimerFired};
use crate::sim::{SimEvent, Simulator, World};
use crate::viz::{VizEventKind, VizFrame};

fn duplex(world: &mut dyn World) -> &mut DuplexWorld {
    world
        .as_any_mut()
        .downcast_mut::<DuplexWorld>()
        .expect("world must be DuplexWorld")
}

/// 启动一个站：授予网络层初始额度
#[derive(Debug)]
pub struct StationStart {
    pub station: StationId,
}

impl SimEvent for StationStart {
    fn execute(self: Box<Self>, _sim: &mut Simulator, world: &mut dyn World) {
        duplex(world).station_mut(self.station).start();
    }
}

/// 网络层有分组可发
#[derive(Debug)]
pub struct NetworkReady {
    pub station: StationId,
}

impl SimEvent for NetworkReady {
    fn execute(self: Box<Self>, _sim: &mut Simulator, world: &mut dyn World) {
        duplex(world)
            .station_mut(self.station)
            .handle(Signal::Event(Event::SendReady));
    }
}

/// 一份帧副本到达某站；过期副本直接丢弃，损坏的副本只表现为校验错误
#[derive(Debug)]
pub struct FrameArrive {
    pub to: StationId,
    pub frame: Frame,
    pub frame_index: u64,
    pub corrupted: bool,
}

impl SimEvent for FrameArrive {
    #[tracing::instrument(skip(self, sim, world), fields(to = self.to.name(), seq = self.frame.seq, corrupted = self.corrupted))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let FrameArrive {
            to,
            frame,
            frame_index,
            corrupted,
        } = *self;
        let w = duplex(world);
        let vf = VizFrame::from(&frame);
        if !w.admit(to.peer(), frame_index) {
            trace!(frame_index, "⌛ 副本已被后发的帧超越，丢弃");
            w.viz_push(sim.now(), to, VizEventKind::FrameExpired(vf));
            return;
        }
        if corrupted {
            trace!("📨 损坏帧到达");
            w.viz_push(sim.now(), to, VizEventKind::FrameCorrupted(vf));
            w.station_mut(to).handle(Signal::Event(Event::CksumErr));
            return;
        }
        trace!("📨 帧到达");
        w.viz_push(sim.now(), to, VizEventKind::RecvFrame(vf));
        let engine = w.station_mut(to);
        engine.physical_mut().push_arrival(frame);
        engine.handle(Signal::Event(Event::FrameArrival));
    }
}

/// 定时器到期
#[derive(Debug)]
pub struct TimerExpire {
    pub station: StationId,
    pub fired: TimerFired,
}

impl SimEvent for TimerExpire {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TimerExpire { station, fired } = *self;
        let w = duplex(world);
        let engine = w.station_mut(station);
        let stale_before = engine.stats().stale_timers;
        engine.handle(Signal::Timer(fired));
        let stale = engine.stats().stale_timers > stale_before;
        w.viz_push(
            sim.now(),
            station,
            VizEventKind::TimerFired {
                timer: fired.key,
                stale,
            },
        );
    }
}
