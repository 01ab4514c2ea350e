//! 双站仿真世界

use std::any::Any;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::events::{FrameArrive, NetworkReady, StationStart, TimerExpire};
use super::phy::SimPhy;
use super::timers::SimTimers;
use crate::config::ValidatedConfig;
use crate::link::{AppLayer, ArrivalGate, Channel, FaultError, FaultModel};
use crate::proto::Engine;
use crate::sim::{SimTime, Simulator, World};
use crate::viz::{VizEvent, VizEventKind, VizFrame, VizLogger, VizStationInfo};

pub type SimEngine = Engine<AppLayer, SimPhy, SimTimers>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StationId(pub usize);

impl StationId {
    pub const A: StationId = StationId(0);
    pub const B: StationId = StationId(1);

    pub fn peer(self) -> StationId {
        StationId(1 - self.0)
    }

    pub fn name(self) -> &'static str {
        if self.0 == 0 { "A" } else { "B" }
    }
}

pub struct DuplexWorld {
    cfg: ValidatedConfig,
    stations: [SimEngine; 2],
    /// `channels[i]`：从站 i 发往对端的单向信道
    channels: [Channel; 2],
    /// `gates[i]`：从站 i 发出、在对端到达时的过期检查
    gates: [ArrivalGate; 2],
    /// 已写入回放记录的交付数
    viz_delivered: [usize; 2],
    pub viz: Option<VizLogger>,
}

impl DuplexWorld {
    pub fn new(
        cfg: ValidatedConfig,
        fault: FaultModel,
        seed: u64,
        app_a: AppLayer,
        app_b: AppLayer,
    ) -> Result<Self, FaultError> {
        let station = |id: StationId, app: AppLayer| {
            Engine::new(id.name(), cfg, app, SimPhy::default(), SimTimers::default())
        };
        Ok(Self {
            cfg,
            stations: [station(StationId::A, app_a), station(StationId::B, app_b)],
            channels: [
                Channel::new(fault.clone(), seed)?,
                Channel::new(fault, seed.wrapping_add(1))?,
            ],
            gates: Default::default(),
            viz_delivered: [0; 2],
            viz: None,
        })
    }

    pub fn station(&self, id: StationId) -> &SimEngine {
        &self.stations[id.0]
    }

    pub(crate) fn station_mut(&mut self, id: StationId) -> &mut SimEngine {
        &mut self.stations[id.0]
    }

    pub fn channel(&self, from: StationId) -> &Channel {
        &self.channels[from.0]
    }

    pub fn gate(&self, from: StationId) -> &ArrivalGate {
        &self.gates[from.0]
    }

    /// 一份从 `from` 发出的副本到达对端；过期返回 false
    pub(crate) fn admit(&mut self, from: StationId, frame_index: u64) -> bool {
        self.gates[from.0].admit(frame_index)
    }

    /// 两个站都在 t=0 启动
    pub fn schedule_start(&self, sim: &mut Simulator) {
        sim.schedule(SimTime::ZERO, StationStart { station: StationId::A });
        sim.schedule(SimTime::ZERO, StationStart { station: StationId::B });
    }

    /// 每个站都收齐了对端的全部分组，且自己发出的帧都已被确认
    pub fn is_complete(&self) -> bool {
        [StationId::A, StationId::B].into_iter().all(|id| {
            let want = self.station(id.peer()).network().total();
            let engine = self.station(id);
            engine.network().delivered().len() >= want
                && engine.network().is_complete()
                && engine.state().nbuffered == 0
        })
    }

    pub fn emit_viz_meta(&mut self) {
        let Some(viz) = self.viz.as_mut() else {
            return;
        };
        let stations = self
            .stations
            .iter()
            .enumerate()
            .map(|(id, e)| VizStationInfo {
                id,
                name: e.name().to_string(),
                packets: e.network().total(),
            })
            .collect();
        viz.push(VizEvent {
            t_ns: 0,
            station: None,
            kind: VizEventKind::Meta {
                stations,
                max_seq: self.cfg.space().max_seq(),
                window: self.cfg.window(),
                timeout_ns: SimTime::from_duration(self.cfg.timeout()).0,
                ack_timeout_ns: SimTime::from_duration(self.cfg.ack_timeout()).0,
                fault: self.channels[0].model().clone(),
            },
        });
    }

    pub(crate) fn viz_push(&mut self, t: SimTime, station: StationId, kind: VizEventKind) {
        if let Some(viz) = self.viz.as_mut() {
            viz.push(VizEvent {
                t_ns: t.0,
                station: Some(station.0),
                kind,
            });
        }
    }

    /// 取走一个站的协作者积攒的输出，转成仿真事件
    fn pump(&mut self, id: StationId, sim: &mut Simulator) {
        let now = sim.now();

        let ready = self.station_mut(id).network_mut().take_ready();
        for _ in 0..ready {
            sim.schedule(now, NetworkReady { station: id });
        }

        for (fired, after) in self.station_mut(id).timers_mut().scheduler_mut().take_armed() {
            trace!(station = id.name(), ?fired, ?after, "调度定时器");
            sim.schedule_after(after, TimerExpire { station: id, fired });
        }

        for frame in self.station_mut(id).physical_mut().take_outbox() {
            let vf = VizFrame::from(&frame);
            self.viz_push(now, id, VizEventKind::SendFrame(vf.clone()));
            let deliveries = self.channels[id.0].transmit();
            if deliveries.is_empty() {
                debug!(station = id.name(), seq = frame.seq, kind = ?frame.kind, "💥 信道丢帧");
                self.viz_push(now, id, VizEventKind::FrameLost(vf));
                continue;
            }
            if deliveries.len() > 1 {
                self.viz_push(now, id, VizEventKind::FrameDuplicated(vf));
            }
            for d in deliveries {
                sim.schedule_after(
                    d.delay,
                    FrameArrive {
                        to: id.peer(),
                        frame: frame.clone(),
                        frame_index: d.frame_index,
                        corrupted: d.corrupted,
                    },
                );
            }
        }

        if self.viz.is_some() {
            let delivered = self.station(id).network().delivered();
            let new_ids = delivered[self.viz_delivered[id.0]..]
                .iter()
                .map(|p| p.id)
                .collect::<Vec<_>>();
            self.viz_delivered[id.0] = delivered.len();
            for packet_id in new_ids {
                self.viz_push(now, id, VizEventKind::Deliver { packet_id });
            }
        }
    }
}

impl World for DuplexWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_tick(&mut self, sim: &mut Simulator) {
        self.pump(StationId::A, sim);
        self.pump(StationId::B, sim);
    }

    fn is_done(&self) -> bool {
        self.is_complete()
    }
}
