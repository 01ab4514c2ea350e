//! 实时运行时（tokio）
//!
//! 每个站一个无界 mpsc 通道作为唯一的有序事件队列，引擎在独立任务里逐个处理信号。
//! 生产者彼此并发：
//! - 定时器是 `tokio::time::sleep` 任务，到期只投递 [`Signal::Timer`]，取消即 abort；
//! - 信道把每份帧副本放进延迟任务，到期后写入对端收件箱并投递 `FrameArrival`（损坏则投递 `CksumErr`，
//!   已被后发帧超越的副本直接丢弃）；
//! - 网络层在拿到额度时投递 `SendReady`。
//!
//! 引擎状态只在引擎任务内部修改。abort 之前已经入队的旧定时器由代号核验丢弃。

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ValidatedConfig;
use crate::link::{AppLayer, ArrivalGate, Channel, FaultError, FaultModel, LinkStats};
use crate::proto::{
    Engine, EngineStats, Event, Frame, NetworkLayer, Packet, PhysicalLayer, Signal, TimerFired,
    TimerKey, TimerScheduler,
};

pub type SignalTx = mpsc::UnboundedSender<Signal>;
pub type SignalRx = mpsc::UnboundedReceiver<Signal>;

/// 基于 tokio 任务的定时器
pub struct TokioTimers {
    tx: SignalTx,
    rt: Handle,
    tasks: HashMap<TimerKey, JoinHandle<()>>,
}

impl TokioTimers {
    /// 必须在 tokio 运行时上下文中调用
    pub fn new(tx: SignalTx) -> Self {
        Self {
            tx,
            rt: Handle::current(),
            tasks: HashMap::new(),
        }
    }
}

impl TimerScheduler for TokioTimers {
    fn arm(&mut self, fired: TimerFired, after: Duration) {
        let tx = self.tx.clone();
        let task = self.rt.spawn(async move {
            tokio::time::sleep(after).await;
            // 引擎已停止时通道关闭，忽略即可
            let _ = tx.send(Signal::Timer(fired));
        });
        if let Some(old) = self.tasks.insert(fired.key, task) {
            old.abort();
        }
    }

    fn cancel(&mut self, key: TimerKey) {
        if let Some(task) = self.tasks.remove(&key) {
            task.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// 网络层：包装 [`AppLayer`]，把 `SendReady` 通知直接投递到事件队列
pub struct LiveNetwork {
    app: AppLayer,
    tx: SignalTx,
    delivered_tx: mpsc::UnboundedSender<Packet>,
}

impl LiveNetwork {
    fn flush_ready(&mut self) {
        for _ in 0..self.app.take_ready() {
            let _ = self.tx.send(Signal::Event(Event::SendReady));
        }
    }

    pub fn app(&self) -> &AppLayer {
        &self.app
    }
}

impl NetworkLayer for LiveNetwork {
    fn grant_credit(&mut self, n: u32) {
        self.app.grant_credit(n);
        self.flush_ready();
    }

    fn pull_next_packet(&mut self) -> Option<Packet> {
        self.app.pull_next_packet()
    }

    fn deliver(&mut self, packet: Packet) {
        let _ = self.delivered_tx.send(packet.clone());
        self.app.deliver(packet);
    }
}

/// 收件箱与过期检查放在同一把锁下，检查通过的副本按到达顺序入队
#[derive(Debug, Default)]
struct Inbound {
    frames: VecDeque<Frame>,
    gate: ArrivalGate,
}

type Inbox = Arc<Mutex<Inbound>>;

fn lock(inbox: &Inbox) -> MutexGuard<'_, Inbound> {
    inbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 物理层：发出的每份副本由延迟任务送到对端
pub struct LivePhy {
    inbox: Inbox,
    peer_inbox: Inbox,
    peer_tx: SignalTx,
    channel: Channel,
    rt: Handle,
}

impl LivePhy {
    pub fn link_stats(&self) -> &LinkStats {
        &self.channel.stats
    }

    /// 发往本站、因过期被丢弃的副本数
    pub fn expired_arrivals(&self) -> u64 {
        lock(&self.inbox).gate.expired()
    }
}

impl PhysicalLayer for LivePhy {
    fn transmit(&mut self, frame: Frame) {
        let deliveries = self.channel.transmit();
        if deliveries.is_empty() {
            debug!(seq = frame.seq, kind = ?frame.kind, "💥 信道丢帧");
        }
        for d in deliveries {
            let peer_inbox = Arc::clone(&self.peer_inbox);
            let peer_tx = self.peer_tx.clone();
            let frame = frame.clone();
            self.rt.spawn(async move {
                tokio::time::sleep(d.delay).await;
                let signal = {
                    let mut inbound = lock(&peer_inbox);
                    if !inbound.gate.admit(d.frame_index) {
                        return;
                    }
                    if d.corrupted {
                        Event::CksumErr
                    } else {
                        inbound.frames.push_back(frame);
                        Event::FrameArrival
                    }
                };
                let _ = peer_tx.send(Signal::Event(signal));
            });
        }
    }

    fn receive_next(&mut self) -> Option<Frame> {
        lock(&self.inbox).frames.pop_front()
    }
}

pub type LiveEngine = Engine<LiveNetwork, LivePhy, TokioTimers>;

/// 站停止后的汇总
#[derive(Debug, Clone)]
pub struct LiveReport {
    pub name: String,
    pub stats: EngineStats,
    pub link: LinkStats,
    /// 发往本站、因过期被丢弃的副本数
    pub expired_arrivals: u64,
    pub delivered: Vec<Packet>,
}

/// 一个运行中的站
pub struct StationHandle {
    pub name: String,
    /// 按交付顺序收到的分组
    pub delivered: mpsc::UnboundedReceiver<Packet>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<LiveReport>,
}

impl StationHandle {
    /// 通知引擎停止并等待汇总
    pub async fn shutdown(mut self) -> Option<LiveReport> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await.ok()
    }
}

async fn drive(mut engine: LiveEngine, mut rx: SignalRx, mut shutdown: oneshot::Receiver<()>) -> LiveReport {
    engine.start();
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            signal = rx.recv() => match signal {
                Some(signal) => engine.handle(signal),
                None => break,
            },
        }
    }
    info!(station = engine.name(), stats = ?engine.stats(), "⏹️  站已停止");
    LiveReport {
        name: engine.name().to_string(),
        stats: engine.stats().clone(),
        link: engine.physical().link_stats().clone(),
        expired_arrivals: engine.physical().expired_arrivals(),
        delivered: engine.network().app().delivered().to_vec(),
    }
}

/// 启动两个互联的站 A、B；必须在 tokio 运行时上下文中调用
pub fn spawn_duplex(
    cfg: ValidatedConfig,
    fault: FaultModel,
    seed: u64,
    app_a: AppLayer,
    app_b: AppLayer,
) -> Result<[StationHandle; 2], FaultError> {
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();
    let inbox_a: Inbox = Arc::default();
    let inbox_b: Inbox = Arc::default();
    let channel_a = Channel::new(fault.clone(), seed)?;
    let channel_b = Channel::new(fault, seed.wrapping_add(1))?;

    let a = spawn_station(
        "A",
        cfg,
        app_a,
        (tx_a.clone(), rx_a),
        LivePhy {
            inbox: Arc::clone(&inbox_a),
            peer_inbox: Arc::clone(&inbox_b),
            peer_tx: tx_b.clone(),
            channel: channel_a,
            rt: Handle::current(),
        },
    );
    let b = spawn_station(
        "B",
        cfg,
        app_b,
        (tx_b, rx_b),
        LivePhy {
            inbox: inbox_b,
            peer_inbox: inbox_a,
            peer_tx: tx_a,
            channel: channel_b,
            rt: Handle::current(),
        },
    );
    Ok([a, b])
}

fn spawn_station(
    name: &str,
    cfg: ValidatedConfig,
    app: AppLayer,
    (tx, rx): (SignalTx, SignalRx),
    phy: LivePhy,
) -> StationHandle {
    let (delivered_tx, delivered) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let net = LiveNetwork {
        app,
        tx: tx.clone(),
        delivered_tx,
    };
    let engine = Engine::new(name, cfg, net, phy, TokioTimers::new(tx));
    StationHandle {
        name: name.to_string(),
        delivered,
        shutdown: Some(shutdown_tx),
        task: tokio::spawn(drive(engine, rx, shutdown_rx)),
    }
}
