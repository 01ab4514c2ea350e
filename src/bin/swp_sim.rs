//! 双站滑动窗口协议仿真（虚拟时间）
//!
//! A、B 互相发送分组，信道按给定概率丢帧/损坏/复制/乱序，检查双方是否按序、恰好一次收齐。

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use swp_rs::config::ProtocolConfig;
use swp_rs::duplex::{DuplexWorld, StationId};
use swp_rs::link::{AppLayer, FaultModel};
use swp_rs::sim::{SimTime, Simulator};
use swp_rs::viz::VizLogger;

#[derive(Debug, Parser)]
#[command(name = "swp-sim", about = "选择重传滑动窗口协议：双站故障信道仿真")]
struct Args {
    /// A 发往 B 的分组数
    #[arg(long, default_value_t = 100)]
    packets: usize,

    /// B 发往 A 的分组数
    #[arg(long, default_value_t = 0)]
    reverse_packets: usize,

    /// 丢帧概率
    #[arg(long, default_value_t = 0.1)]
    loss: f64,

    /// 损坏概率
    #[arg(long, default_value_t = 0.05)]
    corrupt: f64,

    /// 复制概率
    #[arg(long, default_value_t = 0.05)]
    duplicate: f64,

    /// 乱序概率
    #[arg(long, default_value_t = 0.1)]
    reorder: f64,

    /// 单向传播时延（毫秒）
    #[arg(long, default_value_t = 20)]
    latency_ms: u64,

    /// 乱序时追加的最大延迟（毫秒）
    #[arg(long, default_value_t = 50)]
    jitter_ms: u64,

    /// 随机种子
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// 协议参数 JSON 文件；下面的单项参数会覆盖其中的值
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_seq: Option<u32>,

    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long)]
    ack_timeout_ms: Option<u64>,

    /// 仿真运行到多少毫秒（虚拟时间）
    #[arg(long, default_value_t = 3_600_000)]
    until_ms: u64,

    /// 输出回放 JSON 事件文件；不填则不生成
    #[arg(long)]
    viz_json: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut proto = match &args.config {
        Some(path) => match ProtocolConfig::from_path(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("error: {}: {e}", path.display());
                return ExitCode::from(2);
            }
        },
        None => ProtocolConfig::default(),
    };
    if let Some(v) = args.max_seq {
        proto.max_seq = v;
    }
    if let Some(v) = args.timeout_ms {
        proto.timeout_ms = v;
    }
    if let Some(v) = args.ack_timeout_ms {
        proto.ack_timeout_ms = v;
    }
    let cfg = match proto.validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: invalid protocol config: {e}");
            return ExitCode::from(2);
        }
    };

    let fault = FaultModel {
        loss: args.loss,
        corrupt: args.corrupt,
        duplicate: args.duplicate,
        reorder: args.reorder,
        latency_ms: args.latency_ms,
        jitter_ms: args.jitter_ms,
    };
    let mut world = match DuplexWorld::new(
        cfg,
        fault,
        args.seed,
        AppLayer::generated("a", args.packets),
        AppLayer::generated("b", args.reverse_packets),
    ) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("error: invalid fault model: {e}");
            return ExitCode::from(2);
        }
    };

    if args.viz_json.is_some() {
        world.viz = Some(VizLogger::default());
        world.emit_viz_meta();
    }

    let mut sim = Simulator::default();
    world.schedule_start(&mut sim);
    sim.run_until(SimTime::from_millis(args.until_ms), &mut world);

    if let Some(path) = &args.viz_json {
        if let Some(v) = world.viz.take() {
            let json = v.to_json().expect("serialize viz events");
            fs::write(path, json).expect("write viz json");
            eprintln!("wrote viz events to {}", path.display());
        }
    }

    println!(
        "done @ {:?} events={} complete={}",
        sim.now(),
        sim.executed(),
        world.is_complete()
    );
    let mut ok = world.is_complete();
    for id in [StationId::A, StationId::B] {
        let engine = world.station(id);
        let expected = world.station(id.peer()).network().total();
        let delivered = engine.network().delivered();
        let in_order = delivered
            .iter()
            .enumerate()
            .all(|(i, p)| p.id == i as u64);
        ok &= in_order && delivered.len() == expected;
        let s = engine.stats();
        let link = &world.channel(id).stats;
        let expired = world.gate(id).expired();
        println!(
            "station={} delivered={}/{} in_order={} data_sent={} retransmissions={} fast_retransmits={} naks={} acks={} cksum_errors={} discarded={} stale_timers={} link_sent={} link_lost={} link_corrupted={} link_duplicated={} link_expired={}",
            id.name(),
            delivered.len(),
            expected,
            in_order,
            s.data_sent,
            s.retransmissions,
            s.fast_retransmits,
            s.naks_sent,
            s.acks_sent,
            s.cksum_errors,
            s.frames_discarded,
            s.stale_timers,
            link.sent_frames,
            link.lost_frames,
            link.corrupted_frames,
            link.duplicated_frames,
            expired,
        );
    }

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
