//! 双站滑动窗口协议（实时 tokio 运行时）
//!
//! 与 `swp_sim` 相同的场景，但定时器与信道延迟都用真实时间。

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use swp_rs::config::ProtocolConfig;
use swp_rs::link::{AppLayer, FaultModel};
use swp_rs::proto::Packet;
use swp_rs::runtime::spawn_duplex;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

#[derive(Debug, Parser)]
#[command(name = "swp-live", about = "选择重传滑动窗口协议：双站实时运行")]
struct Args {
    #[arg(long, default_value_t = 50)]
    packets: usize,
    #[arg(long, default_value_t = 50)]
    reverse_packets: usize,
    #[arg(long, default_value_t = 0.1)]
    loss: f64,
    #[arg(long, default_value_t = 0.05)]
    corrupt: f64,
    #[arg(long, default_value_t = 0.05)]
    duplicate: f64,
    #[arg(long, default_value_t = 0.1)]
    reorder: f64,
    #[arg(long, default_value_t = 5)]
    latency_ms: u64,
    #[arg(long, default_value_t = 20)]
    jitter_ms: u64,
    #[arg(long, default_value_t = 1)]
    seed: u64,
    #[arg(long, default_value_t = 7)]
    max_seq: u32,
    #[arg(long, default_value_t = 200)]
    timeout_ms: u64,
    #[arg(long, default_value_t = 100)]
    ack_timeout_ms: u64,
    /// 最长运行时间（毫秒）
    #[arg(long, default_value_t = 60_000)]
    deadline_ms: u64,
}

async fn collect(rx: &mut UnboundedReceiver<Packet>, want: usize, out: &mut Vec<Packet>) {
    while out.len() < want {
        match rx.recv().await {
            Some(p) => out.push(p),
            None => break,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();
    let proto = ProtocolConfig {
        max_seq: args.max_seq,
        window: None,
        timeout_ms: args.timeout_ms,
        ack_timeout_ms: args.ack_timeout_ms,
    };
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

    let [mut a, mut b] = match spawn_duplex(
        cfg,
        fault,
        args.seed,
        AppLayer::generated("a", args.packets),
        AppLayer::generated("b", args.reverse_packets),
    ) {
        Ok(stations) => stations,
        Err(e) => {
            eprintln!("error: invalid fault model: {e}");
            return ExitCode::from(2);
        }
    };

    let mut at_a = Vec::new();
    let mut at_b = Vec::new();
    let both = async {
        collect(&mut a.delivered, args.reverse_packets, &mut at_a).await;
        collect(&mut b.delivered, args.packets, &mut at_b).await;
    };
    if tokio::time::timeout(Duration::from_millis(args.deadline_ms), both)
        .await
        .is_err()
    {
        warn!(deadline_ms = args.deadline_ms, "到达截止时间，传输未完成");
    }

    let mut ok = true;
    for (station, got, want) in [(a, at_a, args.reverse_packets), (b, at_b, args.packets)] {
        let in_order = got.iter().enumerate().all(|(i, p)| p.id == i as u64);
        ok &= in_order && got.len() == want;
        let name = station.name.clone();
        match station.shutdown().await {
            Some(r) => println!(
                "station={} delivered={}/{} in_order={} data_sent={} retransmissions={} naks={} link_lost={}",
                name,
                got.len(),
                want,
                in_order,
                r.stats.data_sent,
                r.stats.retransmissions,
                r.stats.naks_sent,
                r.link.lost_frames,
            ),
            None => println!("station={name} delivered={}/{want} in_order={in_order} (engine task failed)", got.len()),
        }
    }

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
