use serde::{Deserialize, Serialize};

use crate::link::FaultModel;
use crate::proto::{Frame, FrameKind, Seq, TimerKey};

/// 回放事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VizEventKind {
    /// 协议参数与信道模型（t=0 的第一条事件）
    Meta {
        stations: Vec<VizStationInfo>,
        max_seq: Seq,
        window: u32,
        timeout_ns: u64,
        ack_timeout_ns: u64,
        fault: FaultModel,
    },
    /// 引擎把帧交给物理层
    SendFrame(VizFrame),
    /// 信道丢弃
    FrameLost(VizFrame),
    /// 信道复制出第二份
    FrameDuplicated(VizFrame),
    /// 到达时已被同方向后发的帧超越，按丢失处理
    FrameExpired(VizFrame),
    /// 到达时校验失败（接收端看到 CKSUM_ERR）
    FrameCorrupted(VizFrame),
    /// 完好到达
    RecvFrame(VizFrame),
    /// 向上层交付
    Deliver { packet_id: u64 },
    /// 定时器到期；`stale` 表示已被取消或重启，引擎丢弃
    TimerFired { timer: TimerKey, stale: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizStationInfo {
    pub id: usize,
    pub name: String,
    /// 该站要发送的分组数
    pub packets: usize,
}

/// 帧的可视化字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizFrame {
    pub frame_kind: FrameKind,
    pub seq: Seq,
    pub ack: Seq,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_id: Option<u64>,
}

impl From<&Frame> for VizFrame {
    fn from(f: &Frame) -> Self {
        Self {
            frame_kind: f.kind,
            seq: f.seq,
            ack: f.ack,
            packet_id: f.payload.as_ref().map(|p| p.id),
        }
    }
}

/// 一个可回放的事件（JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    /// 事件发生所在的站
    pub station: Option<usize>,
    #[serde(flatten)]
    pub kind: VizEventKind,
}

/// 一个简单的事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct VizLogger {
    pub events: Vec<VizEvent>,
}

impl VizLogger {
    pub fn push(&mut self, ev: VizEvent) {
        self.events.push(ev);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}
