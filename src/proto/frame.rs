//! 帧与分组
//!
//! 分组（[`Packet`]）是上层载荷；帧（[`Frame`]）是链路上传输的单元，
//! 携带类型、序号、捎带确认以及可选的分组。

use serde::{Deserialize, Serialize};

use super::seq::Seq;

/// 上层分组：对协议引擎而言是不透明的载荷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// 由网络层分配的编号（仅用于观测与校验）
    pub id: u64,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn new(id: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Data,
    Ack,
    Nak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// DATA 帧的序号；ACK/NAK 帧固定为 0
    pub seq: Seq,
    /// 捎带的累计确认：`frame_expected - 1`
    pub ack: Seq,
    /// 只有 DATA 帧携带分组
    pub payload: Option<Packet>,
}

impl Frame {
    pub fn data(seq: Seq, ack: Seq, packet: Packet) -> Self {
        Self {
            kind: FrameKind::Data,
            seq,
            ack,
            payload: Some(packet),
        }
    }

    pub fn control(kind: FrameKind, ack: Seq) -> Self {
        Self {
            kind,
            seq: 0,
            ack,
            payload: None,
        }
    }
}
