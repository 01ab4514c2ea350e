//! 信道统计

use serde::Serialize;

/// 单向信道统计
#[derive(Debug, Default, Clone, Serialize)]
pub struct LinkStats {
    pub sent_frames: u64,
    pub lost_frames: u64,
    pub corrupted_frames: u64,
    pub duplicated_frames: u64,
    pub delivered_frames: u64,
}
