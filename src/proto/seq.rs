//! 序号运算
//!
//! 序号空间为 `[0, max_seq]`，所有运算对 `max_seq + 1` 取模。

/// 序号
pub type Seq = u32;

/// 有限回绕的序号空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
    modulus: u32,
}

impl SeqSpace {
    pub fn new(max_seq: u32) -> Self {
        Self {
            modulus: max_seq.saturating_add(1),
        }
    }

    pub fn max_seq(&self) -> Seq {
        self.modulus - 1
    }

    /// 窗口大小：恰好是序号空间的一半
    pub fn window(&self) -> u32 {
        self.modulus / 2
    }

    /// 序号在窗口缓冲区中的槽位
    pub fn slot(&self, seq: Seq) -> usize {
        (seq % self.window().max(1)) as usize
    }

    pub fn inc(&self, seq: Seq) -> Seq {
        (seq % self.modulus + 1) % self.modulus
    }

    pub fn prev(&self, seq: Seq) -> Seq {
        (seq % self.modulus + self.modulus - 1) % self.modulus
    }

    /// `x` 是否落在环上的半开区间 `[low, high)` 内
    pub fn between(&self, low: Seq, x: Seq, high: Seq) -> bool {
        (low <= x && x < high) || (high < low && low <= x) || (x < high && high < low)
    }
}
