//! 回放事件记录（JSON）
//!
//! 设计目标：
//! - **结构化**：用 JSON 事件而不是解析文本日志
//! - **轻量**：存内存，仿真结束一次性写出
//! - **可回放**：第一条永远是 `meta`，之后按虚拟时间排列

mod types;

pub use types::{VizEvent, VizEventKind, VizFrame, VizLogger, VizStationInfo};
