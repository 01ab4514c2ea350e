//! 链路两端的协作者
//!
//! 协议核心之外的部分：带故障注入的信道模型、上层应用（网络层）以及链路统计。
//! 离散事件仿真（`duplex`）与实时运行时（`runtime`）共用这些组件。

mod app;
mod fault;
mod stats;

pub use app::AppLayer;
pub use fault::{ArrivalGate, Channel, Delivery, FaultError, FaultModel};
pub use stats::LinkStats;
