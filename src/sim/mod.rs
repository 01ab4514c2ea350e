//! 离散事件仿真模块
//!
//! 虚拟时间、调度事件、世界与仿真器。协议引擎在这里以确定性的虚拟时间运行，
//! 同一时刻入队的事件严格按入队顺序执行。

mod event;
mod scheduled_event;
mod simulator;
mod time;
mod world;

pub use event::SimEvent;
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulator;
pub use time::SimTime;
pub use world::World;
