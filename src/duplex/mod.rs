//! 双站仿真
//!
//! 两个站（A、B）各运行一个协议引擎，通过两条单向故障信道互发帧，全部在虚拟时间里推进。
//! 引擎的协作者在仿真里只做记录：物理层把待发帧放进发件箱，定时器把武装请求记下来，
//! 网络层记下 `SendReady` 通知；每个事件执行完后由 [`DuplexWorld`] 统一取走并调度成仿真事件。

mod events;
mod phy;
mod timers;
mod world;

pub use events::{FrameArrive, NetworkReady, StationStart, TimerExpire};
pub use phy::SimPhy;
pub use timers::SimTimers;
pub use world::{DuplexWorld, SimEngine, StationId};
