//! 协议核心模块
//!
//! 序号运算、窗口缓冲区、定时器服务与事件驱动的协议引擎。

mod engine;
mod event;
mod frame;
mod layer;
mod seq;
mod timer;
mod window;

pub use engine::{Engine, EngineStats, WindowState};
pub use event::{Event, EventKind, Signal};
pub use frame::{Frame, FrameKind, Packet};
pub use layer::{EventSource, NetworkLayer, PhysicalLayer};
pub use seq::{Seq, SeqSpace};
pub use timer::{TimerFired, TimerKey, TimerScheduler, TimerService};
pub use window::WindowBuffers;
