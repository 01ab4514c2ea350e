//! 仿真事件 trait

use super::simulator::Simulator;
use super::world::World;

/// 仿真事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
pub trait SimEvent: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}
