//! 世界 trait

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由业务层实现（例如双站链路）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// 每个事件执行完之后调用
    fn on_tick(&mut self, _sim: &mut Simulator) {}
    /// 返回 true 时仿真提前结束
    fn is_done(&self) -> bool {
        false
    }
}
