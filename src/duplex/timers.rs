//! 仿真定时器调度

use std::time::Duration;

use crate::proto::{TimerFired, TimerKey, TimerScheduler};

/// 只记录武装请求，由世界转成虚拟时间上的 [`super::TimerExpire`] 事件。
///
/// 已经调度出去的到期事件无法撤回，靠 `TimerService` 的代号核验丢弃。
#[derive(Debug, Default)]
pub struct SimTimers {
    armed: Vec<(TimerFired, Duration)>,
}

impl SimTimers {
    pub fn take_armed(&mut self) -> Vec<(TimerFired, Duration)> {
        std::mem::take(&mut self.armed)
    }
}

impl TimerScheduler for SimTimers {
    fn arm(&mut self, fired: TimerFired, after: Duration) {
        self.armed.push((fired, after));
    }

    fn cancel(&mut self, key: TimerKey) {
        self.armed.retain(|(f, _)| f.key != key);
    }
}
