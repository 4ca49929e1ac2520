//! 人脸出现去抖状态机
//!
//! 每帧检测结果驱动一个钳位计数器：
//!
//! - 检测到：`count = min(count + 1, max_count)`
//! - 未检测到：`count = max(count − 1, 0)`，同时清除 `greeted`
//!
//! 计数严格大于 `greet_threshold` 且尚未问候时触发一次问候。
//! `greeted` 只有在出现一帧"无人"后才会复位，所以一次持续出现只问候一次。

use crate::config::PresenceConfig;

/// 一次更新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceUpdate {
    /// 更新后的计数
    pub count: u8,

    /// 本次更新是否需要触发问候
    pub greet: bool,
}

/// 出现状态（计数 + 问候标志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresenceState {
    pub detection_count: u8,
    pub greeted: bool,
}

/// 去抖状态机
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    state: PresenceState,
    max_count: u8,
    greet_threshold: u8,
}

impl PresenceTracker {
    pub fn new(config: &PresenceConfig) -> Self {
        Self {
            state: PresenceState::default(),
            max_count: config.max_count,
            greet_threshold: config.greet_threshold,
        }
    }

    /// 输入一帧检测结果
    ///
    /// 返回值中的 `greet` 为真时，调用方负责触发提示（且应在释放锁之后）。
    pub fn observe(&mut self, detected: bool) -> PresenceUpdate {
        let state = &mut self.state;
        if detected {
            state.detection_count = state.detection_count.saturating_add(1).min(self.max_count);
        } else {
            state.detection_count = state.detection_count.saturating_sub(1);
            state.greeted = false;
        }

        let greet = state.detection_count > self.greet_threshold && !state.greeted;
        if greet {
            state.greeted = true;
        }

        PresenceUpdate {
            count: state.detection_count,
            greet,
        }
    }

    /// 当前计数
    #[inline]
    pub fn detection_count(&self) -> u8 {
        self.state.detection_count
    }

    /// 当前状态快照
    #[inline]
    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// 是否认为有人在场（计数超过阈值）
    #[inline]
    pub fn is_present(&self) -> bool {
        self.state.detection_count > self.greet_threshold
    }

    pub fn greet_threshold(&self) -> u8 {
        self.greet_threshold
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(&PresenceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(tracker: &mut PresenceTracker, detected: bool, times: usize) -> usize {
        (0..times).filter(|_| tracker.observe(detected).greet).count()
    }

    #[test]
    fn test_counts_up_and_caps() {
        let mut tracker = PresenceTracker::default();
        for expected in 1..=6 {
            assert_eq!(tracker.observe(true).count, expected);
        }
        assert_eq!(tracker.observe(true).count, 6);
        assert_eq!(tracker.detection_count(), 6);
    }

    #[test]
    fn test_counts_down_and_floors() {
        let mut tracker = PresenceTracker::default();
        assert_eq!(tracker.observe(false).count, 0);
        tracker.observe(true);
        tracker.observe(true);
        assert_eq!(tracker.observe(false).count, 1);
        assert_eq!(tracker.observe(false).count, 0);
        assert_eq!(tracker.observe(false).count, 0);
    }

    #[test]
    fn test_greets_once_on_sixth_detection() {
        let mut tracker = PresenceTracker::default();
        for _ in 0..5 {
            assert!(!tracker.observe(true).greet);
        }
        let update = tracker.observe(true);
        assert!(update.greet);
        assert_eq!(update.count, 6);
        assert!(tracker.state().greeted);

        // 持续出现不再重复问候
        assert_eq!(feed(&mut tracker, true, 50), 0);
    }

    #[test]
    fn test_single_miss_rearms_greeting() {
        let mut tracker = PresenceTracker::default();
        assert_eq!(feed(&mut tracker, true, 6), 1);
        assert_eq!(feed(&mut tracker, false, 1), 0);
        assert!(!tracker.state().greeted);
        assert_eq!(tracker.detection_count(), 5);
        assert_eq!(feed(&mut tracker, true, 6), 1);
    }

    #[test]
    fn test_flicker_never_greets() {
        let mut tracker = PresenceTracker::default();
        let mut greetings = 0;
        for i in 0..100 {
            if tracker.observe(i % 2 == 0).greet {
                greetings += 1;
            }
        }
        assert_eq!(greetings, 0);
        assert!(tracker.detection_count() <= 1);
    }

    #[test]
    fn test_is_present_tracks_threshold() {
        let mut tracker = PresenceTracker::default();
        feed(&mut tracker, true, 5);
        assert!(!tracker.is_present());
        tracker.observe(true);
        assert!(tracker.is_present());
        tracker.observe(false);
        assert!(!tracker.is_present());
    }

    #[test]
    fn test_custom_thresholds() {
        let mut tracker = PresenceTracker::new(&PresenceConfig {
            max_count: 3,
            greet_threshold: 1,
        });
        assert!(!tracker.observe(true).greet);
        assert!(tracker.observe(true).greet);
        assert_eq!(feed(&mut tracker, true, 10), 0);
        assert_eq!(tracker.detection_count(), 3);
    }
}
