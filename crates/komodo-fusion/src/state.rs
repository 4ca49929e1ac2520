//! 共享状态
//!
//! 传感器回调在各自的线程上写入，控制周期读取。状态被拆成三个相互独立的临界区，
//! 每个区只暴露整体读写操作，外部拿不到内部字段的引用。
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ FusionState                  │
//! ├──────────────────────────────┤
//! │ ranges   ← Mutex<SideRanges>        (左/右测距回调写)
//! │ verdict  ← Mutex<NavigationVerdict> (扫描回调写，成对更新)
//! │ presence ← Mutex<PresenceTracker>   (图像回调读-改-写)
//! └──────────────────────────────┘
//! ```
//!
//! # 锁顺序
//!
//! 任何时刻最多持有一把锁。[`FusionState::snapshot`] 按 ranges → verdict → presence
//! 的顺序依次获取、依次释放。
//!
//! 使用 `parking_lot::Mutex`，回调线程 panic 不会让锁进入 Poison 状态。

use crate::arbiter::ControlSnapshot;
use crate::config::FusionConfig;
use crate::corridor::NavigationVerdict;
use crate::presence::{PresenceState, PresenceTracker, PresenceUpdate};
use crate::scan::{SideRange, SideRanges};
use parking_lot::Mutex;

/// 左右测距采样器
#[derive(Debug, Default)]
pub struct RangeSampler {
    inner: Mutex<SideRanges>,
}

impl RangeSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入左侧读数
    pub fn set_left(&self, meters: f32) {
        self.inner.lock().left = SideRange { meters };
    }

    /// 写入右侧读数
    pub fn set_right(&self, meters: f32) {
        self.inner.lock().right = SideRange { meters };
    }

    /// 读取两侧读数
    pub fn get(&self) -> SideRanges {
        *self.inner.lock()
    }
}

/// 导航结论单元
///
/// `can_advance` 与 `steering_offset_deg` 在同一临界区内一起写入，
/// 读者不会看到来自两帧扫描的混合结果。
#[derive(Debug)]
pub struct VerdictCell {
    inner: Mutex<NavigationVerdict>,
}

impl VerdictCell {
    /// 创建结论单元，初始为保持
    ///
    /// 第一帧扫描到达之前机器人不会移动。
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(NavigationVerdict::HOLD),
        }
    }

    /// 写入新结论，返回旧结论
    pub fn store(&self, verdict: NavigationVerdict) -> NavigationVerdict {
        std::mem::replace(&mut *self.inner.lock(), verdict)
    }

    pub fn load(&self) -> NavigationVerdict {
        *self.inner.lock()
    }
}

impl Default for VerdictCell {
    fn default() -> Self {
        Self::new()
    }
}

/// 出现状态单元
#[derive(Debug)]
pub struct PresenceCell {
    inner: Mutex<PresenceTracker>,
}

impl PresenceCell {
    pub fn new(tracker: PresenceTracker) -> Self {
        Self {
            inner: Mutex::new(tracker),
        }
    }

    /// 在锁内完成一次读-改-写
    ///
    /// 返回值离开这里时锁已释放；`greet` 为真表示本次更新赢得了本轮问候，
    /// 调用方此时再去触发提示。
    pub fn observe(&self, detected: bool) -> PresenceUpdate {
        self.inner.lock().observe(detected)
    }

    pub fn detection_count(&self) -> u8 {
        self.inner.lock().detection_count()
    }

    pub fn state(&self) -> PresenceState {
        self.inner.lock().state()
    }
}

impl Default for PresenceCell {
    fn default() -> Self {
        Self::new(PresenceTracker::default())
    }
}

/// 全部共享状态
///
/// 通常放在 `Arc` 里由各回调线程和控制线程共享。
#[derive(Debug, Default)]
pub struct FusionState {
    pub ranges: RangeSampler,
    pub verdict: VerdictCell,
    pub presence: PresenceCell,
}

impl FusionState {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            ranges: RangeSampler::new(),
            verdict: VerdictCell::new(),
            presence: PresenceCell::new(PresenceTracker::new(&config.presence)),
        }
    }

    /// 读取控制周期所需的快照
    ///
    /// 三次独立读取，每次只持有一把锁。
    pub fn snapshot(&self) -> ControlSnapshot {
        let side_ranges = self.ranges.get();
        let verdict = self.verdict.load();
        let detection_count = self.presence.detection_count();

        ControlSnapshot {
            side_ranges,
            verdict,
            detection_count,
        }
    }
}
