//! 运动仲裁
//!
//! 每个控制周期读取一次共享状态快照，决定发出运动指令还是保持。
//! 保持时不发布任何指令，底盘维持上一次收到的速度。

use crate::config::{FusionConfig, MotionConfig};
use crate::corridor::NavigationVerdict;
use crate::scan::SideRanges;

/// 底盘运动指令
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionCommand {
    /// 线速度（m/s）
    pub linear_velocity: f64,

    /// 角速度（rad/s），正值向左
    pub angular_velocity: f64,
}

/// 一个控制周期读到的全部输入
///
/// 三个字段分别来自三个独立的临界区，彼此之间不保证是同一时刻的。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlSnapshot {
    pub side_ranges: SideRanges,
    pub verdict: NavigationVerdict,
    pub detection_count: u8,
}

/// 运动仲裁器（bang-bang 转向）
#[derive(Debug, Clone)]
pub struct MotionArbiter {
    forward_speed: f64,
    turn_rate: f64,
    presence_threshold: u8,
}

impl MotionArbiter {
    pub fn new(motion: &MotionConfig, presence_threshold: u8) -> Self {
        Self {
            forward_speed: motion.forward_speed,
            turn_rate: motion.turn_rate.abs(),
            presence_threshold,
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(&config.motion, config.presence.greet_threshold)
    }

    /// 根据快照决定本周期的指令
    ///
    /// - 前方有近障碍，或有人在场：返回 `None`（不发布）
    /// - 否则以固定速度前进；偏移为正（通道在左）时角速度取负，
    ///   偏移为负时取正，偏移为 0 时直行。转向幅值固定，与偏移大小无关。
    pub fn decide(&self, snapshot: &ControlSnapshot) -> Option<MotionCommand> {
        if !snapshot.verdict.can_advance || snapshot.detection_count > self.presence_threshold {
            return None;
        }

        let offset = snapshot.verdict.steering_offset_deg;
        let angular_velocity = if offset > 0.0 {
            -self.turn_rate
        } else if offset < 0.0 {
            self.turn_rate
        } else {
            0.0
        };

        Some(MotionCommand {
            linear_velocity: self.forward_speed,
            angular_velocity,
        })
    }
}

impl Default for MotionArbiter {
    fn default() -> Self {
        Self::from_config(&FusionConfig::default())
    }
}
