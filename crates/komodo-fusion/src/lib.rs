//! # Komodo Fusion - 传感器融合与运动决策核心
//!
//! 本 crate 只包含纯逻辑和受保护的共享状态，不创建线程、不做 I/O（配置文件加载除外）。
//!
//! ## 包含模块
//!
//! - `corridor` - 安全窗口检查与空旷通道搜索（纯函数）
//! - `presence` - 人脸出现去抖状态机
//! - `arbiter` - 每周期的运动仲裁
//! - `state` - 三个独立临界区组成的共享状态
//! - `config` - TOML 配置
//!
//! ## 数据流
//!
//! ```text
//! 左/右测距回调 ──► RangeSampler
//! 扫描回调 ──► CorridorAnalyzer ──► VerdictCell
//! 图像回调 ──► 检测器 ──► PresenceCell ──► (锁外) 提示音
//! 控制周期 ──► FusionState::snapshot ──► MotionArbiter ──► MotionCommand
//! ```

pub mod arbiter;
pub mod config;
pub mod corridor;
mod error;
pub mod presence;
pub mod scan;
pub mod state;

pub use arbiter::{ControlSnapshot, MotionArbiter, MotionCommand};
pub use config::FusionConfig;
pub use corridor::{
    CorridorAnalyzer, NavigationVerdict, SafetyCheck, ScanAnalysis, check_safety_window,
    clamp_window, clear_corridor_angles, find_clear_corridor, safe_to_advance,
};
pub use error::FusionError;
pub use presence::{PresenceState, PresenceTracker, PresenceUpdate};
pub use scan::{RangeScan, SideRange, SideRanges};
pub use state::{FusionState, PresenceCell, RangeSampler, VerdictCell};
