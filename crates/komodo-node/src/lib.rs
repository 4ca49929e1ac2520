//! # Komodo Node - 传感器回调与控制循环
//!
//! 在 [`komodo_fusion`] 之上提供运行时：
//!
//! - `node` - 传感器回调入口（可从任意线程并发调用）
//! - `control` - 固定频率控制循环（独立线程，`spin_sleep` 定时）
//! - `notifier` - 问候提示（专用工作线程，调用方永不阻塞）
//! - `detector` - 人脸检测器接口及加载失败降级
//! - `transport` - 出站指令发布接口、入站消息的 JSON 表示
//!
//! # 线程模型
//!
//! ```text
//! 左测距线程 ─┐
//! 右测距线程 ─┼─► Node (Arc) ──► FusionState ◄── 控制线程 (20Hz) ──► MotionSink
//! 扫描线程   ─┤                      │
//! 图像线程   ─┘                      └─(锁外)─► 提示线程 ──► aplay
//! ```

pub mod control;
pub mod detector;
mod error;
pub mod node;
pub mod notifier;
pub mod transport;

pub use control::{ControlLoop, LoopConfig, LoopStats, run_control_loop};
pub use detector::{BoundingBox, DisabledDetector, FaceDetector, ImageFrame, load_detector};
pub use error::NodeError;
pub use node::Node;
pub use notifier::{CueAction, Notifier, PlayerCommand, SoundNotifier};
pub use transport::{ChannelSink, MotionSink, SensorMessage, TwistMessage};
