//! 传输层边界
//!
//! 发布/订阅传输本身不在本 crate 内。这里定义：
//!
//! - [`MotionSink`]：出站运动指令的发布接口
//! - [`ChannelSink`]：基于 `crossbeam_channel` 的实现（测试、CLI 使用）
//! - [`SensorMessage`]：入站传感器消息的 JSON 表示（用于录制回放）

use crate::detector::{BoundingBox, ImageFrame};
use crate::error::NodeError;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use komodo_fusion::{MotionCommand, RangeScan};
use serde::{Deserialize, Serialize};

/// 运动指令发布接口
pub trait MotionSink: Send {
    /// 发布一条指令
    ///
    /// 不得长时间阻塞控制线程。
    fn publish(&mut self, command: MotionCommand) -> Result<(), NodeError>;
}

/// 基于有界通道的指令发布器
///
/// 通道满时丢弃最新指令并计数，不阻塞控制线程。
pub struct ChannelSink {
    tx: Sender<MotionCommand>,
    dropped: u64,
}

impl ChannelSink {
    /// 创建发布器和接收端
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Receiver<MotionCommand>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx, dropped: 0 }, rx)
    }

    /// 因通道满而丢弃的指令数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl MotionSink for ChannelSink {
    fn publish(&mut self, command: MotionCommand) -> Result<(), NodeError> {
        match self.tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                tracing::warn!("Command channel full, dropped {} commands so far", self.dropped);
                Ok(())
            },
            Err(TrySendError::Disconnected(_)) => Err(NodeError::ChannelClosed),
        }
    }
}

/// 出站指令的线格式（线速度 / 角速度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwistMessage {
    pub linear_x: f64,
    pub angular_z: f64,
}

impl From<MotionCommand> for TwistMessage {
    fn from(command: MotionCommand) -> Self {
        Self {
            linear_x: command.linear_velocity,
            angular_z: command.angular_velocity,
        }
    }
}

/// 入站传感器消息
///
/// 每行一条 JSON，`type` 字段区分种类：
///
/// ```json
/// {"type":"left_range","range":0.82,"stamp":12.5}
/// {"type":"scan","ranges":[1.2,null,0.9],"angle_increment_deg":0.35}
/// {"type":"detections","boxes":[{"x":10,"y":20,"width":64,"height":64}]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorMessage {
    /// 左侧测距（米）
    LeftRange {
        range: f32,
        #[serde(default)]
        stamp: Option<f64>,
    },

    /// 右侧测距（米）
    RightRange {
        range: f32,
        #[serde(default)]
        stamp: Option<f64>,
    },

    /// 激光扫描；`null` 表示无回波（超出量程）
    Scan {
        ranges: Vec<Option<f32>>,
        #[serde(default)]
        angle_increment_deg: Option<f32>,
    },

    /// 相机图像
    Image {
        width: u32,
        height: u32,
        encoding: String,
        #[serde(default)]
        data: Vec<u8>,
    },

    /// 已完成检测的一帧结果（跳过检测器）
    Detections { boxes: Vec<BoundingBox> },
}

impl SensorMessage {
    /// 解析一行 JSON
    pub fn from_json(line: &str) -> Result<Self, NodeError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// 把扫描消息转换为 [`RangeScan`]（无回波 → `inf`）
pub fn scan_from_message(ranges: &[Option<f32>], angle_increment_deg: Option<f32>) -> RangeScan {
    RangeScan {
        ranges: ranges
            .iter()
            .map(|r| r.unwrap_or(f32::INFINITY))
            .collect(),
        angle_increment_deg,
    }
}

/// 把图像消息转换为 [`ImageFrame`]
pub fn image_from_message(width: u32, height: u32, encoding: &str, data: &[u8]) -> ImageFrame {
    ImageFrame {
        width,
        height,
        encoding: encoding.to_string(),
        data: data.to_vec(),
    }
}
