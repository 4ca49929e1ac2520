//! 检测器接口
//!
//! 人脸检测模型本身是外部能力：给一帧图像，返回零个或多个矩形框。
//! 这里只定义接口、图像帧类型，以及模型加载失败时的降级策略：
//! 加载失败记录错误后换成 [`DisabledDetector`]（永远检测不到），控制循环照常运行。

use crate::error::NodeError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info, warn};

/// 检测到的矩形框（像素坐标，左上角 + 尺寸）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// 矩形中心
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 * 0.5,
            self.y as f32 + self.height as f32 * 0.5,
        )
    }
}

/// 一帧相机图像
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,

    /// 像素编码（如 `bgr8`）
    pub encoding: String,

    /// 原始像素数据
    pub data: Vec<u8>,
}

/// 人脸检测器
///
/// 实现需要 `Send + Sync`：图像回调可能在任意线程上调用。
pub trait FaceDetector: Send + Sync {
    /// 检测一帧图像中的人脸
    fn detect(&self, image: &ImageFrame) -> Vec<BoundingBox>;
}

/// 永远检测不到任何东西的检测器
///
/// 模型缺失或加载失败时使用。
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDetector;

impl FaceDetector for DisabledDetector {
    fn detect(&self, _image: &ImageFrame) -> Vec<BoundingBox> {
        Vec::new()
    }
}

impl<F> FaceDetector for F
where
    F: Fn(&ImageFrame) -> Vec<BoundingBox> + Send + Sync,
{
    fn detect(&self, image: &ImageFrame) -> Vec<BoundingBox> {
        self(image)
    }
}

/// 加载检测器（只在启动时调用一次）
///
/// - 没有配置模型路径：记录警告，返回 [`DisabledDetector`]
/// - `loader` 返回错误：记录错误，返回 [`DisabledDetector`]
///
/// 两种情况都不会中止进程。
pub fn load_detector<F, D>(model_path: Option<&Path>, loader: F) -> Box<dyn FaceDetector>
where
    F: FnOnce(&Path) -> Result<D, NodeError>,
    D: FaceDetector + 'static,
{
    let Some(path) = model_path else {
        warn!("No detector model configured, presence tracking disabled");
        return Box::new(DisabledDetector);
    };

    match loader(path) {
        Ok(detector) => {
            info!("Detector model loaded from {}", path.display());
            Box::new(detector)
        },
        Err(e) => {
            error!("{}. Detector will never report a face.", e);
            Box::new(DisabledDetector)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> ImageFrame {
        ImageFrame {
            width: 640,
            height: 480,
            encoding: "bgr8".to_string(),
            data: vec![0; 16],
        }
    }

    #[test]
    fn test_disabled_detector_never_detects() {
        assert!(DisabledDetector.detect(&frame()).is_empty());
    }

    #[test]
    fn test_bounding_box_center() {
        let bbox = BoundingBox {
            x: 10,
            y: 20,
            width: 30,
            height: 40,
        };
        assert_eq!(bbox.center(), (25.0, 40.0));
    }

    #[test]
    fn test_closure_detector() {
        let detector = |image: &ImageFrame| {
            if image.width > 0 {
                vec![BoundingBox::default()]
            } else {
                Vec::new()
            }
        };
        assert_eq!(detector.detect(&frame()).len(), 1);
    }

    #[test]
    fn test_load_detector_without_path() {
        let detector = load_detector(None, |_| Ok(DisabledDetector));
        assert!(detector.detect(&frame()).is_empty());
    }

    #[test]
    fn test_load_detector_failure_degrades() {
        let detector = load_detector(Some(Path::new("/missing/face.xml")), |path| {
            Err::<DisabledDetector, _>(NodeError::DetectorLoad {
                path: path.display().to_string(),
                reason: "file not found".to_string(),
            })
        });
        assert!(detector.detect(&frame()).is_empty());
    }

    #[test]
    fn test_load_detector_success() {
        let detector = load_detector(Some(Path::new("/models/face.xml")), |_| {
            Ok(|_: &ImageFrame| vec![BoundingBox::default(); 2])
        });
        assert_eq!(detector.detect(&frame()).len(), 2);
    }
}
