//! 传感器回调与控制周期入口
//!
//! [`Node`] 把融合核心接到外部世界：每个传感器回调可以在自己的线程上并发调用，
//! 控制线程周期性调用 [`Node::tick`]。`Node` 本身是 `Send + Sync`，
//! 通常放在 `Arc` 里共享。

use crate::detector::{BoundingBox, FaceDetector, ImageFrame};
use crate::notifier::Notifier;
use crate::transport::{SensorMessage, image_from_message, scan_from_message};
use komodo_fusion::{
    ControlSnapshot, CorridorAnalyzer, FusionConfig, FusionState, MotionArbiter, MotionCommand,
    NavigationVerdict, PresenceUpdate, RangeScan,
};
use std::sync::Arc;
use tracing::{info, trace};

/// 机器人节点
pub struct Node {
    state: Arc<FusionState>,
    analyzer: CorridorAnalyzer,
    arbiter: MotionArbiter,
    detector: Box<dyn FaceDetector>,
    notifier: Arc<dyn Notifier>,
}

impl Node {
    /// 创建节点
    ///
    /// 检测器只在这里装配一次，之后每帧复用。
    pub fn new(
        config: &FusionConfig,
        detector: Box<dyn FaceDetector>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: Arc::new(FusionState::new(config)),
            analyzer: CorridorAnalyzer::from_config(config),
            arbiter: MotionArbiter::from_config(config),
            detector,
            notifier,
        }
    }

    /// 共享状态
    pub fn state(&self) -> &Arc<FusionState> {
        &self.state
    }

    /// 左侧测距回调
    pub fn on_left_range(&self, meters: f32) {
        self.state.ranges.set_left(meters);
    }

    /// 右侧测距回调
    pub fn on_right_range(&self, meters: f32) {
        self.state.ranges.set_right(meters);
    }

    /// 激光扫描回调
    ///
    /// 分析在锁外完成，结论成对写入。
    pub fn on_scan(&self, scan: &RangeScan) -> NavigationVerdict {
        let verdict = self.analyzer.analyze(scan);
        let previous = self.state.verdict.store(verdict);

        if previous.can_advance && !verdict.can_advance {
            info!("Stop, cannot advance");
        } else if !previous.can_advance && verdict.can_advance {
            info!("Path ahead is clear");
        }

        verdict
    }

    /// 相机图像回调
    pub fn on_image(&self, image: &ImageFrame) -> PresenceUpdate {
        let faces = self.detector.detect(image);
        self.on_detections(&faces)
    }

    /// 检测结果回调
    ///
    /// 计数更新在 presence 临界区内完成；需要问候时，在锁释放之后才触发提示。
    pub fn on_detections(&self, faces: &[BoundingBox]) -> PresenceUpdate {
        let update = self.state.presence.observe(!faces.is_empty());

        if update.greet {
            info!(faces = faces.len(), "Person in view for {} frames, greeting", update.count);
            self.notifier.notify();
        }

        update
    }

    /// 分发一条入站消息
    pub fn handle(&self, message: &SensorMessage) {
        match message {
            SensorMessage::LeftRange { range, .. } => self.on_left_range(*range),
            SensorMessage::RightRange { range, .. } => self.on_right_range(*range),
            SensorMessage::Scan {
                ranges,
                angle_increment_deg,
            } => {
                self.on_scan(&scan_from_message(ranges, *angle_increment_deg));
            },
            SensorMessage::Image {
                width,
                height,
                encoding,
                data,
            } => {
                self.on_image(&image_from_message(*width, *height, encoding, data));
            },
            SensorMessage::Detections { boxes } => {
                self.on_detections(boxes);
            },
        }
    }

    /// 读取当前快照
    pub fn snapshot(&self) -> ControlSnapshot {
        self.state.snapshot()
    }

    /// 一个控制周期：读快照，仲裁，返回要发布的指令（保持时为 `None`）
    pub fn tick(&self) -> Option<MotionCommand> {
        let snapshot = self.state.snapshot();
        trace!(
            left = snapshot.side_ranges.left.meters,
            right = snapshot.side_ranges.right.meters,
            can_advance = snapshot.verdict.can_advance,
            offset = snapshot.verdict.steering_offset_deg,
            faces = snapshot.detection_count,
            "control tick"
        );
        self.arbiter.decide(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DisabledDetector;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingNotifier {
        count: AtomicUsize,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn node_with(notifier: Arc<CountingNotifier>) -> Node {
        Node::new(
            &FusionConfig::default(),
            Box::new(DisabledDetector),
            notifier,
        )
    }

    fn open_scan() -> RangeScan {
        RangeScan::new(vec![4.0; 512])
    }

    #[test]
    fn test_holds_before_first_scan() {
        let node = node_with(Arc::default());
        assert_eq!(node.tick(), None);
    }

    #[test]
    fn test_open_scan_drives_forward() {
        let node = node_with(Arc::default());
        node.on_scan(&open_scan());
        let cmd = node.tick().unwrap();
        assert_eq!(cmd.linear_velocity, 0.1);
        assert_eq!(cmd.angular_velocity, 0.0);
    }

    #[test]
    fn test_blocked_scan_holds() {
        let node = node_with(Arc::default());
        let mut ranges = vec![4.0; 512];
        ranges[256] = 0.2;
        let verdict = node.on_scan(&RangeScan::new(ranges));
        assert!(!verdict.can_advance);
        assert_eq!(node.tick(), None);
    }

    #[test]
    fn test_corridor_on_left_turns_right() {
        let node = node_with(Arc::default());
        // 安全窗口 [85, 427) 内全部 1.0（足够安全但不够空旷），
        // 左侧 [0, 130) 为 3.0 形成通道
        let mut ranges = vec![1.0; 512];
        for r in &mut ranges[0..130] {
            *r = 3.0;
        }
        let verdict = node.on_scan(&RangeScan::new(ranges));
        assert!(verdict.can_advance);
        assert!(verdict.steering_offset_deg > 0.0);

        let cmd = node.tick().unwrap();
        assert_eq!(cmd.angular_velocity, -0.6);
    }

    #[test]
    fn test_person_greeted_once_and_robot_stops() {
        let notifier = Arc::new(CountingNotifier::default());
        let node = node_with(notifier.clone());
        node.on_scan(&open_scan());

        let face = [BoundingBox::default()];
        for _ in 0..20 {
            node.on_detections(&face);
        }
        assert_eq!(notifier.count.load(Ordering::SeqCst), 1);
        assert_eq!(node.tick(), None);

        // 一帧无人 → 计数 5，恢复前进，问候重新就绪
        node.on_detections(&[]);
        assert!(node.tick().is_some());
        node.on_detections(&face);
        assert_eq!(notifier.count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_side_ranges_in_snapshot() {
        let node = node_with(Arc::default());
        node.on_left_range(0.7);
        node.on_right_range(1.1);
        let snapshot = node.snapshot();
        assert_eq!(snapshot.side_ranges.left.meters, 0.7);
        assert_eq!(snapshot.side_ranges.right.meters, 1.1);
    }

    #[test]
    fn test_handle_dispatches_messages() {
        let notifier = Arc::new(CountingNotifier::default());
        let node = node_with(notifier.clone());

        node.handle(&SensorMessage::LeftRange {
            range: 0.3,
            stamp: Some(1.0),
        });
        node.handle(&SensorMessage::Scan {
            ranges: vec![None; 512],
            angle_increment_deg: Some(0.35),
        });
        for _ in 0..6 {
            node.handle(&SensorMessage::Detections {
                boxes: vec![BoundingBox::default()],
            });
        }
        // DisabledDetector：图像帧算作无人
        node.handle(&SensorMessage::Image {
            width: 4,
            height: 4,
            encoding: "bgr8".to_string(),
            data: vec![0; 48],
        });

        let snapshot = node.snapshot();
        assert_eq!(snapshot.side_ranges.left.meters, 0.3);
        assert!(snapshot.verdict.can_advance);
        assert_eq!(snapshot.detection_count, 5);
        assert_eq!(notifier.count.load(Ordering::SeqCst), 1);
    }
}
