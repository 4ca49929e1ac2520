//! 扫描与测距数据类型

use crate::config::ScanConfig;

/// 一帧激光扫描
///
/// 下标 `0..N` 与角度线性对应，`N / 2` 定义为正前方。
/// 距离单位为米，`inf` 表示超出量程（视为空旷）。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeScan {
    /// 距离采样（米）
    pub ranges: Vec<f32>,

    /// 扫描消息声明的角分辨率（度/点），没有时为 `None`
    pub angle_increment_deg: Option<f32>,
}

impl RangeScan {
    /// 创建不带分辨率元数据的扫描
    pub fn new(ranges: Vec<f32>) -> Self {
        Self {
            ranges,
            angle_increment_deg: None,
        }
    }

    /// 创建带分辨率元数据的扫描
    pub fn with_increment(ranges: Vec<f32>, angle_increment_deg: f32) -> Self {
        Self {
            ranges,
            angle_increment_deg: Some(angle_increment_deg),
        }
    }

    /// 采样点数
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// 正前方的下标
    #[inline]
    pub fn midpoint(&self) -> usize {
        self.ranges.len() / 2
    }

    /// 决定本帧使用的角分辨率
    ///
    /// 扫描自带的分辨率有效（有限且为正）且配置允许时优先使用，
    /// 否则回落到配置值。
    pub fn resolve_resolution(&self, config: &ScanConfig) -> f32 {
        match self.angle_increment_deg {
            Some(declared)
                if config.prefer_declared_resolution && declared.is_finite() && declared > 0.0 =>
            {
                declared
            },
            _ => config.degrees_per_sample,
        }
    }
}

/// 单个侧向测距传感器的读数（米）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SideRange {
    pub meters: f32,
}

/// 左右两侧测距的快照
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SideRanges {
    pub left: SideRange,
    pub right: SideRange,
}
