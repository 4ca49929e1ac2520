//! 通道分析
//!
//! 从一帧激光扫描中计算两件事：
//!
//! 1. **能否前进**：正前方固定角度窗口内是否全部远于安全距离（近距离）
//! 2. **转向角度**：离正前方最近的、足够宽的空旷通道方向（中距离）
//!
//! 两个函数都是纯函数，不持有状态；[`CorridorAnalyzer`] 负责把配置和
//! 扫描元数据接到一起，并在输入异常时记录警告后继续工作。
//!
//! # 角度约定
//!
//! 偏移角 = `(中点下标 − 候选下标) × 每点角度`，正值表示通道在左侧。

use crate::config::{CorridorConfig, FusionConfig, SafetyConfig, ScanConfig};
use crate::scan::RangeScan;
use std::ops::Range;
use tracing::{debug, warn};

/// 一帧扫描的导航结论
///
/// 两个字段总是由同一帧扫描成对产生。默认值是"保持"：
/// 不能前进，偏移为 0。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NavigationVerdict {
    /// 正前方窗口内没有过近的障碍
    pub can_advance: bool,

    /// 到最近空旷通道的偏移角（度），没有通道时为 0
    pub steering_offset_deg: f32,
}

impl NavigationVerdict {
    /// 保持原地的结论
    pub const HOLD: Self = Self {
        can_advance: false,
        steering_offset_deg: 0.0,
    };
}

/// 计算以中点为中心、单侧 `half_window` 个点的安全窗口
///
/// 窗口为 `[mid − half_window, mid + half_window)`，并钳位到 `[0, len)`。
/// 返回的布尔值表示是否发生了钳位（即参数与扫描长度不匹配）。
pub fn clamp_window(len: usize, half_window: usize) -> (Range<usize>, bool) {
    let mid = len / 2;
    let start = mid.saturating_sub(half_window);
    let end = mid.saturating_add(half_window).min(len);
    let clamped = half_window > mid || mid + half_window > len;
    (start..end, clamped)
}

/// 安全窗口检查的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyCheck {
    /// 窗口内没有过近或无效的采样
    pub clear: bool,

    /// 实际检查的下标范围（已钳位）
    pub window: Range<usize>,

    /// 窗口参数与扫描长度不匹配，发生了钳位
    pub clamped: bool,
}

/// 检查正前方窗口，并在钳位时记录配置警告
///
/// NaN 采样无法证明前方安全，与过近同样处理。
pub fn check_safety_window(ranges: &[f32], half_window: usize, safe_distance: f32) -> SafetyCheck {
    let (window, clamped) = clamp_window(ranges.len(), half_window);
    if clamped {
        warn!(
            "Safety half-window of {} samples does not fit a {}-sample scan, clamped to {:?}",
            half_window,
            ranges.len(),
            window
        );
    }

    let clear = ranges[window.clone()].iter().all(|&r| r >= safe_distance);
    SafetyCheck {
        clear,
        window,
        clamped,
    }
}

/// 正前方窗口内是否全部不小于 `safe_distance`
///
/// 只要窗口内任一采样严格小于安全距离（或为 NaN）就返回 `false`。
/// 窗口超出扫描范围时先钳位再判断，并记录配置警告。
pub fn safe_to_advance(ranges: &[f32], half_window: usize, safe_distance: f32) -> bool {
    check_safety_window(ranges, half_window, safe_distance).clear
}

/// 所有空旷通道的中心下标（从左到右）
///
/// 宽度为 `width` 的窗口内每个采样都 `>= clear_distance` 时，
/// 窗口中心 `start + (width − 1) / 2` 是一个候选。
/// 单遍扫描，用连续空旷点计数代替逐窗口检查。
fn corridor_centers(
    ranges: &[f32],
    width: usize,
    clear_distance: f32,
) -> impl Iterator<Item = usize> + '_ {
    let center_offset = width.saturating_sub(1) / 2;
    let mut run = 0usize;

    ranges.iter().enumerate().filter_map(move |(i, &r)| {
        if r >= clear_distance {
            run += 1;
        } else {
            run = 0;
        }

        if width > 0 && run >= width {
            Some(i + 1 - width + center_offset)
        } else {
            None
        }
    })
}

#[inline]
fn index_to_angle(mid: usize, index: usize, degrees_per_sample: f32) -> f32 {
    (mid as f32 - index as f32) * degrees_per_sample
}

/// 找到离正前方最近的空旷通道，返回偏移角（度）
///
/// - 距离中点相同的两个候选取下标较小者（先遇到的）
/// - 没有任何空旷通道时返回 `0.0`（直行）
pub fn find_clear_corridor(
    ranges: &[f32],
    width: usize,
    clear_distance: f32,
    degrees_per_sample: f32,
) -> f32 {
    let mid = ranges.len() / 2;

    let mut best: Option<(usize, usize)> = None;
    for center in corridor_centers(ranges, width, clear_distance) {
        let distance = mid.abs_diff(center);
        match best {
            Some((best_distance, _)) if distance >= best_distance => {},
            _ => best = Some((distance, center)),
        }
    }

    best.map(|(_, center)| index_to_angle(mid, center, degrees_per_sample))
        .unwrap_or(0.0)
}

/// 所有空旷通道的偏移角（度），按下标从左到右
pub fn clear_corridor_angles(
    ranges: &[f32],
    width: usize,
    clear_distance: f32,
    degrees_per_sample: f32,
) -> Vec<f32> {
    let mid = ranges.len() / 2;
    corridor_centers(ranges, width, clear_distance)
        .map(|center| index_to_angle(mid, center, degrees_per_sample))
        .collect()
}

/// 一帧扫描的分析结果与输入异常
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanAnalysis {
    pub verdict: NavigationVerdict,

    /// 安全窗口被钳位到扫描范围内
    pub window_clamped: bool,

    /// 采样数与配置的期望值不符
    pub length_mismatch: bool,
}

/// 通道分析器
///
/// 持有扫描几何、安全窗口和通道参数，把一帧 [`RangeScan`] 转成 [`NavigationVerdict`]。
#[derive(Debug, Clone)]
pub struct CorridorAnalyzer {
    scan: ScanConfig,
    safety: SafetyConfig,
    corridor: CorridorConfig,
}

impl CorridorAnalyzer {
    pub fn new(scan: ScanConfig, safety: SafetyConfig, corridor: CorridorConfig) -> Self {
        Self {
            scan,
            safety,
            corridor,
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(
            config.scan.clone(),
            config.safety.clone(),
            config.corridor.clone(),
        )
    }

    /// 分析一帧扫描
    ///
    /// 采样数与期望不符只记录警告，仍按解析出的分辨率处理；
    /// 空扫描直接给出保持结论。
    pub fn analyze(&self, scan: &RangeScan) -> NavigationVerdict {
        self.inspect(scan).verdict
    }

    /// 分析一帧扫描，同时返回过程中发现的输入异常
    pub fn inspect(&self, scan: &RangeScan) -> ScanAnalysis {
        let length_mismatch = scan.len() != self.scan.expected_samples;
        if length_mismatch {
            warn!(
                "Scan has {} samples, expected {}; angles may be misestimated",
                scan.len(),
                self.scan.expected_samples
            );
        }
        if scan.is_empty() {
            warn!("Empty scan received, holding position");
            return ScanAnalysis {
                verdict: NavigationVerdict::HOLD,
                window_clamped: false,
                length_mismatch,
            };
        }

        let degrees_per_sample = scan.resolve_resolution(&self.scan);
        let half_window = self.safety.half_window_samples(degrees_per_sample);
        if half_window == 0 {
            warn!(
                "Safety window of {} deg covers no sample at {} deg/sample, holding position",
                self.safety.window_angle_deg, degrees_per_sample
            );
            return ScanAnalysis {
                verdict: NavigationVerdict::HOLD,
                window_clamped: false,
                length_mismatch,
            };
        }

        let safety = check_safety_window(&scan.ranges, half_window, self.safety.safe_distance_m);
        let steering_offset_deg = find_clear_corridor(
            &scan.ranges,
            self.corridor.width_samples,
            self.corridor.clear_distance_m,
            degrees_per_sample,
        );

        if self.corridor.log_candidates {
            let angles = clear_corridor_angles(
                &scan.ranges,
                self.corridor.width_samples,
                self.corridor.clear_distance_m,
                degrees_per_sample,
            );
            debug!("Clear corridor candidates (deg): {:?}", angles);
        }
        debug!(
            can_advance = safety.clear,
            "Degrees to turn = {:.2}", steering_offset_deg
        );

        ScanAnalysis {
            verdict: NavigationVerdict {
                can_advance: safety.clear,
                steering_offset_deg,
            },
            window_clamped: safety.clamped,
            length_mismatch,
        }
    }
}

impl Default for CorridorAnalyzer {
    fn default() -> Self {
        Self::from_config(&FusionConfig::default())
    }
}
