//! # 融合配置
//!
//! 所有阈值、扫描几何参数和控制常量都集中在 [`FusionConfig`] 中，
//! 可以从 TOML 文件加载，缺省字段回落到机器人上实测过的默认值。
//!
//! ```toml
//! [scan]
//! expected_samples = 512
//! degrees_per_sample = 0.35
//!
//! [safety]
//! window_angle_deg = 120.0
//! safe_distance_m = 0.40
//!
//! [motion]
//! frequency_hz = 20.0
//! ```

use crate::error::FusionError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 融合配置（顶层）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// 激光扫描几何参数
    pub scan: ScanConfig,

    /// 近距离安全检查
    pub safety: SafetyConfig,

    /// 通道搜索
    pub corridor: CorridorConfig,

    /// 人脸出现去抖
    pub presence: PresenceConfig,

    /// 运动输出
    pub motion: MotionConfig,

    /// 检测器模型
    pub detector: DetectorConfig,

    /// 提示音
    pub notifier: NotifierConfig,
}

impl FusionConfig {
    /// 从 TOML 文件加载配置
    ///
    /// 加载后会调用 [`validate`](Self::validate)。
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FusionError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self, FusionError> {
        let config: FusionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 检查配置是否自洽
    pub fn validate(&self) -> Result<(), FusionError> {
        if !(self.scan.degrees_per_sample > 0.0) {
            return Err(FusionError::InvalidConfig(format!(
                "scan.degrees_per_sample must be > 0 (got {})",
                self.scan.degrees_per_sample
            )));
        }
        if self.scan.expected_samples == 0 {
            return Err(FusionError::InvalidConfig(
                "scan.expected_samples must be > 0".to_string(),
            ));
        }
        if !(self.safety.window_angle_deg > 0.0) {
            return Err(FusionError::InvalidConfig(format!(
                "safety.window_angle_deg must be > 0 (got {})",
                self.safety.window_angle_deg
            )));
        }
        if self.safety.half_window_samples(self.scan.degrees_per_sample) == 0 {
            return Err(FusionError::InvalidConfig(format!(
                "safety.window_angle_deg {} covers no sample at {} deg/sample",
                self.safety.window_angle_deg, self.scan.degrees_per_sample
            )));
        }
        if !(self.safety.safe_distance_m > 0.0) {
            return Err(FusionError::InvalidConfig(format!(
                "safety.safe_distance_m must be > 0 (got {})",
                self.safety.safe_distance_m
            )));
        }
        if !(self.corridor.clear_distance_m > 0.0) {
            return Err(FusionError::InvalidConfig(format!(
                "corridor.clear_distance_m must be > 0 (got {})",
                self.corridor.clear_distance_m
            )));
        }
        if self.corridor.width_samples == 0 {
            return Err(FusionError::InvalidConfig(
                "corridor.width_samples must be > 0".to_string(),
            ));
        }
        if self.presence.greet_threshold >= self.presence.max_count {
            return Err(FusionError::InvalidConfig(format!(
                "presence.greet_threshold ({}) must be below presence.max_count ({}), \
                 otherwise the greeting can never fire",
                self.presence.greet_threshold, self.presence.max_count
            )));
        }
        if !(self.motion.frequency_hz > 0.0) {
            return Err(FusionError::InvalidConfig(format!(
                "motion.frequency_hz must be > 0 (got {})",
                self.motion.frequency_hz
            )));
        }
        Ok(())
    }
}

/// 激光扫描几何参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 每帧期望的采样点数
    pub expected_samples: usize,

    /// 每个采样点的角度（度）
    pub degrees_per_sample: f32,

    /// 扫描消息自带分辨率时是否优先使用
    pub prefer_declared_resolution: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            // Hokuyo: 512 点 × 0.35° ≈ 180° 视场
            expected_samples: 512,
            degrees_per_sample: 0.35,
            prefer_declared_resolution: true,
        }
    }
}

/// 近距离安全检查参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// 检查窗口的总角度（度），以正前方为中心
    pub window_angle_deg: f32,

    /// 窗口内允许的最近距离（米）
    pub safe_distance_m: f32,
}

impl SafetyConfig {
    /// 单侧窗口的采样点数
    ///
    /// 按照给定分辨率换算并向零截断：120° / 2 / 0.35 → 171。
    pub fn half_window_samples(&self, degrees_per_sample: f32) -> usize {
        if !(degrees_per_sample > 0.0) {
            return 0;
        }
        ((self.window_angle_deg / 2.0) / degrees_per_sample) as usize
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            window_angle_deg: 120.0,
            safe_distance_m: 0.40,
        }
    }
}

/// 通道搜索参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorConfig {
    /// 通道宽度（采样点数）
    pub width_samples: usize,

    /// 通道内每个采样点的最小距离（米）
    pub clear_distance_m: f32,

    /// 是否在 debug 日志中输出所有候选通道角度
    pub log_candidates: bool,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            // 120 × 0.35° ≈ 42°
            width_samples: 120,
            clear_distance_m: 1.5,
            log_candidates: false,
        }
    }
}

/// 人脸出现去抖参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// 计数上限
    pub max_count: u8,

    /// 计数严格大于此值时视为有人
    pub greet_threshold: u8,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            max_count: 6,
            greet_threshold: 5,
        }
    }
}

/// 运动输出参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,

    /// 前进线速度（m/s）
    pub forward_speed: f64,

    /// 转向角速度幅值（rad/s）
    pub turn_rate: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 20.0,
            forward_speed: 0.1,
            turn_rate: 0.6,
        }
    }
}

/// 检测器配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// 模型文件路径
    pub model_path: Option<PathBuf>,
}

/// 提示音配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// 播放器命令
    pub player: String,

    /// 提示音文件路径；为空时只记录日志
    pub sound_path: Option<PathBuf>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            player: "aplay".to_string(),
            sound_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = FusionConfig::default();
        assert_eq!(config.scan.expected_samples, 512);
        assert_eq!(config.scan.degrees_per_sample, 0.35);
        assert_eq!(config.safety.safe_distance_m, 0.40);
        assert_eq!(config.corridor.width_samples, 120);
        assert_eq!(config.corridor.clear_distance_m, 1.5);
        assert_eq!(config.presence.max_count, 6);
        assert_eq!(config.presence.greet_threshold, 5);
        assert_eq!(config.motion.frequency_hz, 20.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_half_window_samples() {
        let safety = SafetyConfig::default();
        // 60° / 0.35 = 171.4 → 171
        assert_eq!(safety.half_window_samples(0.35), 171);
        assert_eq!(safety.half_window_samples(1.0), 60);
        assert_eq!(safety.half_window_samples(0.0), 0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FusionConfig::from_toml_str(
            r#"
[motion]
forward_speed = 0.2

[notifier]
sound_path = "/tmp/hello.wav"
"#,
        )
        .unwrap();

        assert_eq!(config.motion.forward_speed, 0.2);
        assert_eq!(config.motion.turn_rate, 0.6);
        assert_eq!(config.notifier.player, "aplay");
        assert_eq!(
            config.notifier.sound_path.as_deref(),
            Some(Path::new("/tmp/hello.wav"))
        );
        assert_eq!(config.scan, ScanConfig::default());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = FusionConfig::from_toml_str(
            r#"
[presence]
max_count = 5
greet_threshold = 5
"#,
        )
        .unwrap_err();
        assert!(matches!(err, FusionError::InvalidConfig(_)));
    }

    #[test]
    fn test_empty_safety_window_rejected() {
        for toml in [
            "[safety]\nwindow_angle_deg = 0.0",
            "[safety]\nwindow_angle_deg = -10.0",
            // 半角 0.1° 不足一个 0.35° 的采样
            "[safety]\nwindow_angle_deg = 0.2",
        ] {
            let err = FusionConfig::from_toml_str(toml).unwrap_err();
            assert!(matches!(err, FusionError::InvalidConfig(_)), "{}", toml);
        }

        // 最小可用窗口：单侧一个采样
        assert!(FusionConfig::from_toml_str("[safety]\nwindow_angle_deg = 0.7").is_ok());
    }

    #[test]
    fn test_invalid_frequency_rejected() {
        let mut config = FusionConfig::default();
        config.motion.frequency_hz = 0.0;
        assert!(config.validate().is_err());

        config.motion.frequency_hz = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[corridor]\nwidth_samples = 60\nclear_distance_m = 2.0").unwrap();

        let config = FusionConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.corridor.width_samples, 60);
        assert_eq!(config.corridor.clear_distance_m, 2.0);
    }

    #[test]
    fn test_load_missing_file() {
        let err = FusionConfig::load_from_file("/nonexistent/komodo.toml").unwrap_err();
        assert!(matches!(err, FusionError::Io(_)));
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = FusionConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed = FusionConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
