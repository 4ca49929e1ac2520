//! 融合层错误类型定义

use thiserror::Error;

/// 融合层错误类型
///
/// 控制路径上的异常（扫描长度不符、窗口越界）只记录警告，不会走到这里；
/// 这里只有启动阶段会返回的错误。
#[derive(Error, Debug)]
pub enum FusionError {
    /// 配置参数非法
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 配置文件读取失败
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件解析失败
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
