//! 节点层错误类型定义

use komodo_fusion::FusionError;
use thiserror::Error;

/// 节点层错误类型
#[derive(Error, Debug)]
pub enum NodeError {
    /// 融合层错误（配置）
    #[error("Fusion error: {0}")]
    Fusion(#[from] FusionError),

    /// 指令通道已关闭（接收端退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 检测器模型加载失败
    #[error("Failed to load detector model {path}: {reason}")]
    DetectorLoad { path: String, reason: String },

    /// 工作线程启动失败
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// 工作线程 panic
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    /// 控制循环配置非法
    #[error("Invalid loop config: {0}")]
    InvalidLoopConfig(String),

    /// 回放消息解析失败
    #[error("Invalid sensor message: {0}")]
    InvalidMessage(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::NodeError;
    use komodo_fusion::FusionError;

    #[test]
    fn test_node_error_display() {
        assert_eq!(
            format!("{}", NodeError::ChannelClosed),
            "Command channel closed"
        );

        let err = NodeError::DetectorLoad {
            path: "/models/face.xml".to_string(),
            reason: "not found".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("/models/face.xml") && msg.contains("not found"));

        let err = NodeError::InvalidLoopConfig("frequency_hz = 0".to_string());
        assert!(format!("{}", err).contains("frequency_hz = 0"));
    }

    #[test]
    fn test_from_fusion_error() {
        let err: NodeError = FusionError::InvalidConfig("bad".to_string()).into();
        assert!(matches!(err, NodeError::Fusion(FusionError::InvalidConfig(_))));
    }
}
