//! Control Loop - 固定频率控制循环
//!
//! 在独立线程上按固定频率调用 [`Node::tick`]，有指令时发布，保持时什么都不发。
//!
//! # 核心功能
//!
//! - **精确定时**: 使用 `spin_sleep` 实现低抖动延时
//! - **超时警告**: 单个周期耗时超过标称周期时记录警告，不补偿
//! - **优雅关闭**: 通过原子标志停止，`join()` 返回运行统计
//! - **错误传播**: 发布端关闭时循环退出并返回错误
//!
//! # 示例
//!
//! ```rust,ignore
//! let (sink, rx) = ChannelSink::new(64);
//! let control = ControlLoop::spawn(node.clone(), sink, LoopConfig::default())?;
//! // ... 传感器回调在其他线程上调用 node.on_scan() 等 ...
//! control.stop();
//! let stats = control.join()?;
//! ```

use crate::error::NodeError;
use crate::node::Node;
use crate::transport::MotionSink;
use komodo_fusion::config::MotionConfig;
use spin_sleep::SpinSleeper;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 控制循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,

    /// 最大周期数（None 表示一直运行到停止）
    ///
    /// 用于测试或定时运行。
    pub max_ticks: Option<u64>,
}

impl LoopConfig {
    pub fn from_motion(motion: &MotionConfig) -> Self {
        Self {
            frequency_hz: motion.frequency_hz,
            max_ticks: None,
        }
    }

    fn period(&self) -> Result<Duration, NodeError> {
        if !(self.frequency_hz > 0.0) || !self.frequency_hz.is_finite() {
            return Err(NodeError::InvalidLoopConfig(format!(
                "Invalid frequency_hz: {} (must be > 0)",
                self.frequency_hz
            )));
        }
        if self.frequency_hz > 1000.0 {
            warn!(
                "Very high control frequency: {} Hz. The base controller will not keep up.",
                self.frequency_hz
            );
        }
        Ok(Duration::from_secs_f64(1.0 / self.frequency_hz))
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 20.0,
            max_ticks: None,
        }
    }
}

/// 运行统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    /// 总周期数
    pub ticks: u64,

    /// 发布了指令的周期数
    pub published: u64,

    /// 保持（未发布）的周期数
    pub held: u64,

    /// 耗时超过标称周期的次数
    pub overruns: u64,
}

/// 运行控制循环（阻塞）
///
/// 持续运行直到：
/// - `shutdown` 被置位
/// - 达到 `max_ticks`（如果设置）
/// - 发布端返回错误
pub fn run_control_loop<S: MotionSink>(
    node: &Node,
    sink: &mut S,
    config: &LoopConfig,
    shutdown: &AtomicBool,
) -> Result<LoopStats, NodeError> {
    let period = config.period()?;
    let sleeper = SpinSleeper::default();
    let mut stats = LoopStats::default();

    info!("Control loop started at {} Hz", config.frequency_hz);

    while !shutdown.load(Ordering::Acquire) {
        if let Some(max_ticks) = config.max_ticks
            && stats.ticks >= max_ticks
        {
            break;
        }

        let started = Instant::now();

        match node.tick() {
            Some(command) => {
                sink.publish(command)?;
                stats.published += 1;
            },
            None => stats.held += 1,
        }
        stats.ticks += 1;

        let elapsed = started.elapsed();
        if elapsed < period {
            sleeper.sleep(period - elapsed);
        } else {
            stats.overruns += 1;
            warn!("Control tick took {:?}, longer than the {:?} period", elapsed, period);
        }
    }

    info!(
        ticks = stats.ticks,
        published = stats.published,
        held = stats.held,
        "Control loop stopped"
    );
    Ok(stats)
}

/// 后台控制循环句柄
pub struct ControlLoop {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<LoopStats, NodeError>>>,
}

impl ControlLoop {
    /// 在新线程上启动控制循环
    ///
    /// 配置在启动前校验，非法频率直接返回错误。
    pub fn spawn<S>(node: Arc<Node>, mut sink: S, config: LoopConfig) -> Result<Self, NodeError>
    where
        S: MotionSink + 'static,
    {
        config.period()?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let handle = thread::Builder::new()
            .name("komodo-control".to_string())
            .spawn(move || run_control_loop(&node, &mut sink, &config, &shutdown_clone))
            .map_err(|source| NodeError::Spawn {
                name: "control",
                source,
            })?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// 请求停止（不等待）
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// 停止标志，可交给 Ctrl+C 处理器
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// 循环线程是否已退出
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// 等待循环结束并返回统计
    pub fn join(mut self) -> Result<LoopStats, NodeError> {
        let Some(handle) = self.handle.take() else {
            return Ok(LoopStats::default());
        };
        handle
            .join()
            .map_err(|_| NodeError::ThreadPanicked("control"))?
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            debug!("Joining control thread on drop");
            let _ = handle.join();
        }
    }
}
