//! 问候提示
//!
//! 提示音播放可能耗时数秒，不能在传感器回调里同步执行。
//! [`SoundNotifier`] 把请求投递到一个专用工作线程（Actor 模式）：
//!
//! - **非阻塞**: 调用方只增加待播计数并用 `try_send` 唤醒，永远不会被播放延迟卡住
//! - **不丢提示**: 通道容量为 1，只用来唤醒；每次请求都记在待播计数里，
//!   工作线程醒来后逐个播完
//! - **优雅关闭**: Drop 时关闭通道，等待工作线程播完剩余提示后退出
//!
//! "每轮只问候一次" 由 [`PresenceCell`](komodo_fusion::PresenceCell) 保证，
//! 这里只负责把已经决定的那一次提示送出去。

use crate::error::NodeError;
use crossbeam_channel::{Sender, TrySendError, bounded};
use komodo_fusion::config::NotifierConfig;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// 提示接口
///
/// # 性能要求
///
/// - **非阻塞**: 实现必须立即返回
/// - 推荐把实际工作转交给其他线程
pub trait Notifier: Send + Sync {
    /// 触发一次问候提示（fire-and-forget）
    fn notify(&self);
}

/// 提示动作（在工作线程上执行）
pub trait CueAction: Send + 'static {
    fn play(&mut self);
}

/// 调用外部播放器播放提示音
#[derive(Debug, Clone)]
pub struct PlayerCommand {
    player: String,
    sound_path: Option<PathBuf>,
}

impl PlayerCommand {
    pub fn from_config(config: &NotifierConfig) -> Self {
        Self {
            player: config.player.clone(),
            sound_path: config.sound_path.clone(),
        }
    }
}

impl CueAction for PlayerCommand {
    fn play(&mut self) {
        let Some(path) = &self.sound_path else {
            info!("Hello! (no greeting sound configured)");
            return;
        };

        match Command::new(&self.player).arg(path).status() {
            Ok(status) if status.success() => {
                debug!("Greeting sound played: {}", path.display());
            },
            Ok(status) => {
                warn!("{} exited with {} while playing {}", self.player, status, path.display());
            },
            Err(e) => {
                warn!("Failed to run {}: {}", self.player, e);
            },
        }
    }
}

impl<F> CueAction for F
where
    F: FnMut() + Send + 'static,
{
    fn play(&mut self) {
        self()
    }
}

/// 带专用工作线程的提示器
pub struct SoundNotifier {
    /// 唤醒通道，`None` 表示已关闭
    tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,

    /// 已接受的提示请求数
    requested: Arc<AtomicU64>,

    /// 尚未播放的提示数
    pending: Arc<AtomicU64>,

    /// 已播放完的提示数
    played: Arc<AtomicU64>,
}

impl SoundNotifier {
    /// 根据配置启动（外部播放器）
    pub fn from_config(config: &NotifierConfig) -> Result<Self, NodeError> {
        Self::spawn(PlayerCommand::from_config(config))
    }

    /// 启动工作线程
    pub fn spawn<A: CueAction>(mut action: A) -> Result<Self, NodeError> {
        let (tx, rx) = bounded::<()>(1);
        let pending = Arc::new(AtomicU64::new(0));
        let played = Arc::new(AtomicU64::new(0));

        let worker_pending = pending.clone();
        let worker_played = played.clone();
        let mut drain = move || {
            while worker_pending
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok()
            {
                action.play();
                worker_played.fetch_add(1, Ordering::Release);
            }
        };

        let handle = thread::Builder::new()
            .name("komodo-notifier".to_string())
            .spawn(move || {
                while rx.recv().is_ok() {
                    drain();
                }
                drain();
                debug!("Notifier thread exiting");
            })
            .map_err(|source| NodeError::Spawn {
                name: "notifier",
                source,
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            requested: Arc::new(AtomicU64::new(0)),
            pending,
            played,
        })
    }

    /// 已接受的提示请求数
    pub fn requested(&self) -> u64 {
        self.requested.load(Ordering::Relaxed)
    }

    /// 排队等待播放的提示数
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    /// 已播放完的提示数
    pub fn played(&self) -> u64 {
        self.played.load(Ordering::Acquire)
    }

    /// 关闭通道并等待工作线程播放完已排队的提示
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Notifier for SoundNotifier {
    fn notify(&self) {
        let Some(tx) = &self.tx else {
            return;
        };

        // 先记账再唤醒：工作线程醒来时一定能看到这次请求
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.requested.fetch_add(1, Ordering::Relaxed);

        match tx.try_send(()) {
            Ok(()) => {},
            Err(TrySendError::Full(())) => {
                debug!("Notifier wake-up already queued");
            },
            Err(TrySendError::Disconnected(())) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                warn!("Notifier thread is gone, greeting dropped");
            },
        }
    }
}

impl Drop for SoundNotifier {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    #[test]
    fn test_notify_runs_action_on_worker() {
        let (done_tx, done_rx) = unbounded();
        let notifier = SoundNotifier::spawn(move || {
            let _ = done_tx.send(thread::current().name().map(str::to_string));
        })
        .unwrap();

        notifier.notify();
        let name = done_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(name.as_deref(), Some("komodo-notifier"));
        assert_eq!(notifier.requested(), 1);
    }

    #[test]
    fn test_notify_never_blocks_on_slow_action() {
        let (release_tx, release_rx) = bounded::<()>(0);
        let notifier = SoundNotifier::spawn(move || {
            let _ = release_rx.recv_timeout(Duration::from_secs(2));
        })
        .unwrap();

        // 第一次进入工作线程并卡住，后续请求立即返回
        for _ in 0..10 {
            notifier.notify();
        }
        assert_eq!(notifier.requested(), 10);
        assert!(notifier.pending() >= 9);

        drop(release_tx);
        notifier.shutdown();
    }

    #[test]
    fn test_requests_during_playback_are_not_lost() {
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded::<()>();
        let count = Arc::new(AtomicU64::new(0));
        let notifier = {
            let count = count.clone();
            SoundNotifier::spawn(move || {
                let _ = started_tx.send(());
                let _ = release_rx.recv_timeout(Duration::from_secs(2));
                count.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        };

        // 第一轮问候开始播放后，又来了两轮
        notifier.notify();
        started_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        notifier.notify();
        notifier.notify();
        assert_eq!(notifier.pending(), 2);

        for _ in 0..3 {
            release_tx.send(()).unwrap();
        }
        notifier.shutdown();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_shutdown_drains_pending() {
        let count = Arc::new(AtomicU64::new(0));
        let notifier = {
            let count = count.clone();
            SoundNotifier::spawn(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        };

        notifier.notify();
        notifier.shutdown();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_player_without_sound_only_logs() {
        let mut player = PlayerCommand::from_config(&NotifierConfig::default());
        // 未配置提示音文件：不启动任何进程
        player.play();
    }
}
