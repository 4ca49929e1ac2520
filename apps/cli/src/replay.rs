//! 录制回放
//!
//! 按行读取 JSON 传感器消息并分发给节点。解析失败的行记录警告后跳过。

use komodo_node::{Node, SensorMessage};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{error, warn};

/// 回放统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayStats {
    /// 成功分发的消息数
    pub dispatched: u64,

    /// 被拒绝的行数
    pub rejected: u64,
}

/// 回放一个输入流
///
/// - 空行和 `#` 开头的行忽略
/// - `interval` 非零时每条消息之间休眠
/// - `shutdown` 置位后提前结束
pub fn replay<R: BufRead>(
    reader: R,
    node: &Node,
    interval: Duration,
    shutdown: &AtomicBool,
) -> ReplayStats {
    let mut stats = ReplayStats::default();

    for (line_no, line) in reader.lines().enumerate() {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        let line = match line {
            Ok(line) => line,
            // 非 UTF-8 的行已被读走，跳过即可
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("Skipping line {}: {}", line_no + 1, e);
                stats.rejected += 1;
                continue;
            },
            Err(e) => {
                error!("Input read error at line {}: {}", line_no + 1, e);
                break;
            },
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match SensorMessage::from_json(trimmed) {
            Ok(message) => {
                node.handle(&message);
                stats.dispatched += 1;
            },
            Err(e) => {
                warn!("Skipping line {}: {}", line_no + 1, e);
                stats.rejected += 1;
            },
        }

        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    stats
}
