//! # Komodo CLI
//!
//! 在没有机器人中间件的环境下运行控制核心：
//! 从 JSON-lines 录制中回放传感器消息，把运动指令以 JSON-lines 写到 stdout。
//!
//! ```bash
//! # 默认配置，读取 stdin
//! komodo-cli < session.jsonl
//!
//! # 指定配置文件，回放结束后停止
//! komodo-cli --config komodo.toml --input session.jsonl --stop-at-eof
//! ```
//!
//! 日志写到 stderr，级别由 `RUST_LOG` 控制（默认 `komodo=info`）。

use anyhow::{Context, Result};
use clap::Parser;
use komodo_fusion::FusionConfig;
use komodo_node::{
    ChannelSink, ControlLoop, LoopConfig, Node, NodeError, SoundNotifier, TwistMessage,
    load_detector,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use tracing::info;

mod replay;

/// Komodo CLI - 迎宾机器人控制核心
#[derive(Parser, Debug)]
#[command(name = "komodo-cli")]
#[command(about = "Replay recorded sensor messages through the Komodo control core", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 传感器录制（JSON-lines），缺省读取 stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 覆盖控制频率（Hz）
    #[arg(long)]
    frequency: Option<f64>,

    /// 最多运行的控制周期数
    #[arg(long)]
    max_ticks: Option<u64>,

    /// 回放消息之间的间隔（毫秒）
    #[arg(long, default_value_t = 0)]
    message_interval_ms: u64,

    /// 输入读完后停止控制循环
    #[arg(long)]
    stop_at_eof: bool,

    /// 在 debug 日志中输出所有候选通道
    #[arg(long)]
    log_candidates: bool,
}

fn load_config(cli: &Cli) -> Result<FusionConfig> {
    let mut config = match &cli.config {
        Some(path) => FusionConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => FusionConfig::default(),
    };

    if let Some(frequency) = cli.frequency {
        config.motion.frequency_hz = frequency;
    }
    if cli.log_candidates {
        config.corridor.log_candidates = true;
    }
    config.validate()?;
    Ok(config)
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening input {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn main() -> Result<()> {
    // 初始化日志（stdout 留给指令输出）
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("komodo=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let notifier = Arc::new(SoundNotifier::from_config(&config.notifier)?);

    // 没有内置的检测模型后端：录制中的 detections 消息直接驱动出现状态
    let detector = load_detector(config.detector.model_path.as_deref(), |path| {
        Err::<komodo_node::DisabledDetector, _>(NodeError::DetectorLoad {
            path: path.display().to_string(),
            reason: "no detector backend available in this build".to_string(),
        })
    });

    let node = Arc::new(Node::new(&config, detector, notifier.clone()));

    // 输入在启动任何线程之前打开，打不开直接报错退出
    let input = open_input(cli.input.as_deref())?;

    let (sink, commands) = ChannelSink::new(1024);
    let loop_config = LoopConfig {
        max_ticks: cli.max_ticks,
        ..LoopConfig::from_motion(&config.motion)
    };
    let control = ControlLoop::spawn(node.clone(), sink, loop_config)?;

    let shutdown = control.shutdown_flag();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Release);
        })
        .context("installing Ctrl+C handler")?;
    }

    // 指令输出线程：控制循环结束后通道关闭，线程随之退出
    let writer = thread::spawn(move || -> io::Result<u64> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let mut written = 0;
        for command in commands.iter() {
            let line = serde_json::to_string(&TwistMessage::from(command))?;
            writeln!(out, "{}", line)?;
            written += 1;
        }
        out.flush()?;
        Ok(written)
    });

    // 回放线程
    let replayer = {
        let node = node.clone();
        let shutdown = shutdown.clone();
        let interval = Duration::from_millis(cli.message_interval_ms);
        let stop_at_eof = cli.stop_at_eof;
        thread::spawn(move || {
            let stats = replay::replay(input, &node, interval, &shutdown);
            info!(
                dispatched = stats.dispatched,
                rejected = stats.rejected,
                "Input exhausted"
            );
            if stop_at_eof {
                shutdown.store(true, Ordering::Release);
            }
            stats
        })
    };

    let stats = control.join()?;
    info!(
        ticks = stats.ticks,
        published = stats.published,
        held = stats.held,
        overruns = stats.overruns,
        "Control loop finished"
    );

    let written = writer
        .join()
        .map_err(|_| anyhow::anyhow!("output thread panicked"))??;
    info!("{} commands written", written);

    // stdin 可能还在阻塞读取；已结束的回放线程才回收
    if replayer.is_finished() {
        replayer
            .join()
            .map_err(|_| anyhow::anyhow!("replay thread panicked"))?;
    }

    drop(node);
    if let Ok(notifier) = Arc::try_unwrap(notifier) {
        notifier.shutdown();
    }

    Ok(())
}
