//! # Pupper CLI
//!
//! Mini Pupper 遥测查看器：连接控制器端点，定频读取 12 路舵机位置，
//! 按显示频率把最新窗口打印到终端。
//!
//! ```bash
//! # 读取一次并退出
//! pupper-cli --once
//!
//! # 1 kHz 采样，10 Hz 刷新，Ctrl+C 结束
//! pupper-cli --read-freq 1000 --plot-freq 10
//! ```

mod config;
mod display;

use anyhow::{Context, Result};
use clap::Parser;
use config::{ByteOrderArg, FileConfig, Overrides, Settings};
use pupper_driver::{ChannelSink, PositionSource, SamplingScheduler, SocketClient};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::filter::Directive;

/// Pupper CLI - 舵机位置遥测
#[derive(Parser, Debug)]
#[command(name = "pupper-cli")]
#[command(about = "Telemetry viewer for the Mini Pupper controller", long_about = None)]
#[command(version)]
struct Args {
    /// 配置文件（TOML）
    ///
    /// 默认: <config_dir>/pupper/telemetry.toml（存在时）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 控制器 SEQPACKET 套接字路径
    #[arg(long)]
    endpoint: Option<PathBuf>,

    /// 采样频率（Hz，默认 1000）
    #[arg(long)]
    read_freq: Option<f64>,

    /// 显示刷新频率（Hz，默认 30）
    #[arg(long)]
    plot_freq: Option<f64>,

    /// 缓冲区容量（样本数，默认 10 秒数据）
    #[arg(long)]
    capacity: Option<usize>,

    /// 每次刷新取的最近样本数
    #[arg(long)]
    window: Option<usize>,

    /// 单次应答超时（毫秒，0 表示不限）
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// 位置数组字节序
    #[arg(long, value_enum)]
    byte_order: Option<ByteOrderArg>,

    /// 读取一次位置后退出
    #[arg(long)]
    once: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            read_freq: self.read_freq,
            plot_freq: self.plot_freq,
            capacity: self.capacity,
            window: self.window,
            timeout_ms: self.timeout_ms,
            byte_order: self.byte_order,
        }
    }
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "pupper_cli=info".parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let file = FileConfig::discover(args.config.as_deref())?;
    let settings = Settings::resolve(file, args.overrides())?;

    let mut client = SocketClient::connect_with_config(&settings.endpoint, settings.client.clone())
        .context("Controller endpoint unavailable")?;
    info!("Connected to {}", settings.endpoint.display());

    let origin = Instant::now();
    if args.once {
        let sample = client.request_positions()?;
        println!("{}", display::format_positions(&sample, origin));
        client.close();
        return Ok(());
    }

    monitor(client, &settings, origin)
}

/// 持续采样，显示线程按窗口刷新，Ctrl+C 结束
fn monitor(client: SocketClient, settings: &Settings, origin: Instant) -> Result<()> {
    let mut scheduler = SamplingScheduler::new(PositionSource::new(client), settings.sampler.clone())?;

    let cancel = scheduler.cancel_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Stopping...");
        cancel.cancel();
    })
    .context("Failed to set signal handler")?;

    // 显示线程跟不上时丢弃窗口，采样不受影响
    let (sink, windows) = ChannelSink::new(settings.sampler.window_len, 2);
    let dropped = sink.dropped_counter();
    scheduler.add_sink(sink);

    let printer = thread::Builder::new()
        .name("pupper-display".into())
        .spawn(move || {
            for window in windows {
                if let Some(line) = display::format_window(&window, origin) {
                    println!("{}", line);
                }
            }
        })
        .context("Failed to spawn display thread")?;

    let result = scheduler.run();
    let metrics = scheduler.metrics().snapshot();

    // 释放调度器（连同 sink 的发送端），显示线程随通道关闭退出
    drop(scheduler);
    if printer.join().is_err() {
        error!("Display thread panicked");
    }

    let summary = result?;
    info!(
        "{} ({} windows dropped by display)",
        display::format_summary(&summary, &metrics),
        dropped.load(Ordering::Relaxed)
    );
    Ok(())
}
