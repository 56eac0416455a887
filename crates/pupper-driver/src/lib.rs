//! # Pupper Driver
//!
//! Mini Pupper 遥测客户端核心：
//! - 协议客户端（一问一答，帧头错位即断开）
//! - 角度归一化
//! - 有界时间序列缓冲区 + 跨线程共享句柄
//! - 定频采样调度器（最小间隔轮询，协作式取消）
//! - 可视化通知（有界通道 / 闭包）
//!
//! # 快速开始
//!
//! ```no_run
//! use pupper_driver::{
//!     ChannelSink, DEFAULT_ENDPOINT, PositionSource, SamplerConfig, SamplingScheduler,
//!     SocketClient,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SocketClient::connect(DEFAULT_ENDPOINT)?;
//! let mut scheduler =
//!     SamplingScheduler::new(PositionSource::new(client), SamplerConfig::default())?;
//!
//! let (sink, windows) = ChannelSink::new(100, 4);
//! scheduler.add_sink(sink);
//! std::thread::spawn(move || {
//!     for window in windows {
//!         println!("{} samples", window.len());
//!     }
//! });
//!
//! scheduler.run()?;
//! # Ok(())
//! # }
//! ```

pub mod angle;
pub mod attitude;
pub mod buffer;
mod cancel;
pub mod client;
pub mod clock;
mod error;
pub mod metrics;
pub mod sample;
pub mod scheduler;
pub mod sink;
pub mod source;

pub use angle::wrap_angle;
pub use attitude::{AttitudeError, AttitudeProvider, AttitudeReading};
pub use buffer::{SharedBuffer, TimeSeriesBuffer};
pub use cancel::CancelFlag;
pub use client::{ClientConfig, DEFAULT_ENDPOINT, ProtocolClient};
pub use clock::{Clock, MockClock, SystemClock};
pub use error::{ClientError, ConfigError};
pub use metrics::{MetricsSnapshot, SamplerMetrics};
pub use sample::{AttitudeSample, CombinedSample, PositionSample};
pub use scheduler::{RunSummary, SamplerConfig, SamplingScheduler, SchedulerState, TickOutcome};
pub use sink::{ChannelSink, FnSink, VisualizationSink};
pub use source::{AttitudeSource, CombinedSource, PositionSource, SampleSource};

pub use pupper_protocol::{ByteOrder, ProtocolError};
pub use pupper_transport::{ConnectionError, MessageTransport, TransportError};

/// 基于 `SOCK_SEQPACKET` 套接字的协议客户端
#[cfg(target_os = "linux")]
pub type SocketClient = ProtocolClient<pupper_transport::SeqPacketTransport>;
