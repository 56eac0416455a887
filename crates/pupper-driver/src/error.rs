//! 驱动层错误类型定义

use pupper_protocol::ProtocolError;
use pupper_transport::TransportError;
use std::io;
use thiserror::Error;

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 应答校验失败（帧头错位 / 长度不符），会话已关闭
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 连接建立后的读写失败
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// 等待应答超时，会话已关闭
    #[error("Reply timeout")]
    Timeout,

    /// 姿态数据源不可用
    #[error("Attitude source unavailable: {0}")]
    UpstreamUnavailable(String),

    /// 连接已关闭（`close()` 之后再次请求）
    #[error("Client is not connected")]
    NotConnected,

    /// 等待应答期间观察到取消信号
    #[error("Cancelled while waiting for reply")]
    Cancelled,
}

impl ClientError {
    /// 是否为协议违例（BadHeader / Truncated）
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, ClientError::Protocol(e) if e.is_desync())
    }

    /// 是否由取消引起（非故障）
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => ClientError::Io(e),
            TransportError::Timeout => ClientError::Timeout,
            TransportError::Closed => ClientError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            )),
            TransportError::ShortWrite { expected, sent } => ClientError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: sent {} of {} bytes", sent, expected),
            )),
        }
    }
}

/// 采样配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 频率必须为有限正数
    #[error("Invalid {name}: {value} (must be a positive finite frequency in Hz)")]
    InvalidFrequency { name: &'static str, value: f64 },

    /// 缓冲区容量不能为 0
    #[error("Buffer capacity must be greater than zero")]
    ZeroCapacity,

    /// 可视化窗口长度不能为 0
    #[error("Window length must be greater than zero")]
    ZeroWindow,
}
