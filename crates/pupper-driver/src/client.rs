//! 协议客户端
//!
//! 独占一条到控制器的面向消息连接，每次调用执行一次同步的请求 → 应答交换。
//!
//! # 会话规则
//!
//! - 严格一问一答：上一条应答到达之前不会发出下一条请求，不做流水线
//! - 应答帧头错位（`BadHeader` / `Truncated`）说明会话已失步，立即关闭连接，不重试
//! - 超时或取消同样关闭连接：迟到的应答会被下一次交换误读
//! - `close()` 幂等；关闭后的请求返回 `ClientError::NotConnected`

use crate::cancel::CancelFlag;
use crate::error::ClientError;
use crate::sample::PositionSample;
use pupper_protocol::{
    ByteOrder, MAX_MESSAGE_LEN, Opcode, ProtocolError, decode_positions, decode_reply,
    encode_request,
};
use pupper_transport::{MessageTransport, TransportError};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// 控制器默认端点（与固件侧守护进程约定的路径）
pub const DEFAULT_ENDPOINT: &str = "/tmp/9Lq7BNBnBycd6nxy.socket";

/// 客户端配置
///
/// # Example
///
/// ```
/// use pupper_driver::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig {
///     read_timeout: Some(Duration::from_millis(200)),
///     ..ClientConfig::default()
/// };
/// assert_eq!(config.poll_slice, Duration::from_millis(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// 单次交换等待应答的上限；`None` 表示无限等待（仍可被取消）
    pub read_timeout: Option<Duration>,
    /// 等待应答时每次 poll 的时长，也是检查取消信号的间隔
    pub poll_slice: Duration,
    /// 位置数组字节序
    pub byte_order: ByteOrder,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_timeout: Some(Duration::from_secs(1)),
            poll_slice: Duration::from_millis(10),
            byte_order: ByteOrder::Native,
        }
    }
}

/// 协议客户端
pub struct ProtocolClient<T: MessageTransport> {
    transport: Option<T>,
    config: ClientConfig,
    cancel: Option<CancelFlag>,
    rx_buf: [u8; MAX_MESSAGE_LEN],
    exchanges: u64,
}

#[cfg(target_os = "linux")]
impl ProtocolClient<pupper_transport::SeqPacketTransport> {
    /// 连接到控制器端点（默认配置）
    ///
    /// 端点不存在或拒绝连接时立即返回 `ConnectionError`，不重试。
    pub fn connect(
        endpoint: impl AsRef<std::path::Path>,
    ) -> Result<Self, pupper_transport::ConnectionError> {
        Self::connect_with_config(endpoint, ClientConfig::default())
    }

    /// 连接到控制器端点（自定义配置）
    pub fn connect_with_config(
        endpoint: impl AsRef<std::path::Path>,
        config: ClientConfig,
    ) -> Result<Self, pupper_transport::ConnectionError> {
        let transport = pupper_transport::SeqPacketTransport::connect(endpoint)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: MessageTransport> ProtocolClient<T> {
    /// 在已建立的传输上创建客户端
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport: Some(transport),
            config,
            cancel: None,
            rx_buf: [0u8; MAX_MESSAGE_LEN],
            exchanges: 0,
        }
    }

    /// 设置取消标志：等待应答时每个 poll 间隙检查一次
    pub fn set_cancel_flag(&mut self, cancel: CancelFlag) {
        self.cancel = Some(cancel);
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// 成功完成的交换次数
    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    /// 读取 12 路舵机位置
    ///
    /// 发送 `[2, 2]`，期望 26 字节应答 `(26, 2, 12 × u16)`。
    ///
    /// # 错误
    /// - `ClientError::Protocol`: 应答帧头或长度不符（连接已关闭）
    /// - `ClientError::Io`: 读写失败 / 对端关闭（连接已关闭）
    /// - `ClientError::Timeout`: 超过 `read_timeout`（连接已关闭）
    /// - `ClientError::Cancelled`: 等待期间被取消（连接已关闭）
    /// - `ClientError::NotConnected`: 已调用过 `close()`
    pub fn request_positions(&mut self) -> Result<PositionSample, ClientError> {
        let opcode = Opcode::GetPositions;
        let received = self.exchange(opcode)?;

        let decoded = decode_reply(opcode, opcode.reply_len(), &self.rx_buf[..received])
            .and_then(|payload| decode_positions(payload, self.config.byte_order));

        match decoded {
            Ok(channels) => {
                self.exchanges += 1;
                Ok(PositionSample::new(Instant::now(), channels))
            },
            Err(e) => {
                self.abort_on_violation(&e);
                Err(e.into())
            },
        }
    }

    /// 释放连接（幂等）
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.shutdown() {
                warn!("Transport shutdown failed: {}", e);
            }
            debug!("Protocol client closed after {} exchanges", self.exchanges);
        }
    }

    /// 取回底层传输（用于测试或转交）
    pub fn into_transport(mut self) -> Option<T> {
        self.transport.take()
    }

    fn abort_on_violation(&mut self, err: &ProtocolError) {
        error!("Invalid reply, closing session without retry: {}", err);
        self.close();
    }

    /// 发送一条请求并等待一条应答，返回应答字节数
    ///
    /// 任何失败都会关闭连接。
    fn exchange(&mut self, opcode: Opcode) -> Result<usize, ClientError> {
        match self.exchange_inner(opcode) {
            Ok(n) => Ok(n),
            Err(ClientError::NotConnected) => Err(ClientError::NotConnected),
            Err(e) => {
                if e.is_cancelled() {
                    debug!("Exchange cancelled, closing session");
                } else {
                    error!("Exchange failed, closing session: {}", e);
                }
                self.close();
                Err(e)
            },
        }
    }

    fn exchange_inner(&mut self, opcode: Opcode) -> Result<usize, ClientError> {
        let transport = self.transport.as_mut().ok_or(ClientError::NotConnected)?;

        let request = encode_request(opcode);
        transport.send(&request)?;
        trace!("Request sent: {:02X?}", request);

        let deadline = self.config.read_timeout.map(|t| Instant::now() + t);
        loop {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                return Err(ClientError::Cancelled);
            }

            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(ClientError::Timeout);
                    }
                    (deadline - now).min(self.config.poll_slice)
                },
                None => self.config.poll_slice,
            };

            match transport.receive_timeout(&mut self.rx_buf, Some(slice)) {
                Ok(n) => {
                    trace!("Reply received: {} bytes", n);
                    return Ok(n);
                },
                Err(TransportError::Timeout) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<T: MessageTransport> Drop for ProtocolClient<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pupper_protocol::{POSITION_CHANNELS, encode_positions_reply, encode_reply};
    use pupper_transport::{MockHandle, MockReply, MockTransport};
    use std::io;

    fn mock_client(config: ClientConfig) -> (ProtocolClient<MockTransport>, MockHandle) {
        let (transport, handle) = MockTransport::new();
        (ProtocolClient::with_transport(transport, config), handle)
    }

    fn fast_config() -> ClientConfig {
        ClientConfig {
            read_timeout: Some(Duration::from_millis(20)),
            poll_slice: Duration::from_millis(1),
            byte_order: ByteOrder::Little,
        }
    }

    #[test]
    fn test_request_positions_ok() {
        let (mut client, handle) = mock_client(fast_config());
        let channels: [u16; POSITION_CHANNELS] = core::array::from_fn(|i| (i as u16) * 100);
        handle.push_message(encode_positions_reply(&channels, ByteOrder::Little));

        let before = Instant::now();
        let sample = client.request_positions().unwrap();
        assert_eq!(sample.channels, channels);
        assert!(sample.timestamp >= before);
        assert_eq!(handle.sent(), vec![vec![2, 2]]);
        assert_eq!(client.exchanges(), 1);
        assert!(client.is_connected());
    }

    #[test]
    fn test_bad_header_closes_without_retry() {
        let (mut client, handle) = mock_client(fast_config());
        handle.push_message(encode_reply(Opcode::GetPositions, &[0u8; 8]));
        // 第二条合法应答不应被读取
        handle.push_message(encode_positions_reply(&[0; POSITION_CHANNELS], ByteOrder::Little));

        let err = client.request_positions().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::BadHeader {
                actual_length: 10,
                ..
            })
        ));
        assert!(!client.is_connected());
        assert_eq!(handle.sent().len(), 1);
        assert_eq!(handle.pending_replies(), 1);
        assert_eq!(handle.shutdown_calls(), 1);

        assert!(matches!(
            client.request_positions(),
            Err(ClientError::NotConnected)
        ));
    }

    #[test]
    fn test_oversized_reply_is_truncated_error() {
        let (mut client, handle) = mock_client(fast_config());
        let mut raw = vec![26u8, 2];
        raw.extend_from_slice(&[0u8; 30]);
        handle.push_message(raw);

        let err = client.request_positions().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::Truncated {
                expected: 24,
                actual: 30
            })
        ));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_timeout_closes_session() {
        let (mut client, handle) = mock_client(fast_config());
        let err = client.request_positions().unwrap_err();
        assert!(matches!(err, ClientError::Timeout));
        assert!(!client.is_connected());
        assert_eq!(handle.shutdown_calls(), 1);
    }

    #[test]
    fn test_slow_reply_within_timeout_succeeds() {
        let (mut client, handle) = mock_client(fast_config());
        handle.push_reply(MockReply::Timeout);
        handle.push_reply(MockReply::Timeout);
        handle.push_message(encode_positions_reply(&[7; POSITION_CHANNELS], ByteOrder::Little));

        let sample = client.request_positions().unwrap();
        assert_eq!(sample.channels, [7; POSITION_CHANNELS]);
        assert_eq!(handle.receive_calls(), 3);
    }

    #[test]
    fn test_cancel_while_waiting() {
        let config = ClientConfig {
            read_timeout: None,
            ..fast_config()
        };
        let (mut client, _handle) = mock_client(config);
        let cancel = CancelFlag::new();
        client.set_cancel_flag(cancel.clone());
        cancel.cancel();

        assert!(matches!(
            client.request_positions(),
            Err(ClientError::Cancelled)
        ));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_peer_hangup_is_io_error() {
        let (mut client, handle) = mock_client(fast_config());
        handle.push_reply(MockReply::Hangup);
        match client.request_positions() {
            Err(ClientError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("Expected Io error, got {:?}", other),
        }
        assert!(!client.is_connected());
    }

    #[test]
    fn test_send_failure_is_io_error() {
        let (mut client, handle) = mock_client(fast_config());
        handle.fail_sends(io::ErrorKind::BrokenPipe);
        match client.request_positions() {
            Err(ClientError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut client, handle) = mock_client(fast_config());
        client.close();
        client.close();
        drop(client);
        assert_eq!(handle.shutdown_calls(), 1);
    }
}
