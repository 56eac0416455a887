//! `SOCK_SEQPACKET` Unix 套接字传输（Linux）
//!
//! 使用 `nix` 直接操作套接字：`poll` 实现带超时的接收，`send`/`recv`
//! 各对应一条完整消息。

use crate::{ConnectionError, MessageTransport, TransportError};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::socket::{
    AddressFamily, Backlog, MsgFlags, Shutdown, SockFlag, SockType, UnixAddr, accept, bind,
    connect, listen, recv, send, shutdown, socket, socketpair,
};
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// 把 `Option<Duration>` 转为 poll 超时（毫秒，最大 65535ms）
fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    match timeout {
        None => PollTimeout::NONE,
        Some(d) => PollTimeout::from(d.as_millis().min(u16::MAX as u128) as u16),
    }
}

/// 客户端连接
pub struct SeqPacketTransport {
    fd: Option<OwnedFd>,
    endpoint: Option<PathBuf>,
}

impl SeqPacketTransport {
    /// 连接到控制器端点
    ///
    /// 端点不存在或拒绝连接时返回 `ConnectionError`，不重试。
    pub fn connect(endpoint: impl AsRef<Path>) -> Result<Self, ConnectionError> {
        let endpoint = endpoint.as_ref();
        let to_conn_err = |e: Errno| ConnectionError::new(endpoint, io::Error::from(e));

        let fd = socket(
            AddressFamily::Unix,
            SockType::SeqPacket,
            SockFlag::SOCK_CLOEXEC,
            None,
        )
        .map_err(to_conn_err)?;
        let addr = UnixAddr::new(endpoint).map_err(to_conn_err)?;
        connect(fd.as_raw_fd(), &addr).map_err(to_conn_err)?;

        debug!("Connected to SEQPACKET endpoint {}", endpoint.display());
        Ok(Self {
            fd: Some(fd),
            endpoint: Some(endpoint.to_path_buf()),
        })
    }

    /// 包装一个已连接的 SEQPACKET 描述符
    pub fn from_owned_fd(fd: OwnedFd) -> Self {
        Self {
            fd: Some(fd),
            endpoint: None,
        }
    }

    /// 创建一对互联的匿名 SEQPACKET 套接字
    pub fn pair() -> io::Result<(Self, Self)> {
        let (a, b) = socketpair(
            AddressFamily::Unix,
            SockType::SeqPacket,
            None,
            SockFlag::SOCK_CLOEXEC,
        )
        .map_err(io::Error::from)?;
        Ok((Self::from_owned_fd(a), Self::from_owned_fd(b)))
    }

    /// 端点路径（匿名套接字为 `None`）
    pub fn endpoint(&self) -> Option<&Path> {
        self.endpoint.as_deref()
    }

    /// 连接是否仍然打开
    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    fn borrow_fd(&self) -> Result<BorrowedFd<'_>, TransportError> {
        self.fd
            .as_ref()
            .map(|fd| fd.as_fd())
            .ok_or_else(|| TransportError::Io(io::Error::from(io::ErrorKind::NotConnected)))
    }
}

impl MessageTransport for SeqPacketTransport {
    fn send(&mut self, message: &[u8]) -> Result<(), TransportError> {
        let fd = self.borrow_fd()?;
        // MSG_NOSIGNAL：对端关闭时返回 EPIPE 而不是触发 SIGPIPE
        let sent = send(fd.as_raw_fd(), message, MsgFlags::MSG_NOSIGNAL)
            .map_err(|e| TransportError::Io(io::Error::from(e)))?;
        if sent != message.len() {
            return Err(TransportError::ShortWrite {
                expected: message.len(),
                sent,
            });
        }
        trace!("SEQPACKET sent {} bytes: {:02X?}", sent, message);
        Ok(())
    }

    fn receive_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<usize, TransportError> {
        let fd = self.borrow_fd()?;

        let pollfd = PollFd::new(fd, PollFlags::POLLIN);
        match poll(&mut [pollfd], poll_timeout(timeout)) {
            Ok(0) => return Err(TransportError::Timeout),
            Ok(_) => {},
            // 被信号打断视同本次等待超时，由调用方决定是否继续
            Err(Errno::EINTR) => return Err(TransportError::Timeout),
            Err(e) => {
                return Err(TransportError::Io(io::Error::other(format!(
                    "poll failed: {}",
                    e
                ))));
            },
        }

        let received = match recv(fd.as_raw_fd(), buf, MsgFlags::empty()) {
            Ok(n) => n,
            Err(Errno::EAGAIN) => return Err(TransportError::Timeout),
            Err(e) => return Err(TransportError::Io(io::Error::from(e))),
        };

        // SEQPACKET 上读到 0 字节表示对端有序关闭
        if received == 0 {
            return Err(TransportError::Closed);
        }

        trace!("SEQPACKET received {} bytes", received);
        Ok(received)
    }

    fn shutdown(&mut self) -> Result<(), TransportError> {
        if let Some(fd) = self.fd.take() {
            match shutdown(fd.as_raw_fd(), Shutdown::Both) {
                Ok(()) | Err(Errno::ENOTCONN) => {},
                Err(e) => warn!("SEQPACKET shutdown failed: {}", e),
            }
            // fd 在此 drop，关闭描述符
        }
        Ok(())
    }
}

impl Drop for SeqPacketTransport {
    fn drop(&mut self) {
        let _ = MessageTransport::shutdown(self);
    }
}

/// 服务端监听套接字
///
/// 用于本地模拟端点（测试、离线调试）。Drop 时删除套接字文件。
pub struct SeqPacketListener {
    fd: OwnedFd,
    path: PathBuf,
}

impl SeqPacketListener {
    /// 在 `path` 上绑定并监听
    pub fn bind(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let fd = socket(
            AddressFamily::Unix,
            SockType::SeqPacket,
            SockFlag::SOCK_CLOEXEC,
            None,
        )
        .map_err(io::Error::from)?;
        let addr = UnixAddr::new(path.as_path()).map_err(io::Error::from)?;
        bind(fd.as_raw_fd(), &addr).map_err(io::Error::from)?;
        listen(&fd, Backlog::new(4).map_err(io::Error::from)?).map_err(io::Error::from)?;
        debug!("SEQPACKET listener bound at {}", path.display());
        Ok(Self { fd, path })
    }

    /// 接受一个连接（阻塞）
    pub fn accept(&self) -> io::Result<SeqPacketTransport> {
        let raw = accept(self.fd.as_raw_fd()).map_err(io::Error::from)?;
        // SAFETY: accept 刚返回的描述符由我们独占
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(SeqPacketTransport::from_owned_fd(fd))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SeqPacketListener {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
