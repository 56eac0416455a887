//! # Pupper Protocol
//!
//! Mini Pupper 控制器本地套接字协议定义（无 I/O 依赖）
//!
//! ## 模块
//!
//! - `opcode`: 操作码与每个操作码固定的应答长度
//! - `codec`: 请求编码、应答头校验、`u16` 数组解码
//!
//! ## 帧格式
//!
//! ```text
//! 请求: [length = 2, opcode]
//! 应答: [length = 总字节数, opcode, payload ...]
//! ```
//!
//! 应答长度按操作码固定（例如 `GetPositions` 为 26 字节），调用方事先已知，
//! 协议不做通用的变长分帧。
//!
//! ## 字节序
//!
//! 位置数组按控制器的本机字节序写出，部署时通过 [`ByteOrder`] 固定。

pub mod codec;
pub mod opcode;

// 重新导出常用类型
pub use codec::*;
pub use opcode::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 应答头与期望的 (length, opcode) 不一致
    #[error(
        "Bad reply header: expected (length={expected_length}, opcode={expected_opcode}), got (length={actual_length}, opcode={actual_opcode})"
    )]
    BadHeader {
        expected_length: u8,
        expected_opcode: u8,
        actual_length: u8,
        actual_opcode: u8,
    },

    /// 报文长度与声明不符
    #[error("Truncated message: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// 未知操作码
    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),
}

impl ProtocolError {
    /// 帧头错位（desync）类错误
    ///
    /// 两种错误都意味着会话已不可信，调用方必须关闭连接而不是重试。
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            ProtocolError::BadHeader { .. } | ProtocolError::Truncated { .. }
        )
    }
}
