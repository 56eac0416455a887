//! 操作码与固定报文尺寸

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

// ============================================================================
// 报文尺寸常量
// ============================================================================

/// 帧头长度：`[length, opcode]`
pub const HEADER_LEN: usize = 2;

/// 请求长度（所有请求都只有帧头，无 payload）
pub const REQUEST_LEN: u8 = 2;

/// 舵机（关节）通道数
pub const POSITION_CHANNELS: usize = 12;

/// `GetPositions` 应答总长度：帧头 + 12 × u16
pub const POSITIONS_REPLY_LEN: u8 = (HEADER_LEN + POSITION_CHANNELS * 2) as u8;

/// 单条报文的最大长度（length 字段为 u8）
///
/// 接收缓冲区按此尺寸分配，超长应答不会被内核静默截断为合法长度。
pub const MAX_MESSAGE_LEN: usize = u8::MAX as usize;

// ============================================================================
// Opcode
// ============================================================================

/// 操作码
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum Opcode {
    /// 读取 12 路舵机当前位置
    GetPositions = 0x02,
}

impl Opcode {
    /// 从 u8 值解析操作码
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        Self::try_from_primitive(value).map_err(|e| ProtocolError::UnknownOpcode(e.number))
    }

    /// 原始字节值
    pub fn as_u8(self) -> u8 {
        self.into()
    }

    /// 该操作码应答的固定总长度（帧头 + payload）
    pub const fn reply_len(self) -> u8 {
        match self {
            Opcode::GetPositions => POSITIONS_REPLY_LEN,
        }
    }

    /// 该操作码应答的 payload 长度
    pub const fn reply_payload_len(self) -> usize {
        self.reply_len() as usize - HEADER_LEN
    }
}
