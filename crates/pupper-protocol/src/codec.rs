//! 报文编解码
//!
//! 请求固定 2 字节 `[REQUEST_LEN, opcode]`；应答按操作码固定长度，
//! 先校验帧头，再把 payload 解为 `u16` 数组。

use crate::opcode::{HEADER_LEN, Opcode, POSITION_CHANNELS, REQUEST_LEN};
use crate::ProtocolError;

/// `u16` 数组的字节序
///
/// 控制器用本机字节序写出位置数组；主机侧默认同样按本机字节序读取。
/// 跨字节序部署时应显式固定为 `Little` 或 `Big`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// 主机本机字节序
    #[default]
    Native,
    /// 小端
    Little,
    /// 大端
    Big,
}

impl ByteOrder {
    fn read_u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Native => u16::from_ne_bytes(bytes),
            ByteOrder::Little => u16::from_le_bytes(bytes),
            ByteOrder::Big => u16::from_be_bytes(bytes),
        }
    }

    fn write_u16(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::Native => value.to_ne_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }
}

/// 编码请求：`[2, opcode]`
pub fn encode_request(opcode: Opcode) -> [u8; 2] {
    [REQUEST_LEN, opcode.as_u8()]
}

/// 解码请求（守护进程/测试端点侧）
pub fn decode_request(raw: &[u8]) -> Result<Opcode, ProtocolError> {
    if raw.len() != REQUEST_LEN as usize {
        return Err(ProtocolError::Truncated {
            expected: REQUEST_LEN as usize,
            actual: raw.len(),
        });
    }
    if raw[0] != REQUEST_LEN {
        return Err(ProtocolError::BadHeader {
            expected_length: REQUEST_LEN,
            expected_opcode: raw[1],
            actual_length: raw[0],
            actual_opcode: raw[1],
        });
    }
    Opcode::from_u8(raw[1])
}

/// 校验应答帧头并返回 payload
///
/// # 错误
/// - `Truncated`: 报文不足 2 字节，无法读出帧头
/// - `BadHeader`: `raw[0] != expected_length` 或 `raw[1] != opcode`
pub fn decode_reply(opcode: Opcode, expected_length: u8, raw: &[u8]) -> Result<&[u8], ProtocolError> {
    if raw.len() < HEADER_LEN {
        return Err(ProtocolError::Truncated {
            expected: HEADER_LEN,
            actual: raw.len(),
        });
    }

    let (length, code) = (raw[0], raw[1]);
    if length != expected_length || code != opcode.as_u8() {
        return Err(ProtocolError::BadHeader {
            expected_length,
            expected_opcode: opcode.as_u8(),
            actual_length: length,
            actual_opcode: code,
        });
    }

    Ok(&raw[HEADER_LEN..])
}

/// 把 payload 解为 `count` 个 `u16`
///
/// payload 必须恰好为 `2 * count` 字节，否则返回 `Truncated`。
pub fn decode_uint16_array(
    payload: &[u8],
    count: usize,
    order: ByteOrder,
) -> Result<Vec<u16>, ProtocolError> {
    let expected = count * 2;
    if payload.len() != expected {
        return Err(ProtocolError::Truncated {
            expected,
            actual: payload.len(),
        });
    }

    Ok(payload
        .chunks_exact(2)
        .map(|pair| order.read_u16([pair[0], pair[1]]))
        .collect())
}

/// 解码 `GetPositions` 的 24 字节 payload
pub fn decode_positions(
    payload: &[u8],
    order: ByteOrder,
) -> Result<[u16; POSITION_CHANNELS], ProtocolError> {
    let values = decode_uint16_array(payload, POSITION_CHANNELS, order)?;
    let mut channels = [0u16; POSITION_CHANNELS];
    channels.copy_from_slice(&values);
    Ok(channels)
}

/// 编码 `u16` 数组（控制器侧格式，用于模拟端点）
pub fn encode_uint16_array(values: &[u16], order: ByteOrder) -> Vec<u8> {
    values.iter().flat_map(|v| order.write_u16(*v)).collect()
}

/// 编码应答：`[HEADER_LEN + payload.len(), opcode, payload ...]`
///
/// 长度字段按实际字节数填写；构造畸形应答请直接拼字节。
pub fn encode_reply(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push((HEADER_LEN + payload.len()) as u8);
    buf.push(opcode.as_u8());
    buf.extend_from_slice(payload);
    buf
}

/// 编码完整的 `GetPositions` 应答（26 字节）
pub fn encode_positions_reply(channels: &[u16; POSITION_CHANNELS], order: ByteOrder) -> Vec<u8> {
    encode_reply(Opcode::GetPositions, &encode_uint16_array(channels, order))
}
