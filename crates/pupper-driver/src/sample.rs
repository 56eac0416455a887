//! 采样数据类型
//!
//! 所有样本在写入缓冲区后不再修改；读者拿到的是副本。

use crate::angle::wrap_angle;
use pupper_protocol::POSITION_CHANNELS;
use std::time::Instant;

/// 12 路舵机位置（原始编码器单位）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSample {
    pub timestamp: Instant,
    pub channels: [u16; POSITION_CHANNELS],
}

impl PositionSample {
    pub fn new(timestamp: Instant, channels: [u16; POSITION_CHANNELS]) -> Self {
        Self {
            timestamp,
            channels,
        }
    }

    /// 单个通道（舵机 ID 从 1 开始，这里按 0 起始下标）
    pub fn channel(&self, index: usize) -> Option<u16> {
        self.channels.get(index).copied()
    }
}

/// 姿态（度），各分量已归一化到 `(-180, 180]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeSample {
    pub timestamp: Instant,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl AttitudeSample {
    /// 由原始角度构造，逐分量归一化
    pub fn normalized(timestamp: Instant, pitch: f64, yaw: f64, roll: f64) -> Self {
        Self {
            timestamp,
            pitch: wrap_angle(pitch),
            yaw: wrap_angle(yaw),
            roll: wrap_angle(roll),
        }
    }

    /// `[pitch, yaw, roll]`
    pub fn angles(&self) -> [f64; 3] {
        [self.pitch, self.yaw, self.roll]
    }
}

/// 同一 tick 内取得的位置 + 姿态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedSample {
    pub positions: PositionSample,
    pub attitude: AttitudeSample,
}
