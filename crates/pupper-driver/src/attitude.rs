//! 姿态数据源
//!
//! 姿态由外部 IMU 服务提供（可能是另一个进程或传感器驱动）。这里只定义接口：
//! 每次调用返回一组 `pitch` / `yaw` / `roll`（度，未归一化）。

use crate::error::ClientError;
use std::collections::HashMap;
use thiserror::Error;

/// 一次原始姿态读数（度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeReading {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl AttitudeReading {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// 从键值映射中取出 `pitch` / `yaw` / `roll`
    ///
    /// 缺键时返回 `AttitudeError`，多余的键忽略。
    pub fn from_map(values: &HashMap<String, f64>) -> Result<Self, AttitudeError> {
        let get = |key: &str| {
            values
                .get(key)
                .copied()
                .ok_or_else(|| AttitudeError::new(format!("missing field '{}'", key)))
        };
        Ok(Self {
            pitch: get("pitch")?,
            yaw: get("yaw")?,
            roll: get("roll")?,
        })
    }

    /// 三个分量是否都是有限值
    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }
}

/// 姿态服务不可用
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct AttitudeError(pub String);

impl AttitudeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<AttitudeError> for ClientError {
    fn from(err: AttitudeError) -> Self {
        ClientError::UpstreamUnavailable(err.0)
    }
}

/// 姿态提供者
pub trait AttitudeProvider: Send {
    fn get_attitude(&mut self) -> Result<AttitudeReading, AttitudeError>;
}

impl<F> AttitudeProvider for F
where
    F: FnMut() -> Result<AttitudeReading, AttitudeError> + Send,
{
    fn get_attitude(&mut self) -> Result<AttitudeReading, AttitudeError> {
        self()
    }
}
