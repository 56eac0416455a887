//! 样本来源
//!
//! 调度器只依赖 [`SampleSource`]：每次到采样时刻调用一次 `sample()`。

use crate::attitude::AttitudeProvider;
use crate::cancel::CancelFlag;
use crate::client::ProtocolClient;
use crate::error::ClientError;
use crate::sample::{AttitudeSample, CombinedSample, PositionSample};
use pupper_transport::MessageTransport;
use std::time::Instant;

/// 样本来源
pub trait SampleSource: Send {
    type Sample: Clone + Send + Sync + 'static;

    /// 取一个样本（阻塞直到得到结果或失败）
    fn sample(&mut self) -> Result<Self::Sample, ClientError>;

    /// 安装取消标志（可选）
    fn set_cancel_flag(&mut self, _cancel: CancelFlag) {}

    /// 停止时释放资源（可选，幂等）
    fn close(&mut self) {}
}

/// 位置来源：包装一个协议客户端
pub struct PositionSource<T: MessageTransport> {
    client: ProtocolClient<T>,
}

impl<T: MessageTransport> PositionSource<T> {
    pub fn new(client: ProtocolClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ProtocolClient<T> {
        &self.client
    }

    pub fn into_client(self) -> ProtocolClient<T> {
        self.client
    }
}

impl<T: MessageTransport + Send> SampleSource for PositionSource<T> {
    type Sample = PositionSample;

    fn sample(&mut self) -> Result<PositionSample, ClientError> {
        self.client.request_positions()
    }

    fn set_cancel_flag(&mut self, cancel: CancelFlag) {
        self.client.set_cancel_flag(cancel);
    }

    fn close(&mut self) {
        self.client.close();
    }
}

/// 姿态来源：读数逐分量归一化到 `(-180, 180]`
pub struct AttitudeSource<P: AttitudeProvider> {
    provider: P,
}

impl<P: AttitudeProvider> AttitudeSource<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn read(&mut self) -> Result<AttitudeSample, ClientError> {
        let reading = self.provider.get_attitude()?;
        if !reading.is_finite() {
            return Err(ClientError::UpstreamUnavailable(format!(
                "non-finite attitude reading: {:?}",
                reading
            )));
        }
        Ok(AttitudeSample::normalized(
            Instant::now(),
            reading.pitch,
            reading.yaw,
            reading.roll,
        ))
    }
}

impl<P: AttitudeProvider> SampleSource for AttitudeSource<P> {
    type Sample = AttitudeSample;

    fn sample(&mut self) -> Result<AttitudeSample, ClientError> {
        self.read()
    }
}

/// 位置 + 姿态：同一 tick 内先读位置再读姿态，任一失败即整个样本失败
pub struct CombinedSource<T: MessageTransport, P: AttitudeProvider> {
    positions: PositionSource<T>,
    attitude: AttitudeSource<P>,
}

impl<T: MessageTransport, P: AttitudeProvider> CombinedSource<T, P> {
    pub fn new(client: ProtocolClient<T>, provider: P) -> Self {
        Self {
            positions: PositionSource::new(client),
            attitude: AttitudeSource::new(provider),
        }
    }
}

impl<T: MessageTransport + Send, P: AttitudeProvider> SampleSource for CombinedSource<T, P> {
    type Sample = CombinedSample;

    fn sample(&mut self) -> Result<CombinedSample, ClientError> {
        let positions = self.positions.sample()?;
        let attitude = self.attitude.sample()?;
        Ok(CombinedSample {
            positions,
            attitude,
        })
    }

    fn set_cancel_flag(&mut self, cancel: CancelFlag) {
        self.positions.set_cancel_flag(cancel);
    }

    fn close(&mut self) {
        self.positions.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attitude::{AttitudeError, AttitudeReading};
    use crate::client::ClientConfig;
    use pupper_protocol::{ByteOrder, POSITION_CHANNELS, encode_positions_reply};
    use pupper_transport::MockTransport;
    use std::time::Duration;

    fn config() -> ClientConfig {
        ClientConfig {
            read_timeout: Some(Duration::from_millis(10)),
            poll_slice: Duration::from_millis(1),
            byte_order: ByteOrder::Little,
        }
    }

    #[test]
    fn test_attitude_source_normalizes() {
        let mut source =
            AttitudeSource::new(|| Ok::<_, AttitudeError>(AttitudeReading::new(359.0, -181.0, 540.0)));
        let sample = source.sample().unwrap();
        assert_eq!(sample.angles(), [-1.0, 179.0, 180.0]);
    }

    #[test]
    fn test_attitude_source_unavailable() {
        let mut source = AttitudeSource::new(|| Err::<AttitudeReading, _>(AttitudeError::new("imu offline")));
        assert!(matches!(
            source.sample(),
            Err(ClientError::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn test_attitude_source_rejects_nan() {
        let mut source = AttitudeSource::new(|| Ok::<_, AttitudeError>(AttitudeReading::new(0.0, f64::NAN, 0.0)));
        assert!(matches!(
            source.sample(),
            Err(ClientError::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn test_combined_source() {
        let (transport, handle) = MockTransport::new();
        handle.push_message(encode_positions_reply(&[5; POSITION_CHANNELS], ByteOrder::Little));
        let client = ProtocolClient::with_transport(transport, config());
        let mut source =
            CombinedSource::new(client, || Ok::<_, AttitudeError>(AttitudeReading::new(10.0, 20.0, -190.0)));

        let sample = source.sample().unwrap();
        assert_eq!(sample.positions.channels, [5; POSITION_CHANNELS]);
        assert_eq!(sample.attitude.angles(), [10.0, 20.0, 170.0]);

        source.close();
        assert_eq!(handle.shutdown_calls(), 1);
    }
}
