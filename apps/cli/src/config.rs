//! 配置加载
//!
//! 优先级：命令行参数 > `--config` 指定的文件 > 默认配置文件 > 内置默认值。
//! 默认配置文件为 `<config_dir>/pupper/telemetry.toml`，不存在时忽略。

use anyhow::{Context, Result};
use clap::ValueEnum;
use pupper_driver::{ByteOrder, ClientConfig, DEFAULT_ENDPOINT, SamplerConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 字节序选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrderArg {
    Native,
    Little,
    Big,
}

impl From<ByteOrderArg> for ByteOrder {
    fn from(arg: ByteOrderArg) -> Self {
        match arg {
            ByteOrderArg::Native => ByteOrder::Native,
            ByteOrderArg::Little => ByteOrder::Little,
            ByteOrderArg::Big => ByteOrder::Big,
        }
    }
}

/// 配置文件内容（所有字段可选）
///
/// ```toml
/// endpoint = "/tmp/9Lq7BNBnBycd6nxy.socket"
/// read_freq = 1000.0
/// plot_freq = 30.0
/// capacity = 10000
/// window = 300
/// timeout_ms = 1000
/// byte_order = "native"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<PathBuf>,
    pub read_freq: Option<f64>,
    pub plot_freq: Option<f64>,
    pub capacity: Option<usize>,
    pub window: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub byte_order: Option<ByteOrderArg>,
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid configuration file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In {}", path.display()))
    }

    /// 读取显式指定的文件；未指定时尝试默认路径
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// 默认配置文件路径
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pupper").join("telemetry.toml"))
}

/// 命令行覆盖项（与 `FileConfig` 同名字段）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub endpoint: Option<PathBuf>,
    pub read_freq: Option<f64>,
    pub plot_freq: Option<f64>,
    pub capacity: Option<usize>,
    pub window: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub byte_order: Option<ByteOrderArg>,
}

/// 最终生效的配置
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: PathBuf,
    pub client: ClientConfig,
    pub sampler: SamplerConfig,
}

impl Settings {
    /// 合并文件与命令行，并校验采样参数
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self> {
        let endpoint = cli
            .endpoint
            .or(file.endpoint)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENDPOINT));

        let defaults = SamplerConfig::default();
        let read_freq = cli.read_freq.or(file.read_freq).unwrap_or(defaults.read_freq);
        let plot_freq = cli.plot_freq.or(file.plot_freq).unwrap_or(defaults.plot_freq);

        // 容量 / 窗口默认跟随采样频率（10 秒数据）
        let rated = SamplerConfig::with_rates(read_freq, plot_freq);
        let sampler = SamplerConfig {
            buffer_capacity: cli.capacity.or(file.capacity).unwrap_or(rated.buffer_capacity),
            window_len: cli.window.or(file.window).unwrap_or(rated.window_len),
            ..rated
        };
        sampler.validate()?;

        let mut client = ClientConfig::default();
        if let Some(ms) = cli.timeout_ms.or(file.timeout_ms) {
            // 0 表示不设上限（仍可 Ctrl+C 取消）
            client.read_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(order) = cli.byte_order.or(file.byte_order) {
            client.byte_order = order.into();
        }

        Ok(Self {
            endpoint,
            client,
            sampler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let file = FileConfig::parse(
            r#"
endpoint = "/run/pupper.socket"
read_freq = 500.0
plot_freq = 20.0
capacity = 100
window = 50
timeout_ms = 250
byte_order = "little"
"#,
        )
        .unwrap();
        assert_eq!(file.endpoint, Some(PathBuf::from("/run/pupper.socket")));
        assert_eq!(file.byte_order, Some(ByteOrderArg::Little));
        assert_eq!(file.timeout_ms, Some(250));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(FileConfig::parse("interface = \"can0\"").is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(FileConfig::default(), Overrides::default()).unwrap();
        assert_eq!(settings.endpoint, PathBuf::from(DEFAULT_ENDPOINT));
        assert_eq!(settings.sampler.read_freq, 1000.0);
        assert_eq!(settings.sampler.plot_freq, 30.0);
        assert_eq!(settings.sampler.buffer_capacity, 10_000);
        assert_eq!(settings.client, ClientConfig::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig {
            endpoint: Some("/from/file.socket".into()),
            read_freq: Some(200.0),
            timeout_ms: Some(100),
            ..Default::default()
        };
        let cli = Overrides {
            read_freq: Some(50.0),
            timeout_ms: Some(0),
            byte_order: Some(ByteOrderArg::Big),
            ..Default::default()
        };

        let settings = Settings::resolve(file, cli).unwrap();
        assert_eq!(settings.endpoint, PathBuf::from("/from/file.socket"));
        assert_eq!(settings.sampler.read_freq, 50.0);
        // 容量跟随最终采样频率
        assert_eq!(settings.sampler.buffer_capacity, 500);
        assert_eq!(settings.client.read_timeout, None);
        assert_eq!(settings.client.byte_order, ByteOrder::Big);
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let cli = Overrides {
            plot_freq: Some(-1.0),
            ..Default::default()
        };
        let err = Settings::resolve(FileConfig::default(), cli).unwrap_err();
        assert!(err.to_string().contains("plot_freq"));

        // 周期超出可表示范围的极低频率同样返回错误
        let cli = Overrides {
            plot_freq: Some(1e-20),
            ..Default::default()
        };
        let err = Settings::resolve(FileConfig::default(), cli).unwrap_err();
        assert!(err.to_string().contains("plot_freq"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.toml");
        fs::write(&path, "capacity = 42\n").unwrap();

        let file = FileConfig::discover(Some(&path)).unwrap();
        assert_eq!(file.capacity, Some(42));

        assert!(FileConfig::discover(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
