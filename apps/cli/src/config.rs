//! 配置文件
//!
//! ```toml
//! interface = "vcan0"
//! loopback = false
//! fd = true
//!
//! [controller]
//! max_filters = 16
//! poll_interval_us = 500
//! confirm_timeout_ms = 200
//! ```
//!
//! `confirm_timeout_ms = 0` 表示同步发送一直等到确认。

use anyhow::{Context, Result};
use hostcan::{ControllerConfig, ModeFlags};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// 默认 CAN 接口
    pub interface: Option<String>,

    /// 默认开启回环
    pub loopback: bool,

    /// 默认开启 CAN FD
    pub fd: bool,

    /// 控制器参数
    pub controller: ControllerConfig,
}

impl CliConfig {
    /// 加载配置
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 确定接口（命令行参数优先）
    pub fn resolve_interface(&self, arg: Option<&str>) -> Result<String> {
        arg.or(self.interface.as_deref())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no interface given (use --interface or set `interface` in the config file)"))
    }

    /// 合并命令行开关与配置文件得到模式
    pub fn mode(&self, loopback: bool, fd: bool) -> ModeFlags {
        let mut mode = ModeFlags::NORMAL;
        if loopback || self.loopback {
            mode |= ModeFlags::LOOPBACK;
        }
        if fd || self.fd {
            mode |= ModeFlags::FD;
        }
        mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.controller.max_filters, 32);
    }

    #[test]
    fn test_parse_full_config() {
        let config = CliConfig::parse(
            r#"
interface = "vcan1"
fd = true

[controller]
max_filters = 8
confirm_timeout_ms = 250
"#,
        )
        .unwrap();

        assert_eq!(config.interface.as_deref(), Some("vcan1"));
        assert!(!config.loopback);
        assert_eq!(config.mode(false, false), ModeFlags::FD);
        assert_eq!(config.mode(true, false), ModeFlags::LOOPBACK | ModeFlags::FD);
        assert_eq!(config.controller.max_filters, 8);
        assert_eq!(config.controller.confirm_timeout_ms, Some(250));
        // 未出现的字段保持默认
        assert_eq!(config.controller.poll_interval_us, 1_000);
    }

    #[test]
    fn test_zero_confirm_timeout_means_unbounded() {
        let config = CliConfig::parse("[controller]\nconfirm_timeout_ms = 0\n").unwrap();
        assert_eq!(config.controller.confirm_timeout_ms, Some(0));
        assert_eq!(config.controller.confirm_timeout(), None);

        // 省略时取默认上限
        let config = CliConfig::parse("").unwrap();
        assert_eq!(
            config.controller.confirm_timeout(),
            Some(std::time::Duration::from_secs(1))
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interface = \"vcan0\"").unwrap();

        let config = CliConfig::load(file.path()).unwrap();
        assert_eq!(config.resolve_interface(None).unwrap(), "vcan0");
        assert_eq!(config.resolve_interface(Some("can1")).unwrap(), "can1");
    }

    #[test]
    fn test_missing_interface_is_an_error() {
        assert!(CliConfig::default().resolve_interface(None).is_err());
    }

    #[test]
    fn test_unknown_field_type_is_rejected() {
        assert!(CliConfig::parse("loopback = \"yes\"").is_err());
    }
}
