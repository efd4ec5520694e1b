//! 命令模块

pub mod dump;
pub mod info;
pub mod send;

pub use dump::DumpCommand;
pub use info::InfoCommand;
pub use send::SendCommand;

use crate::config::CliConfig;
use anyhow::{Context, Result};
use clap::Args;
use hostcan::{Controller, ControllerBuilder};
use tracing::{debug, info};

/// 所有命令共用的连接参数
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// CAN 接口（覆盖配置文件）
    #[arg(short, long)]
    pub interface: Option<String>,

    /// 开启回环（本节点发出的帧也送入过滤器）
    #[arg(long)]
    pub loopback: bool,

    /// 开启 CAN FD
    #[arg(long)]
    pub fd: bool,
}

impl TargetArgs {
    /// 打开接口并构建控制器（已按参数设置模式并启动）
    pub fn connect(&self, config: &CliConfig) -> Result<Controller> {
        let interface = config.resolve_interface(self.interface.as_deref())?;
        let mode = config.mode(self.loopback, self.fd);
        debug!(
            "Connecting to '{}' (mode: {}, config: {:?})",
            interface, mode, config.controller
        );

        let controller = ControllerBuilder::new()
            .interface(interface.as_str())
            .config(config.controller.clone())
            .mode(mode)
            .auto_start(true)
            .build()
            .with_context(|| format!("failed to open controller on '{}'", interface))?;

        info!("Controller on '{}' started in {} mode", interface, mode);
        Ok(controller)
    }
}
