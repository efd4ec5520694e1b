//! 发送命令

use super::TargetArgs;
use crate::config::CliConfig;
use crate::validation::{build_frame, parse_data, parse_int};
use anyhow::{Context, Result};
use clap::Args;
use std::time::Duration;
use tracing::debug;

/// 发送命令参数
#[derive(Args, Debug)]
pub struct SendCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    /// CAN ID（支持 0x 前缀）
    #[arg(long, value_parser = parse_int)]
    pub id: u32,

    /// 扩展帧（29-bit ID）
    #[arg(short, long)]
    pub extended: bool,

    /// 波特率切换（仅 FD 帧）
    #[arg(long, requires = "fd")]
    pub brs: bool,

    /// 等待发送权的超时（毫秒）
    #[arg(long, default_value_t = 100)]
    pub timeout_ms: u64,

    /// 十六进制数据（如 DEADBEEF 或 DE:AD:BE:EF）
    #[arg(default_value = "")]
    pub data: String,
}

impl SendCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let data = parse_data(&self.data)?;
        let frame = build_frame(self.id, self.extended, self.target.fd, self.brs, &data)?;
        let controller = self.target.connect(config)?;

        println!(
            "📤 Sending ID=0x{:X} ({}), dlc={}, data={:02X?}",
            frame.id,
            frame.id_type.as_str(),
            frame.dlc,
            frame.data_slice()
        );

        controller
            .send_blocking(&frame, Duration::from_millis(self.timeout_ms))
            .with_context(|| format!("send on '{}' failed", controller.interface()))?;

        debug!("TX metrics after send: {:?}", controller.metrics());
        println!("✅ Confirmed");
        Ok(())
    }
}
