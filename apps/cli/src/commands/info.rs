//! 能力查询命令

use super::TargetArgs;
use crate::config::CliConfig;
use anyhow::Result;
use clap::Args;
use hostcan::IdType;

/// 查询命令参数
#[derive(Args, Debug)]
pub struct InfoCommand {
    #[command(flatten)]
    pub target: TargetArgs,
}

impl InfoCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let controller = self.target.connect(config)?;
        let (state, counters) = controller.state();
        let timing_max = controller.timing_max();

        println!("🔌 Interface:     {}", controller.interface());
        println!("🧩 Capabilities:  {}", controller.capabilities());
        println!("⚙️  Mode:          {}", controller.mode());
        println!(
            "📋 Max filters:   {} (standard) / {} (extended)",
            controller.max_filters(IdType::Standard),
            controller.max_filters(IdType::Extended)
        );
        println!("⏱️  Core clock:    {} Hz", controller.core_clock());
        println!(
            "📐 Timing range:  sjw ≤ {}, seg ≤ {}/{}/{}, prescaler ≤ {}",
            timing_max.sjw,
            timing_max.prop_seg,
            timing_max.phase_seg1,
            timing_max.phase_seg2,
            timing_max.prescaler
        );
        println!(
            "📊 State:         {} (tx_err={}, rx_err={})",
            state, counters.tx_err_cnt, counters.rx_err_cnt
        );
        Ok(())
    }
}
