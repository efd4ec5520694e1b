//! # hostcan CLI
//!
//! 在主机 SocketCAN 接口上使用软件 CAN 控制器的命令行工具。
//!
//! ```bash
//! # 查看控制器能力
//! hostcan-cli info --interface vcan0
//!
//! # 打印所有标准帧，直到 Ctrl-C
//! hostcan-cli dump --interface vcan0
//!
//! # 只看 0x120..=0x12F
//! hostcan-cli dump --interface vcan0 --id 0x120 --mask 0x7F0
//!
//! # 同步发送一帧
//! hostcan-cli send --interface vcan0 --id 0x123 DEADBEEF
//! ```
//!
//! `--config FILE` 指定 TOML 配置文件（接口名称、模式、控制器参数），
//! 命令行参数优先于配置文件。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod validation;

use commands::{DumpCommand, InfoCommand, SendCommand};
use config::CliConfig;

/// 缺省日志级别：命令输出走 stdout，日志只报告警告和错误
const DEFAULT_LOG_DIRECTIVE: &str = "warn";

/// hostcan CLI - 软件 CAN 控制器命令行工具
#[derive(Parser, Debug)]
#[command(name = "hostcan-cli")]
#[command(about = "Command-line interface for the hostcan software CAN controller", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML 配置文件
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 显示控制器能力与状态
    Info {
        #[command(flatten)]
        args: InfoCommand,
    },

    /// 注册一个过滤器并打印收到的帧
    Dump {
        #[command(flatten)]
        args: DumpCommand,
    },

    /// 同步发送一帧
    Send {
        #[command(flatten)]
        args: SendCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志（RUST_LOG 优先）
    hostcan::init_logger!(DEFAULT_LOG_DIRECTIVE);

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };

    match cli.command {
        Commands::Info { args } => args.execute(&config),
        Commands::Dump { args } => args.execute(&config),
        Commands::Send { args } => args.execute(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_log_directive() {
        let filter = hostcan::logging::build_filter(None, DEFAULT_LOG_DIRECTIVE);
        assert_eq!(filter.to_string(), "warn");

        let filter = hostcan::logging::build_filter(Some("hostcan_cli=debug"), DEFAULT_LOG_DIRECTIVE);
        assert_eq!(filter.to_string(), "hostcan_cli=debug");
    }

    #[test]
    fn test_parse_send_command() {
        let cli = Cli::parse_from([
            "hostcan-cli",
            "--config",
            "hostcan.toml",
            "send",
            "--interface",
            "vcan0",
            "--id",
            "0x123",
            "DEADBEEF",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("hostcan.toml")));
        match cli.command {
            Commands::Send { args } => {
                assert_eq!(args.target.interface.as_deref(), Some("vcan0"));
                assert_eq!(args.id, 0x123);
                assert_eq!(args.data, "DEADBEEF");
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_dump_defaults() {
        let cli = Cli::parse_from(["hostcan-cli", "dump", "-i", "vcan0"]);
        match cli.command {
            Commands::Dump { args } => {
                assert_eq!(args.id, 0);
                assert_eq!(args.mask, 0);
                assert!(!args.extended);
                assert!(args.count.is_none());
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
