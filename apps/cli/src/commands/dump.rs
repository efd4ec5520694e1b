//! 帧打印命令
//!
//! 注册一个过滤器，把匹配的帧打印到标准输出，直到 Ctrl-C 或收满 `--count` 帧。

use super::TargetArgs;
use crate::config::CliConfig;
use crate::validation::parse_int;
use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::{RecvTimeoutError, unbounded};
use hostcan::{FilterRule, Frame, IdType};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// 打印命令参数
#[derive(Args, Debug)]
pub struct DumpCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    /// 过滤器 ID（支持 0x 前缀）
    #[arg(long, value_parser = parse_int, default_value = "0")]
    pub id: u32,

    /// 过滤器掩码，0 表示接收所有帧
    #[arg(long, value_parser = parse_int, default_value = "0")]
    pub mask: u32,

    /// 匹配扩展帧（默认标准帧）
    #[arg(short, long)]
    pub extended: bool,

    /// 收到这么多帧后退出
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}

impl DumpCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let id_type = if self.extended {
            IdType::Extended
        } else {
            IdType::Standard
        };
        let rule = FilterRule::new(self.id, self.mask, id_type);
        let controller = self.target.connect(config)?;

        // 回调运行在接收分发线程上，只转发，打印在主线程做
        let (tx, rx) = unbounded();
        let handle = controller.add_filter(rule, move |frame: Frame| {
            let _ = tx.send((Instant::now(), frame));
        })?;

        let running = Arc::new(AtomicBool::new(true));
        {
            let running = running.clone();
            ctrlc::set_handler(move || {
                debug!("Ctrl-C received, stopping dump");
                running.store(false, Ordering::SeqCst);
            })
            .context("failed to set Ctrl-C handler")?;
        }

        println!(
            "🎧 Listening on '{}' (filter {}: id=0x{:X}, mask=0x{:X}, {}), Ctrl-C to stop",
            controller.interface(),
            handle,
            self.id,
            self.mask,
            id_type.as_str()
        );

        let start = Instant::now();
        let mut received = 0usize;
        while running.load(Ordering::SeqCst) {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok((at, frame)) => {
                    received += 1;
                    println!("{}", format_frame(at.duration_since(start), &frame));
                    if self.count.is_some_and(|n| received >= n) {
                        break;
                    }
                },
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Filter {} channel disconnected, stopping dump", handle);
                    break;
                },
            }
        }

        controller.remove_filter(handle);
        let metrics = controller.metrics();
        debug!("Dump finished: {:?}", metrics);
        println!(
            "\n📊 {} frames printed ({} received, {} dispatched)",
            received, metrics.rx_frames_total, metrics.rx_frames_dispatched
        );
        Ok(())
    }
}

/// candump 风格的一行输出
fn format_frame(elapsed: Duration, frame: &Frame) -> String {
    let id = if frame.is_extended() {
        format!("{:08X}", frame.id)
    } else {
        format!("{:03X}", frame.id)
    };

    let body = if frame.rtr {
        format!("R{}", frame.dlc)
    } else {
        frame
            .data_slice()
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let marker = match (frame.fd, frame.brs) {
        (true, true) => " [FD,BRS]",
        (true, false) => " [FD]",
        _ => "",
    };

    format!(
        "({:>10.6}) {}  [{:>2}]  {}{}",
        elapsed.as_secs_f64(),
        id,
        frame.data_len(),
        body,
        marker
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_standard_frame() {
        let frame = Frame::new_standard(0x123, &[0xDE, 0xAD]);
        assert_eq!(
            format_frame(Duration::from_millis(1500), &frame),
            "(  1.500000) 123  [ 2]  DE AD"
        );
    }

    #[test]
    fn test_format_extended_remote_frame() {
        let frame = Frame::new_remote(0x1ABCDE, IdType::Extended, 4);
        assert_eq!(
            format_frame(Duration::ZERO, &frame),
            "(  0.000000) 001ABCDE  [ 0]  R4"
        );
    }

    #[test]
    fn test_format_fd_frame() {
        let frame = Frame::new_fd(0x10, IdType::Standard, &[0x11; 12], true).unwrap();
        let line = format_frame(Duration::ZERO, &frame);
        assert!(line.starts_with("(  0.000000) 010  [12]  11 11"));
        assert!(line.ends_with(" [FD,BRS]"));
    }
}
