//! Loopback Echo 示例
//!
//! 在进程内虚拟总线上演示控制器的完整生命周期：
//! 配置模式 → 注册过滤器 → 启动 → 同步/异步发送 → 查看指标。
//!
//! 运行：
//! ```bash
//! RUST_LOG=hostcan_driver=debug cargo run -p hostcan --example loopback_echo
//! ```

use hostcan::prelude::*;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    hostcan::init_logger!();
    println!("🎯 hostcan Loopback Echo Example\n");

    let bus = VirtualBus::new();
    let controller = ControllerBuilder::new()
        .mode(ModeFlags::LOOPBACK | ModeFlags::FD)
        .build_with(bus.open("vcan-demo"))?;

    println!(
        "📋 Controller on '{}': capabilities = {}, max filters = {}",
        controller.interface(),
        controller.capabilities(),
        controller.max_filters(IdType::Standard)
    );

    controller.add_filter(FilterRule::new(0x100, 0x700, IdType::Standard), |frame: Frame| {
        println!(
            "  📥 RX: ID=0x{:03X}, dlc={}, fd={}, data={:02X?}",
            frame.id,
            frame.dlc,
            frame.fd,
            frame.data_slice()
        );
    })?;

    controller.start()?;
    println!("✅ Started (state: {})\n", controller.state().0);

    println!("📤 Synchronous send:");
    for i in 0..3u8 {
        let frame = Frame::new_standard(0x100 + i as u16, &[i, i + 1, i + 2]);
        controller.send_blocking(&frame, Duration::from_millis(100))?;
    }

    println!("\n📤 Asynchronous send (CAN FD, 24 bytes):");
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let frame = Frame::new_fd(0x1FF, IdType::Standard, &[0xA5; 24], true)?;
    controller.send_with_callback(&frame, Duration::from_millis(100), move |result| {
        let _ = done_tx.send(result);
    })?;
    done_rx.recv_timeout(Duration::from_secs(1))??;
    println!("  ✅ Confirmation received");

    controller.stop()?;

    let metrics = controller.metrics();
    println!("\n📊 Metrics:");
    println!("  TX frames:      {}", metrics.tx_frames_total);
    println!("  Confirmations:  {}", metrics.tx_confirmations);
    println!("  Loopback RX:    {}", metrics.rx_loopback_frames);
    println!("  Filter matches: {}", metrics.filter_matches);

    Ok(())
}
