//! CAN 接口状态检查
//!
//! 使用 ioctl 系统调用检查 Linux 网络接口是否存在且已启动（UP 状态）。
//! 只读检查，不需要特殊权限。

use crate::{DeviceError, DeviceErrorKind, TransportError};
use libc::{AF_INET, IFF_UP, SIOCGIFFLAGS, SOCK_DGRAM, if_nametoindex, ifreq};
use std::ffi::CString;
use std::io;
use tracing::trace;

/// ifr_name 为 IFNAMSIZ = 16 字节（含结尾 NUL）
const MAX_IFACE_NAME_LEN: usize = 15;

/// 检查接口是否存在且已启动（管理态 UP）
///
/// # 返回值
/// - `Ok(true)`: 接口存在且 IFF_UP 置位
/// - `Ok(false)`: 接口存在但处于 DOWN 状态
/// - `Err(TransportError::Device)`: 接口不存在或接口名无效
/// - `Err(TransportError::Io)`: socket/ioctl 失败
pub fn check_interface_status(interface: &str) -> Result<bool, TransportError> {
    if interface.is_empty() || interface.len() > MAX_IFACE_NAME_LEN {
        return Err(DeviceError::new(
            DeviceErrorKind::UnsupportedConfig,
            format!(
                "Interface name '{}' must be 1..={} characters",
                interface, MAX_IFACE_NAME_LEN
            ),
        )
        .into());
    }

    let c_iface = CString::new(interface).map_err(|e| {
        DeviceError::new(
            DeviceErrorKind::UnsupportedConfig,
            format!("Invalid interface name: {}", e),
        )
    })?;

    let ifindex = unsafe { if_nametoindex(c_iface.as_ptr()) };
    if ifindex == 0 {
        let errno = io::Error::last_os_error();
        return Err(DeviceError::new(
            DeviceErrorKind::NotFound,
            format!(
                "CAN interface '{}' does not exist ({}). Please create it first:\n  sudo ip link add dev {} type vcan",
                interface, errno, interface
            ),
        )
        .into());
    }

    let mut ifr: ifreq = unsafe { std::mem::zeroed() };
    let name = interface.as_bytes();
    unsafe {
        std::ptr::copy_nonoverlapping(
            name.as_ptr(),
            ifr.ifr_name.as_mut_ptr() as *mut u8,
            name.len(),
        );
    }
    ifr.ifr_name[name.len()] = 0;

    struct FdGuard(libc::c_int);
    impl Drop for FdGuard {
        fn drop(&mut self) {
            if self.0 >= 0 {
                unsafe { libc::close(self.0) };
            }
        }
    }

    let sockfd = unsafe { libc::socket(AF_INET, SOCK_DGRAM, 0) };
    if sockfd < 0 {
        return Err(TransportError::Io(io::Error::last_os_error()));
    }
    let _guard = FdGuard(sockfd);

    let result = unsafe { libc::ioctl(sockfd, SIOCGIFFLAGS, &mut ifr as *mut _ as *mut libc::c_void) };
    if result < 0 {
        return Err(TransportError::Io(io::Error::last_os_error()));
    }

    // ifru_flags 是 ifr_ifru 联合体的第一个字段（c_short）
    let flags = unsafe { *(std::ptr::addr_of!(ifr.ifr_ifru) as *const libc::c_short) };
    let is_up = (flags as i32 & IFF_UP) != 0;

    trace!(
        "Interface '{}' status: {}",
        interface,
        if is_up { "UP" } else { "DOWN" }
    );
    Ok(is_up)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_kind(result: Result<bool, TransportError>) -> DeviceErrorKind {
        match result {
            Err(TransportError::Device(e)) => e.kind,
            other => panic!("Expected Device error, got: {:?}", other),
        }
    }

    #[test]
    fn test_check_interface_status_not_exists() {
        let result = check_interface_status("hcan999");
        if let Err(TransportError::Device(e)) = &result {
            assert_eq!(e.kind, DeviceErrorKind::NotFound);
            assert!(e.message.contains("ip link add"), "got: {}", e.message);
        } else {
            panic!("Expected Device error, got: {:?}", result);
        }
    }

    #[test]
    fn test_check_interface_status_invalid_name() {
        assert_eq!(
            device_kind(check_interface_status("can0\0")),
            DeviceErrorKind::UnsupportedConfig
        );
        assert_eq!(
            device_kind(check_interface_status("")),
            DeviceErrorKind::UnsupportedConfig
        );
    }

    #[test]
    fn test_check_interface_status_too_long_name() {
        assert_eq!(
            device_kind(check_interface_status(&"a".repeat(20))),
            DeviceErrorKind::UnsupportedConfig
        );
    }

    #[test]
    fn test_check_interface_status_loopback_is_up() {
        // "lo" 在几乎所有 Linux 环境中都存在且处于 UP 状态
        if let Ok(up) = check_interface_status("lo") {
            assert!(up);
        }
    }
}
