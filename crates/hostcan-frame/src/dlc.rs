//! DLC 换算
//!
//! CAN FD 的 DLC 9-15 不再等于字节数，而是映射到 12/16/20/24/32/48/64 字节。

/// CAN 2.0 最大 DLC
pub const CAN_MAX_DLC: u8 = 8;

/// CAN FD 最大 DLC
pub const CANFD_MAX_DLC: u8 = 15;

/// CAN 2.0 最大数据长度
pub const CAN_MAX_DATA_LEN: usize = 8;

/// CAN FD 最大数据长度
pub const CANFD_MAX_DATA_LEN: usize = 64;

const DLC_TO_BYTES: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

/// DLC -> 数据字节数（超过 15 的 DLC 按 15 处理）
pub const fn dlc_to_bytes(dlc: u8) -> usize {
    let idx = if dlc > CANFD_MAX_DLC { CANFD_MAX_DLC } else { dlc };
    DLC_TO_BYTES[idx as usize] as usize
}

/// 数据字节数 -> 最小可容纳的 DLC
pub const fn bytes_to_dlc(len: usize) -> u8 {
    match len {
        0..=8 => len as u8,
        9..=12 => 9,
        13..=16 => 10,
        17..=20 => 11,
        21..=24 => 12,
        25..=32 => 13,
        33..=48 => 14,
        _ => 15,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dlc_to_bytes_classic_range_is_identity() {
        for dlc in 0..=CAN_MAX_DLC {
            assert_eq!(dlc_to_bytes(dlc), dlc as usize);
        }
    }

    #[test]
    fn test_dlc_to_bytes_fd_range() {
        assert_eq!(dlc_to_bytes(9), 12);
        assert_eq!(dlc_to_bytes(13), 32);
        assert_eq!(dlc_to_bytes(15), 64);
        assert_eq!(dlc_to_bytes(200), 64);
    }

    #[test]
    fn test_bytes_to_dlc_rounds_up() {
        assert_eq!(bytes_to_dlc(0), 0);
        assert_eq!(bytes_to_dlc(8), 8);
        assert_eq!(bytes_to_dlc(9), 9);
        assert_eq!(bytes_to_dlc(12), 9);
        assert_eq!(bytes_to_dlc(13), 10);
        assert_eq!(bytes_to_dlc(33), 14);
        assert_eq!(bytes_to_dlc(64), 15);
    }

    #[test]
    fn test_dlc_roundtrip_all_codes() {
        for dlc in 0..=CANFD_MAX_DLC {
            assert_eq!(bytes_to_dlc(dlc_to_bytes(dlc)), dlc);
        }
    }
}
