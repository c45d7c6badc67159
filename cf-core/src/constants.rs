//! Constants and configuration values for Clevofan
//!
//! Centralizes every hardware address, protocol byte, threshold and timing
//! value. There is exactly one EC layout and one polling cadence, so these are
//! plain immutable data rather than runtime configuration.

use std::time::Duration;

/// Legacy I/O ports of the embedded controller
pub mod ports {
    /// Data port
    pub const EC_DATA: u16 = 0x62;
    /// Status (read) / command (write) port
    pub const EC_SC: u16 = 0x66;
}

/// Handshake bytes and status flags
pub mod protocol {
    /// Command byte: read the register whose address follows on the data port
    pub const READ_CMD: u8 = 0x80;
    /// Command byte: Clevo fan duty write, followed by target and value
    pub const WRITE_CMD: u8 = 0x99;

    /// Status bit asserted once the EC has data ready on the data port
    pub const OBF: u8 = 0x00;
    /// Status bit asserted while the EC has not consumed the last input byte
    pub const IBF: u8 = 0x01;

    /// Maximum status polls per handshake step
    pub const MAX_POLLS: u32 = 100;
    /// Delay between two status polls
    pub const POLL_INTERVAL_MICROS: u64 = 1;
}

/// EC register map
pub mod registers {
    /// Number of byte-wide registers in the EC image
    pub const EC_REG_SIZE: usize = 0x100;

    pub const CPU_TEMP: u8 = 0x07;
    pub const GPU_TEMP: u8 = 0xCD;
    pub const FAN_DUTY: u8 = 0xCE;
    pub const FAN_RPM_HI: u8 = 0xD0;
    pub const FAN_RPM_LO: u8 = 0xD1;

    /// Target byte of the duty write command (fan 1)
    pub const FAN_DUTY_WRITE_TARGET: u8 = 0x01;
}

/// Raw value conversions
pub mod decode {
    /// Full-scale raw fan duty
    pub const RAW_DUTY_MAX: u16 = 255;
    /// Hardware calibration factor: rpm = RPM_FACTOR / raw
    pub const RPM_FACTOR: u32 = 2_156_220;
}

/// Kernel interfaces
pub mod paths {
    /// EC register image exposed by the `ec_sys` module
    pub const EC_SYSFS_IO: &str = "/sys/kernel/debug/ec/ec0/io";
    /// Kernel module providing `EC_SYSFS_IO`
    pub const EC_SYS_MODULE: &str = "ec_sys";
}

/// Thermal control tuning
pub mod thermal {
    /// Stable fan duty operating points, in percent
    pub const CANONICAL_DUTIES: [u8; 7] = [0, 16, 30, 40, 65, 90, 100];

    /// A duty within this distance of a canonical level is treated as that level
    pub const DUTY_SNAP_TOLERANCE: u8 = 1;

    /// Escalations whose smoothed step lands further than this from the
    /// target use the smoothed step for the current tick
    pub const SMOOTHING_MIN_GAP: i32 = 2;

    /// Which way a rule compares temperature and duty
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RuleKind {
        /// `max_temp >= temp` and `duty < duty_bound`
        Escalate,
        /// `max_temp <= temp` and `duty >= duty_bound`
        DeEscalate,
        /// `max_temp <= temp`, regardless of duty
        Stop,
    }

    /// One row of the threshold table
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ThresholdRule {
        pub kind: RuleKind,
        pub temp: u8,
        pub duty_bound: u8,
        pub target: u8,
    }

    const fn rule(kind: RuleKind, temp: u8, duty_bound: u8, target: u8) -> ThresholdRule {
        ThresholdRule { kind, temp, duty_bound, target }
    }

    /// Ordered threshold rules; the first match wins
    pub const RULES: [ThresholdRule; 9] = [
        rule(RuleKind::Escalate, 85, 65, 65),
        rule(RuleKind::Escalate, 75, 40, 40),
        rule(RuleKind::Escalate, 65, 30, 30),
        rule(RuleKind::Escalate, 55, 17, 17),
        rule(RuleKind::Stop, 50, 0, 0),
        rule(RuleKind::DeEscalate, 60, 17, 17),
        rule(RuleKind::DeEscalate, 70, 30, 30),
        rule(RuleKind::DeEscalate, 80, 40, 40),
        rule(RuleKind::DeEscalate, 85, 65, 65),
    ];
}

/// Control loop timing and safety values
pub mod timing {
    use super::Duration;

    /// Period between two control ticks
    pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

    /// Duty forced on termination
    pub const SAFE_SHUTDOWN_DUTY: u8 = 40;
}

#[cfg(test)]
mod tests {
    use super::thermal::*;
    use super::*;

    #[test]
    fn test_canonical_duties_sorted_and_bounded() {
        assert!(CANONICAL_DUTIES.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(CANONICAL_DUTIES.last(), Some(&100));
    }

    #[test]
    fn test_rule_table_literal_values() {
        let rows: Vec<(RuleKind, u8, u8, u8)> =
            RULES.iter().map(|r| (r.kind, r.temp, r.duty_bound, r.target)).collect();
        assert_eq!(
            rows,
            vec![
                (RuleKind::Escalate, 85, 65, 65),
                (RuleKind::Escalate, 75, 40, 40),
                (RuleKind::Escalate, 65, 30, 30),
                (RuleKind::Escalate, 55, 17, 17),
                (RuleKind::Stop, 50, 0, 0),
                (RuleKind::DeEscalate, 60, 17, 17),
                (RuleKind::DeEscalate, 70, 30, 30),
                (RuleKind::DeEscalate, 80, 40, 40),
                (RuleKind::DeEscalate, 85, 65, 65),
            ]
        );
    }

    #[test]
    fn test_stop_threshold_below_lowest_escalation() {
        let stop = RULES.iter().find(|r| r.kind == RuleKind::Stop).unwrap();
        let lowest_up = RULES
            .iter()
            .filter(|r| r.kind == RuleKind::Escalate)
            .map(|r| r.temp)
            .min()
            .unwrap();
        assert!(stop.temp < lowest_up);
    }

    #[test]
    fn test_hardware_constants() {
        assert_eq!(ports::EC_DATA, 0x62);
        assert_eq!(ports::EC_SC, 0x66);
        assert_eq!(registers::EC_REG_SIZE, 256);
        assert_eq!(timing::POLL_INTERVAL, Duration::from_secs(2));
        assert_eq!(timing::SAFE_SHUTDOWN_DUTY, 40);
    }
}
