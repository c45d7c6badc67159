//! Status Output
//!
//! The one-shot status dump printed after every CLI action. Field names are
//! part of the output format and stay stable.

use cf_error::Result;
use serde::Serialize;

use crate::ec::port::PortChannel;
use crate::ec::protocol::EcProtocol;
use crate::ec::snapshot::EcSnapshot;

/// Decoded fan and temperature readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FanStatus {
    /// Fan duty in percent
    pub duty: u8,
    pub rpms: u32,
    pub cpu_temp_cels: u8,
    pub gpu_temp_cels: u8,
}

impl FanStatus {
    pub fn from_snapshot(snap: &EcSnapshot) -> Self {
        Self {
            duty: snap.fan_duty(),
            rpms: snap.fan_rpm(),
            cpu_temp_cels: snap.cpu_temp(),
            gpu_temp_cels: snap.gpu_temp(),
        }
    }

    /// Read the current state register by register over the handshake
    pub fn poll<P: PortChannel>(ec: &mut EcProtocol<P>) -> Result<Self> {
        EcSnapshot::poll(ec).map(|snap| Self::from_snapshot(&snap))
    }

    /// Pretty-printed JSON object, one field per line
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::registers;

    fn snapshot(cpu: u8, gpu: u8, raw_duty: u8, hi: u8, lo: u8) -> EcSnapshot {
        let mut snap = EcSnapshot::zeroed();
        snap.set_register(registers::CPU_TEMP, cpu);
        snap.set_register(registers::GPU_TEMP, gpu);
        snap.set_register(registers::FAN_DUTY, raw_duty);
        snap.set_register(registers::FAN_RPM_HI, hi);
        snap.set_register(registers::FAN_RPM_LO, lo);
        snap
    }

    #[test]
    fn test_from_snapshot_decodes() {
        let status = FanStatus::from_snapshot(&snapshot(61, 48, 102, 0x02, 0x9A));
        assert_eq!(
            status,
            FanStatus {
                duty: 40,
                rpms: 2_156_220 / 0x029A,
                cpu_temp_cels: 61,
                gpu_temp_cels: 48,
            }
        );
    }

    #[test]
    fn test_json_field_names_and_order() {
        let status = FanStatus::from_snapshot(&snapshot(55, 50, 0, 0, 0));
        let json = status.to_json_pretty().unwrap();
        assert_eq!(
            json,
            "{\n  \"duty\": 0,\n  \"rpms\": 0,\n  \"cpu_temp_cels\": 55,\n  \"gpu_temp_cels\": 50\n}"
        );
    }

    #[test]
    fn test_json_parses_back() {
        let status = FanStatus::from_snapshot(&snapshot(70, 66, 255, 0x01, 0x00));
        let value: serde_json::Value = serde_json::from_str(&status.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["duty"], 100);
        assert_eq!(value["rpms"], 2_156_220 / 256);
        assert_eq!(value["cpu_temp_cels"], 70);
        assert_eq!(value["gpu_temp_cels"], 66);
    }
}
