//! EC command/status handshake
//!
//! The EC consumes one input byte at a time and signals readiness for the next
//! one by clearing IBF in the status register. Results are signalled with OBF.
//!
//! ```text
//! write:  [IBF=0] cmd->SC  [IBF=0] addr->DATA  [IBF=0] value->DATA  [IBF=0]
//! read:   [IBF=0] 0x80->SC [IBF=0] addr->DATA  [OBF=1] DATA->value
//! ```
//!
//! The write path never logs: it runs inside the termination signal handler.

use cf_error::{ClevofanError, Result};
use tracing::warn;

use crate::constants::{ports, protocol, registers};
use crate::ec::decode;
use crate::ec::port::PortChannel;
use crate::ec::retry::RetryPolicy;

/// Register-level access to the EC on top of a [`PortChannel`]
#[derive(Debug)]
pub struct EcProtocol<P> {
    ports: P,
    retry: RetryPolicy,
}

impl<P: PortChannel> EcProtocol<P> {
    pub fn new(ports: P) -> Self {
        Self::with_retry(ports, RetryPolicy::ec_handshake())
    }

    pub fn with_retry(ports: P, retry: RetryPolicy) -> Self {
        Self { ports, retry }
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }

    pub fn into_inner(self) -> P {
        self.ports
    }

    /// Poll the status port until bit `flag` equals `value`
    pub fn wait_for(&mut self, flag: u8, value: u8) -> Result<()> {
        let chan = &mut self.ports;
        self.retry
            .run(|| {
                let data = chan.read_byte(ports::EC_SC);
                if (data >> flag) & 0x1 == value {
                    Ok(())
                } else {
                    Err(data)
                }
            })
            .map_err(|data| ClevofanError::Timeout {
                port: ports::EC_SC,
                flag,
                value,
                data,
            })
    }

    /// Wait for the EC to accept input, then hand it one byte
    fn send(&mut self, port: u16, byte: u8) -> Result<()> {
        self.wait_for(protocol::IBF, 0)?;
        self.ports.write_byte(port, byte);
        Ok(())
    }

    /// Write `value` to EC register `addr`
    ///
    /// Stops at the first handshake timeout; the remaining bytes are not sent.
    /// Success means the EC consumed the data byte.
    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<()> {
        self.send(ports::EC_SC, protocol::WRITE_CMD)?;
        self.send(ports::EC_DATA, addr)?;
        self.send(ports::EC_DATA, value)?;
        self.wait_for(protocol::IBF, 0)
    }

    /// Read EC register `addr`, failing on any handshake timeout
    pub fn read_register(&mut self, addr: u8) -> Result<u8> {
        self.send(ports::EC_SC, protocol::READ_CMD)?;
        self.send(ports::EC_DATA, addr)?;
        self.wait_for(protocol::OBF, 1)?;
        Ok(self.ports.read_byte(ports::EC_DATA))
    }

    /// Read EC register `addr`, logging handshake timeouts instead of failing
    ///
    /// Every step runs even after a timeout and the data port is read
    /// regardless, so the byte may be stale when a warning was logged.
    pub fn read_register_best_effort(&mut self, addr: u8) -> u8 {
        if let Err(e) = self.wait_for(protocol::IBF, 0) {
            warn!(register = addr, "{}", e);
        }
        self.ports.write_byte(ports::EC_SC, protocol::READ_CMD);

        if let Err(e) = self.wait_for(protocol::IBF, 0) {
            warn!(register = addr, "{}", e);
        }
        self.ports.write_byte(ports::EC_DATA, addr);

        if let Err(e) = self.wait_for(protocol::OBF, 1) {
            warn!(register = addr, "{}", e);
        }
        self.ports.read_byte(ports::EC_DATA)
    }

    /// Command fan 1 to `duty` percent
    pub fn write_fan_duty(&mut self, duty: u8) -> Result<()> {
        if duty > 100 {
            return Err(ClevofanError::InvalidDuty { value: i64::from(duty) });
        }
        self.write_register(registers::FAN_DUTY_WRITE_TARGET, decode::duty_to_raw(duty))
    }

    pub fn cpu_temp(&mut self) -> Result<u8> {
        self.read_register(registers::CPU_TEMP).map(decode::temperature)
    }

    pub fn gpu_temp(&mut self) -> Result<u8> {
        self.read_register(registers::GPU_TEMP).map(decode::temperature)
    }

    pub fn fan_duty(&mut self) -> Result<u8> {
        self.read_register(registers::FAN_DUTY).map(decode::duty_percent)
    }

    pub fn fan_rpm(&mut self) -> Result<u32> {
        let hi = self.read_register(registers::FAN_RPM_HI)?;
        let lo = self.read_register(registers::FAN_RPM_LO)?;
        Ok(decode::rpm(hi, lo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::port::MockPortChannel;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use std::time::Duration;

    const STATUS_IDLE: u8 = 0x00;
    const STATUS_IBF: u8 = 0x02;
    const STATUS_OBF: u8 = 0x01;

    fn fast(mock: MockPortChannel) -> EcProtocol<MockPortChannel> {
        EcProtocol::with_retry(mock, RetryPolicy::new(100, Duration::ZERO))
    }

    #[test]
    fn test_wait_for_ready_immediately() {
        let mut mock = MockPortChannel::new();
        mock.expect_read_byte()
            .with(eq(ports::EC_SC))
            .times(1)
            .return_const(STATUS_IDLE);
        assert!(fast(mock).wait_for(protocol::IBF, 0).is_ok());
    }

    #[test]
    fn test_wait_for_times_out_after_budget() {
        let mut mock = MockPortChannel::new();
        mock.expect_read_byte()
            .with(eq(ports::EC_SC))
            .times(100)
            .return_const(STATUS_IBF);

        let err = fast(mock).wait_for(protocol::IBF, 0).unwrap_err();
        match err {
            ClevofanError::Timeout { port, flag, value, data } => {
                assert_eq!(port, ports::EC_SC);
                assert_eq!(flag, protocol::IBF);
                assert_eq!(value, 0);
                assert_eq!(data, STATUS_IBF);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_wait_for_becomes_ready() {
        let mut mock = MockPortChannel::new();
        let mut polls = 0;
        mock.expect_read_byte().times(4).returning(move |_| {
            polls += 1;
            if polls < 4 { STATUS_IBF } else { STATUS_IDLE }
        });
        assert!(fast(mock).wait_for(protocol::IBF, 0).is_ok());
    }

    #[test]
    fn test_write_register_sequence() {
        let mut mock = MockPortChannel::new();
        let mut seq = Sequence::new();
        mock.expect_read_byte().return_const(STATUS_IDLE);
        mock.expect_write_byte()
            .with(eq(ports::EC_SC), eq(protocol::WRITE_CMD))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_write_byte()
            .with(eq(ports::EC_DATA), eq(0x01))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_write_byte()
            .with(eq(ports::EC_DATA), eq(0x66))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        assert!(fast(mock).write_register(0x01, 0x66).is_ok());
    }

    #[test]
    fn test_write_register_fails_fast() {
        let mut mock = MockPortChannel::new();
        let mut polls = 0;
        // Ready for the command byte, then stuck
        mock.expect_read_byte().returning(move |_| {
            polls += 1;
            if polls == 1 { STATUS_IDLE } else { STATUS_IBF }
        });
        mock.expect_write_byte()
            .with(eq(ports::EC_SC), eq(protocol::WRITE_CMD))
            .times(1)
            .return_const(());

        let err = fast(mock).write_register(0x01, 0x66).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_write_register_waits_for_final_consume() {
        let mut mock = MockPortChannel::new();
        let mut polls = 0;
        // Three sends succeed; the EC never consumes the data byte
        mock.expect_read_byte().returning(move |_| {
            polls += 1;
            if polls <= 3 { STATUS_IDLE } else { STATUS_IBF }
        });
        mock.expect_write_byte().times(3).return_const(());

        assert!(fast(mock).write_register(0x01, 0x66).unwrap_err().is_timeout());
    }

    #[test]
    fn test_read_register() {
        let mut mock = MockPortChannel::new();
        mock.expect_read_byte().returning(|port| {
            if port == ports::EC_SC { STATUS_OBF } else { 0x42 }
        });
        mock.expect_write_byte()
            .with(eq(ports::EC_SC), eq(protocol::READ_CMD))
            .times(1)
            .return_const(());
        mock.expect_write_byte()
            .with(eq(ports::EC_DATA), eq(registers::CPU_TEMP))
            .times(1)
            .return_const(());

        let mut ec = fast(mock);
        assert_eq!(ec.read_register(registers::CPU_TEMP).unwrap(), 0x42);
    }

    #[test]
    fn test_read_register_strict_times_out_without_obf() {
        let mut mock = MockPortChannel::new();
        mock.expect_read_byte().with(eq(ports::EC_SC)).return_const(STATUS_IDLE);
        mock.expect_write_byte().times(2).return_const(());

        let err = fast(mock).read_register(registers::GPU_TEMP).unwrap_err();
        match err {
            ClevofanError::Timeout { flag, value, .. } => {
                assert_eq!(flag, protocol::OBF);
                assert_eq!(value, 1);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_read_register_best_effort_returns_byte_on_timeout() {
        let mut mock = MockPortChannel::new();
        mock.expect_read_byte().returning(|port| {
            if port == ports::EC_SC { STATUS_IDLE } else { 0x37 }
        });
        mock.expect_write_byte().times(2).return_const(());

        let mut ec = fast(mock);
        assert_eq!(ec.read_register_best_effort(registers::GPU_TEMP), 0x37);
    }

    #[test]
    fn test_write_fan_duty_encodes_percent() {
        let mut mock = MockPortChannel::new();
        let mut seq = Sequence::new();
        mock.expect_read_byte().return_const(STATUS_IDLE);
        mock.expect_write_byte()
            .with(eq(ports::EC_SC), eq(protocol::WRITE_CMD))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_write_byte()
            .with(eq(ports::EC_DATA), eq(registers::FAN_DUTY_WRITE_TARGET))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_write_byte()
            .with(eq(ports::EC_DATA), eq(102))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        assert!(fast(mock).write_fan_duty(40).is_ok());
    }

    #[test]
    fn test_write_fan_duty_rejects_out_of_range() {
        // No expectations: any port access panics
        let mock = MockPortChannel::new();
        let err = fast(mock).write_fan_duty(101).unwrap_err();
        assert!(matches!(err, ClevofanError::InvalidDuty { value: 101 }));
    }

    #[test]
    fn test_fan_rpm_reads_both_registers() {
        let mut mock = MockPortChannel::new();
        mock.expect_write_byte().times(4).return_const(());
        // Tachometer hi=0x02 lo=0x9A; status always ready
        let mut reads = 0;
        mock.expect_read_byte().returning(move |port| {
            if port == ports::EC_SC {
                return STATUS_OBF;
            }
            reads += 1;
            if reads == 1 { 0x02 } else { 0x9A }
        });

        let mut ec = fast(mock);
        assert_eq!(ec.fan_rpm().unwrap(), 2_156_220 / 0x029A);
    }
}
