//! EC register snapshots
//!
//! A snapshot is one 256-byte image of the EC register space. The control loop
//! gets it in a single read from the `ec_sys` debugfs file; one-shot queries
//! synthesize one from individual handshake reads.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use cf_error::{ClevofanError, Result};

use crate::constants::{paths, registers};
use crate::ec::decode;
use crate::ec::port::PortChannel;
use crate::ec::protocol::EcProtocol;

/// The EC register space captured at one instant
#[derive(Clone, PartialEq, Eq)]
pub struct EcSnapshot {
    regs: [u8; registers::EC_REG_SIZE],
}

impl EcSnapshot {
    pub fn zeroed() -> Self {
        Self { regs: [0; registers::EC_REG_SIZE] }
    }

    /// Build from a full register image; any other length is rejected
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let regs = <[u8; registers::EC_REG_SIZE]>::try_from(bytes).map_err(|_| {
            ClevofanError::SizeMismatch {
                expected: registers::EC_REG_SIZE,
                actual: bytes.len(),
            }
        })?;
        Ok(Self { regs })
    }

    /// Synthesize a snapshot from per-register handshake reads
    ///
    /// Only the thermal registers are filled in, the rest stay zero. The reads
    /// happen one after another, so the values are not from the same instant.
    pub fn poll<P: PortChannel>(ec: &mut EcProtocol<P>) -> Result<Self> {
        let mut snap = Self::zeroed();
        for addr in [
            registers::CPU_TEMP,
            registers::GPU_TEMP,
            registers::FAN_DUTY,
            registers::FAN_RPM_HI,
            registers::FAN_RPM_LO,
        ] {
            snap.set_register(addr, ec.read_register(addr)?);
        }
        Ok(snap)
    }

    pub fn register(&self, addr: u8) -> u8 {
        self.regs[usize::from(addr)]
    }

    pub fn set_register(&mut self, addr: u8, value: u8) {
        self.regs[usize::from(addr)] = value;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.regs
    }

    pub fn cpu_temp(&self) -> u8 {
        decode::temperature(self.register(registers::CPU_TEMP))
    }

    pub fn gpu_temp(&self) -> u8 {
        decode::temperature(self.register(registers::GPU_TEMP))
    }

    /// Current fan duty in percent
    pub fn fan_duty(&self) -> u8 {
        decode::duty_percent(self.register(registers::FAN_DUTY))
    }

    pub fn fan_rpm(&self) -> u32 {
        decode::rpm(
            self.register(registers::FAN_RPM_HI),
            self.register(registers::FAN_RPM_LO),
        )
    }
}

impl Default for EcSnapshot {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for EcSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcSnapshot")
            .field("cpu_temp", &self.cpu_temp())
            .field("gpu_temp", &self.gpu_temp())
            .field("fan_duty", &self.fan_duty())
            .field("fan_rpm", &self.fan_rpm())
            .finish_non_exhaustive()
    }
}

/// Anything that can hand the control loop a fresh snapshot
pub trait SnapshotSource {
    fn read_snapshot(&mut self) -> Result<EcSnapshot>;
}

/// Bulk reader for the kernel-exposed EC image
///
/// The file is opened and closed on every call; no handle outlives a read.
#[derive(Debug, Clone)]
pub struct SysfsSnapshotReader {
    path: PathBuf,
}

impl SysfsSnapshotReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for SysfsSnapshotReader {
    fn default() -> Self {
        Self::new(paths::EC_SYSFS_IO)
    }
}

impl SnapshotSource for SysfsSnapshotReader {
    /// One `read` call into a buffer one byte larger than the image, so both
    /// short and long images show up as a size mismatch.
    fn read_snapshot(&mut self) -> Result<EcSnapshot> {
        let mut file = File::open(&self.path).map_err(|source| ClevofanError::SnapshotOpen {
            path: self.path.clone(),
            source,
        })?;
        let mut buf = [0u8; registers::EC_REG_SIZE + 1];
        let len = file.read(&mut buf)?;
        EcSnapshot::from_bytes(&buf[..len])
    }
}
