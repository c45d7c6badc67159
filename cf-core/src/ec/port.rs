//! Port Channel
//!
//! Byte-wide transfers on the two legacy EC ports. Access must be granted by
//! the kernel first (`ioperm`), which requires root. No retries here; the
//! handshake layer owns the timing policy.

use cf_error::{ClevofanError, Result};
use tracing::debug;

use crate::constants::ports;

/// Raw 8-bit transfers on an I/O port
#[cfg_attr(test, mockall::automock)]
pub trait PortChannel {
    /// Read one byte from `port`
    fn read_byte(&mut self, port: u16) -> u8;

    /// Write one byte to `port`
    fn write_byte(&mut self, port: u16, value: u8);
}

/// The real EC ports, driven with `in`/`out` instructions
///
/// Only obtainable through [`IoPortChannel::acquire`] (or the unsafe
/// [`IoPortChannel::assume_acquired`]), so holding one means the kernel has
/// granted access to both ports.
#[derive(Debug)]
pub struct IoPortChannel {
    _granted: (),
}

impl IoPortChannel {
    /// Request I/O permission for the data and status/command ports
    ///
    /// Permission is held for the rest of the process lifetime.
    pub fn acquire() -> Result<Self> {
        for port in [ports::EC_DATA, ports::EC_SC] {
            grant(port)?;
            debug!("I/O permission granted on port {:#04x}", port);
        }
        Ok(Self { _granted: () })
    }

    /// Build a channel without requesting permission
    ///
    /// # Safety
    /// [`IoPortChannel::acquire`] must already have succeeded in this process;
    /// otherwise the first port instruction faults.
    pub unsafe fn assume_acquired() -> Self {
        Self { _granted: () }
    }
}

impl PortChannel for IoPortChannel {
    fn read_byte(&mut self, port: u16) -> u8 {
        // SAFETY: constructing Self requires that ioperm granted this process
        // access to the EC ports.
        unsafe { arch::inb(port) }
    }

    fn write_byte(&mut self, port: u16, value: u8) {
        // SAFETY: see read_byte.
        unsafe { arch::outb(port, value) }
    }
}

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
fn grant(port: u16) -> Result<()> {
    extern "C" {
        // glibc/musl sys/io.h
        fn ioperm(from: libc::c_ulong, num: libc::c_ulong, turn_on: libc::c_int) -> libc::c_int;
    }

    // SAFETY: ioperm only changes this process's I/O permission bitmap.
    let rc = unsafe { ioperm(libc::c_ulong::from(port), 1, 1) };
    if rc != 0 {
        return Err(ClevofanError::PermissionDenied {
            port,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
fn grant(port: u16) -> Result<()> {
    Err(ClevofanError::NotSupported(format!(
        "legacy port I/O on {:#04x} requires x86 Linux",
        port
    )))
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod arch {
    pub unsafe fn outb(port: u16, value: u8) {
        core::arch::asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
    }

    pub unsafe fn inb(port: u16) -> u8 {
        let value: u8;
        core::arch::asm!("in al, dx", in("dx") port, out("al") value, options(nomem, nostack, preserves_flags));
        value
    }
}

// Unreachable in practice: acquire() always fails on these targets.
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
mod arch {
    pub unsafe fn outb(_port: u16, _value: u8) {}

    pub unsafe fn inb(_port: u16) -> u8 {
        0xFF
    }
}
