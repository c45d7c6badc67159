/*
 * This file is part of Clevofan.
 *
 * Copyright (C) 2025 Clevofan contributors
 *
 * Clevofan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Clevofan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Clevofan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Termination signal guard
//!
//! Any termination-style signal clears [`RUNNING`] and forces the fan to a
//! safe duty right inside the handler, so the fan is never left at a low duty
//! when the process goes away. The handler only touches atomics, the EC ports
//! and `write(2)`.
//!
//! Termination signals stay blocked while the handler runs, and the control
//! loop blocks them around its own duty write with a [`TerminationBlock`].
//! The safe duty is therefore the last value written to the EC.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use cf_core::constants::timing;
use cf_core::{ClevofanError, EcProtocol, IoPortChannel, PortChannel, Result};
use nix::sys::signal::{
    pthread_sigmask, sigaction, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};
use tracing::{debug, warn};

/// Cleared when the control loop should stop after the current tick
pub static RUNNING: AtomicBool = AtomicBool::new(true);

static SAFE_DUTY: AtomicU8 = AtomicU8::new(timing::SAFE_SHUTDOWN_DUTY);

/// Signals routed to the guard
pub const TERMINATION_SIGNALS: [Signal; 8] = [
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGPIPE,
    Signal::SIGALRM,
    Signal::SIGTERM,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
];

/// [`TERMINATION_SIGNALS`] as a signal set
pub fn termination_mask() -> SigSet {
    let mut mask = SigSet::empty();
    for signal in TERMINATION_SIGNALS {
        mask.add(signal);
    }
    mask
}

/// Keeps termination signals pending on the calling thread while alive
///
/// A signal raised in the meantime is delivered when the guard drops.
#[must_use]
pub struct TerminationBlock {
    previous: Option<SigSet>,
}

impl TerminationBlock {
    pub fn block() -> Self {
        let mut previous = SigSet::empty();
        match pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&termination_mask()), Some(&mut previous)) {
            Ok(()) => Self { previous: Some(previous) },
            Err(e) => {
                warn!("Failed to block termination signals: {}", e);
                Self { previous: None }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.previous.is_some()
    }
}

impl Drop for TerminationBlock {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&previous), None) {
                warn!("Failed to restore signal mask: {}", e);
            }
        }
    }
}

/// Register the guard for every signal in [`TERMINATION_SIGNALS`]
///
/// Taking the acquired channel ties registration to port access having been
/// granted; the handler builds its own channel from that grant.
pub fn install(_ports: &IoPortChannel, safe_duty: u8) -> Result<()> {
    if safe_duty > 100 {
        return Err(ClevofanError::InvalidDuty { value: i64::from(safe_duty) });
    }
    SAFE_DUTY.store(safe_duty, Ordering::Relaxed);

    let action = SigAction::new(
        SigHandler::Handler(handle_termination),
        SaFlags::empty(),
        termination_mask(),
    );
    for signal in TERMINATION_SIGNALS {
        // SAFETY: handle_termination is async-signal-safe (atomics, port I/O,
        // nanosleep and write only).
        unsafe { sigaction(signal, &action) }
            .map_err(|e| ClevofanError::signal(format!("{}: {}", signal.as_str(), e)))?;
    }
    debug!(safe_duty, "Termination handlers installed");
    Ok(())
}

/// Stop the loop and command `duty`
///
/// The flag is cleared first so the loop does not start another tick. Only
/// the call that actually clears it writes; later calls return `Ok(())`.
pub fn force_safe_duty<P: PortChannel>(
    running: &AtomicBool,
    ec: &mut EcProtocol<P>,
    duty: u8,
) -> Result<()> {
    if running.swap(false, Ordering::AcqRel) {
        ec.write_fan_duty(duty)
    } else {
        Ok(())
    }
}

extern "C" fn handle_termination(_signal: libc::c_int) {
    // SAFETY: install() takes an acquired IoPortChannel, so the process
    // already holds port permission when this runs.
    let mut ec = EcProtocol::new(unsafe { IoPortChannel::assume_acquired() });
    let msg: &[u8] = match force_safe_duty(&RUNNING, &mut ec, SAFE_DUTY.load(Ordering::Relaxed)) {
        Ok(()) => b"clevo-fancontrol: terminating, fan duty set to safe level\n",
        Err(_) => b"clevo-fancontrol: terminating, safe fan duty write failed\n",
    };
    // SAFETY: msg is a valid static buffer; write(2) is async-signal-safe.
    unsafe {
        libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
    }
}
