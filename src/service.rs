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

//! Automatic fan control loop
//!
//! Every tick reads the whole EC image, runs the threshold table over the
//! hotter of CPU and GPU and writes the result when it differs from what the
//! loop last selected. The loop stops once the running flag is cleared; the
//! flag is checked again right before a write, with termination signals
//! blocked, so a write never lands after the shutdown guard's safe duty.
//!
//! Error policy per tick:
//! - the EC image cannot be opened: fatal, the loop returns the error
//! - the read fails: the tick is skipped
//! - the image has the wrong size: the previous readings are reused, or the
//!   tick is skipped when there are none yet
//! - the duty write times out: logged, retried on the next tick

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use cf_core::constants::{paths, timing};
use cf_core::{
    next_duty, ClevofanError, DutyDecision, EcProtocol, EcSnapshot, PortChannel, Result,
    SnapshotSource, SysfsSnapshotReader,
};
use tracing::{debug, error, info, warn};

use crate::shutdown::TerminationBlock;

/// Runtime settings of the control loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Pause between two ticks
    pub poll_interval: Duration,
    /// Kernel EC image read on every tick
    pub snapshot_path: PathBuf,
    /// Duty forced when a termination signal arrives
    pub safe_duty: u8,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            poll_interval: timing::POLL_INTERVAL,
            snapshot_path: PathBuf::from(paths::EC_SYSFS_IO),
            safe_duty: timing::SAFE_SHUTDOWN_DUTY,
        }
    }
}

impl ServiceConfig {
    pub fn snapshot_reader(&self) -> SysfsSnapshotReader {
        SysfsSnapshotReader::new(&self.snapshot_path)
    }
}

/// Readings and decisions carried from one tick to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub cpu_temp: u8,
    pub gpu_temp: u8,
    /// Fan duty (percent) as last reported by the EC
    pub fan_duty: u8,
    /// Last duty the loop selected and wrote
    pub auto_duty: Option<u8>,
    /// At least one snapshot has been read
    observed: bool,
}

impl ControlState {
    fn observe(&mut self, snap: &EcSnapshot) {
        self.cpu_temp = snap.cpu_temp();
        self.gpu_temp = snap.gpu_temp();
        self.fan_duty = snap.fan_duty();
        self.observed = true;
    }

    pub fn has_readings(&self) -> bool {
        self.observed
    }

    /// A new selection is written; so is "off" while the fan still spins
    fn needs_write(&self, duty: u8) -> bool {
        self.auto_duty != Some(duty) || (duty == 0 && self.fan_duty != 0)
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// This duty was written
    Applied(u8),
    /// Nothing to write
    Unchanged,
    /// No fresh readings, or the write failed
    Skipped,
    /// The running flag was cleared before the write
    Stopped,
}

/// The control loop and the state it owns
pub struct ControlLoop<S, P> {
    source: S,
    ec: EcProtocol<P>,
    config: ServiceConfig,
    state: ControlState,
}

impl<S: SnapshotSource, P: PortChannel> ControlLoop<S, P> {
    pub fn new(source: S, ec: EcProtocol<P>, config: ServiceConfig) -> Self {
        Self {
            source,
            ec,
            config,
            state: ControlState::default(),
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn ec_mut(&mut self) -> &mut EcProtocol<P> {
        &mut self.ec
    }

    pub fn into_parts(self) -> (S, EcProtocol<P>) {
        (self.source, self.ec)
    }

    /// Run one read-decide-write cycle
    ///
    /// Only errors that make continued control unsafe are returned.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.tick_while(&AtomicBool::new(true))
    }

    /// Like [`tick`](Self::tick), but the duty is only written while
    /// `running` is still set
    pub fn tick_while(&mut self, running: &AtomicBool) -> Result<TickOutcome> {
        match self.source.read_snapshot() {
            Ok(snap) => self.state.observe(&snap),
            Err(e @ ClevofanError::SizeMismatch { .. }) if self.state.has_readings() => {
                warn!("{}, keeping previous readings", e);
            }
            Err(e @ ClevofanError::SizeMismatch { .. }) => {
                warn!("{}, no readings yet, skipping tick", e);
                return Ok(TickOutcome::Skipped);
            }
            Err(e) if e.is_recoverable() => {
                warn!("{}, skipping tick", e);
                return Ok(TickOutcome::Skipped);
            }
            Err(e) => return Err(e),
        }

        let ControlState { cpu_temp, gpu_temp, fan_duty, .. } = self.state;
        let DutyDecision::Set(duty) = next_duty(cpu_temp, gpu_temp, fan_duty) else {
            debug!(cpu_temp, gpu_temp, fan_duty, "no threshold rule matched");
            return Ok(TickOutcome::Unchanged);
        };
        if !self.state.needs_write(duty) {
            return Ok(TickOutcome::Unchanged);
        }

        let _blocked = TerminationBlock::block();
        if !running.load(Ordering::Acquire) {
            debug!(duty, "stop requested, dropping write");
            return Ok(TickOutcome::Stopped);
        }
        if let Err(e) = self.ec.write_fan_duty(duty) {
            error!(duty, "Failed to set fan duty: {}", e);
            return Ok(TickOutcome::Skipped);
        }
        self.state.auto_duty = Some(duty);
        info!("CPU={}°C, GPU={}°C, auto fan duty to {}%", cpu_temp, gpu_temp, duty);
        Ok(TickOutcome::Applied(duty))
    }

    /// Tick until `running` is cleared, sleeping the poll interval in between
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "Fan control loop started"
        );
        while running.load(Ordering::Acquire) {
            self.tick_while(running)?;
            if !self.config.poll_interval.is_zero() {
                thread::sleep(self.config.poll_interval);
            }
        }
        info!("worker quit");
        Ok(())
    }
}
