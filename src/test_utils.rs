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

//! Test helpers shared by the unit tests of this crate

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cf_core::constants::{ports, protocol, registers};
use cf_core::ec::decode;
use cf_core::{ClevofanError, EcSnapshot, PortChannel, Result, SnapshotSource};

/// Port channel whose EC is always ready; records every byte written
#[derive(Debug, Default)]
pub struct RecordingPorts {
    pub writes: Vec<(u16, u8)>,
    /// Byte returned for data port reads
    pub data: u8,
}

impl RecordingPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duties (percent) commanded so far, decoded from the write sequences
    pub fn duty_writes(&self) -> Vec<u8> {
        self.writes
            .windows(3)
            .filter_map(|w| match w {
                [(ports::EC_SC, protocol::WRITE_CMD), (ports::EC_DATA, registers::FAN_DUTY_WRITE_TARGET), (ports::EC_DATA, raw)] => {
                    Some(decode::duty_percent(*raw))
                }
                _ => None,
            })
            .collect()
    }
}

impl PortChannel for RecordingPorts {
    fn read_byte(&mut self, port: u16) -> u8 {
        if port == ports::EC_SC {
            // IBF clear, OBF set
            0x01
        } else {
            self.data
        }
    }

    fn write_byte(&mut self, port: u16, value: u8) {
        self.writes.push((port, value));
    }
}

/// Build a snapshot holding the given readings
pub fn snapshot(cpu: u8, gpu: u8, duty: u8) -> EcSnapshot {
    let mut snap = EcSnapshot::zeroed();
    snap.set_register(registers::CPU_TEMP, cpu);
    snap.set_register(registers::GPU_TEMP, gpu);
    snap.set_register(registers::FAN_DUTY, decode::duty_to_raw(duty));
    snap
}

/// Hands out a fixed list of read results, then clears `stop` (if any) and
/// keeps repeating soft I/O errors
pub struct ScriptedSource {
    script: VecDeque<Result<EcSnapshot>>,
    stop: Option<Arc<AtomicBool>>,
    pub reads: usize,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<EcSnapshot>>) -> Self {
        Self {
            script: script.into(),
            stop: None,
            reads: 0,
        }
    }

    pub fn stopping(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }
}

impl SnapshotSource for ScriptedSource {
    fn read_snapshot(&mut self) -> Result<EcSnapshot> {
        self.reads += 1;
        let next = self.script.pop_front();
        if self.script.is_empty() {
            if let Some(flag) = &self.stop {
                flag.store(false, Ordering::Release);
            }
        }
        next.unwrap_or_else(|| {
            Err(ClevofanError::from(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "script exhausted",
            )))
        })
    }
}
