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

//! Command line handling
//!
//! ```text
//! clevo-fancontrol          dump the current status
//! clevo-fancontrol 0..100   set the fan duty, then dump
//! clevo-fancontrol -1       run the automatic control loop
//! ```

use cf_error::{ClevofanError, Result};

pub const PROGRAM: &str = "clevo-fancontrol";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Argument that selects the automatic control loop
const AUTO_ARG: &str = "-1";

/// What the process was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the current status
    Dump,
    /// Print usage, then the current status
    Help,
    Version,
    /// Write one duty (percent), then print the current status
    SetDuty(u8),
    /// Run the control loop until a termination signal arrives
    Auto,
}

impl Command {
    /// Whether the command needs EC port access
    pub fn needs_ports(self) -> bool {
        !matches!(self, Self::Version)
    }
}

/// Parse the arguments following the program name
pub fn parse_args<I, S>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<S> = args.into_iter().collect();

    if args.iter().any(|a| matches!(a.as_ref(), "-h" | "--help")) {
        return Ok(Command::Help);
    }
    if args.iter().any(|a| matches!(a.as_ref(), "-V" | "--version")) {
        return Ok(Command::Version);
    }

    match args.as_slice() {
        [] => Ok(Command::Dump),
        [arg] => parse_duty_arg(arg.as_ref()),
        [_, extra, ..] => Err(ClevofanError::invalid_argument(format!(
            "unexpected argument '{}'",
            extra.as_ref()
        ))),
    }
}

fn parse_duty_arg(raw: &str) -> Result<Command> {
    let arg = raw.trim();
    if arg == AUTO_ARG {
        return Ok(Command::Auto);
    }
    let value: i64 = arg
        .parse()
        .map_err(|_| ClevofanError::invalid_argument(format!("not a fan duty: '{}'", raw)))?;
    match u8::try_from(value) {
        Ok(duty) if duty <= 100 => Ok(Command::SetDuty(duty)),
        _ => Err(ClevofanError::InvalidDuty { value }),
    }
}

pub fn usage() -> String {
    format!(
        "Usage: {prog} [fan-duty-percentage]\n\
         Dump or control the fan duty of Clevo laptops.\n\
         Without arguments the current status is printed.\n\
         \n\
         Arguments:\n\
         \x20 [fan-duty-percentage]  Target duty from 0 to 100; -1 runs automatic control\n\
         \x20 -h, --help             Print this help, then the current status\n\
         \x20 -V, --version          Print version\n\
         \n\
         Environment:\n\
         \x20 CLEVOFAN_LOG           Log filter (trace, debug, info, warn, error)\n",
        prog = PROGRAM
    )
}

pub fn print_help() {
    println!("{}", usage());
}

pub fn print_version() {
    println!("{} {}", PROGRAM, VERSION);
}
