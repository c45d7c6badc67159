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

//! clevo-fancontrol
//!
//! Dumps or sets the fan duty of Clevo laptops, or runs the automatic
//! thermal control loop (`-1`). Needs root for EC port access.

use anyhow::Context;
use cf_core::{EcProtocol, FanStatus, IoPortChannel, PortChannel};
use clevofan::cli::{self, Command};
use clevofan::service::{ControlLoop, ServiceConfig};
use clevofan::{logger, shutdown, system};
use tracing::{error, warn};

fn main() {
    logger::init_logging();

    let command = match cli::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            error!("{}", e);
            eprint!("{}", cli::usage());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Version => cli::print_version(),
        Command::Help => cli::print_help(),
        Command::Auto => {
            system::escalate_privileges();
            system::load_ec_sys_module();
        }
        Command::Dump | Command::SetDuty(_) => {}
    }
    if !command.needs_ports() {
        return Ok(());
    }

    if !system::running_as_root() {
        warn!("Not running as root, EC port access will likely be refused");
    }
    let ports = IoPortChannel::acquire().context("Unable to access the EC ports")?;

    match command {
        Command::Auto => run_auto(ports),
        Command::SetDuty(duty) => {
            let mut ec = EcProtocol::new(ports);
            println!("Change fan duty to {}%", duty);
            ec.write_fan_duty(duty)
                .with_context(|| format!("Failed to set fan duty to {}%", duty))?;
            dump_status(&mut ec)
        }
        Command::Dump | Command::Help | Command::Version => dump_status(&mut EcProtocol::new(ports)),
    }
}

fn run_auto(ports: IoPortChannel) -> anyhow::Result<()> {
    let config = ServiceConfig::default();
    shutdown::install(&ports, config.safe_duty).context("Failed to install signal handlers")?;

    let mut control = ControlLoop::new(config.snapshot_reader(), EcProtocol::new(ports), config);
    let result = control.run(&shutdown::RUNNING);

    let (_, mut ec) = control.into_parts();
    if let Err(e) = dump_status(&mut ec) {
        warn!("Unable to read final status: {:#}", e);
    }
    result.context("Fan control loop stopped")
}

fn dump_status<P: PortChannel>(ec: &mut EcProtocol<P>) -> anyhow::Result<()> {
    let status = FanStatus::poll(ec).context("Unable to read fan status")?;
    println!("{}", status.to_json_pretty()?);
    Ok(())
}
