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

//! Process privileges and kernel modules

use std::path::Path;
use std::process::Command;

use cf_core::constants::paths;
use tracing::{debug, info, warn};

/// Whether the effective user is root
pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Switch the real user to root when the binary runs setuid-root
///
/// Best effort: failure only means the kernel module may not load.
pub fn escalate_privileges() {
    // SAFETY: getuid/setuid have no memory-safety preconditions.
    let uid = unsafe { libc::getuid() };
    if uid == 0 {
        return;
    }
    if unsafe { libc::setuid(0) } != 0 {
        warn!(uid, "setuid(0) failed: {}", std::io::Error::last_os_error());
    } else {
        debug!(uid, "switched real user to root");
    }
}

/// Make sure the kernel EC image is available, loading `ec_sys` if needed
///
/// Returns whether the image exists afterwards. A missing image is not an
/// error here; the control loop reports it when it first opens the file.
pub fn load_ec_sys_module() -> bool {
    load_module_for(paths::EC_SYS_MODULE, Path::new(paths::EC_SYSFS_IO))
}

fn load_module_for(module: &str, provides: &Path) -> bool {
    if provides.exists() {
        debug!("{} already present", provides.display());
        return true;
    }

    match Command::new("modprobe").arg(module).output() {
        Ok(output) if output.status.success() => {
            info!("Loaded kernel module: {}", module);
        }
        Ok(output) => {
            warn!(
                "modprobe {} failed: {}",
                module,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Err(e) => {
            warn!("Could not run modprobe for {}: {}", module, e);
        }
    }
    provides.exists()
}
