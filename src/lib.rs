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

//! Clevofan - fan control for Clevo laptops
//!
//! The library side of `clevo-fancontrol`: command line handling, logging
//! setup, the automatic control loop and the termination signal guard. EC
//! access and the thermal algorithm live in `cf-core`.

pub mod cli;
pub mod logger;
pub mod service;
pub mod shutdown;
pub mod system;

#[cfg(test)]
pub mod test_utils;
