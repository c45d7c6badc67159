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

//! Console logging
//!
//! Events go to stderr so the JSON status dump on stdout stays clean.

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "CLEVOFAN_LOG";

const DEFAULT_FILTER: &str = "info";

/// Local time, minute and second precision
const TIMESTAMP_FORMAT: &str = "%m/%d %H:%M:%S";

/// Filter directive to use, given the raw value of [`LOG_ENV`]
pub fn filter_directive(env_value: Option<String>) -> String {
    env_value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging() {
    let log_level = filter_directive(std::env::var(LOG_ENV).ok());

    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
        .with_env_filter(EnvFilter::new(&log_level))
        .with_writer(std::io::stderr)
        .try_init();
}
