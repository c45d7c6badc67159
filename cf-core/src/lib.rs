//! Clevofan Core Library
//!
//! Fan control for Clevo laptops through the embedded controller (EC).
//!
//! # Features
//!
//! - **EC Access**: Raw port I/O and the IBF/OBF handshake for register reads and writes
//! - **Snapshots**: Whole-image reads of the EC registers from the `ec_sys` debugfs file
//! - **Thermal Engine**: Hysteresis threshold table with smoothed escalation
//! - **Status Dump**: JSON rendering of the current fan and temperature state
//!
//! # Module Structure
//!
//! - `ec/` - Port channel, handshake protocol, decoding, snapshots
//! - `engine/` - Duty selection
//! - `constants` - Hardware addresses, thresholds and timing
//! - `display` - Status output
//!
//! # Example
//!
//! ```no_run
//! use cf_core::{next_duty, DutyDecision, EcProtocol, IoPortChannel};
//!
//! let mut ec = EcProtocol::new(IoPortChannel::acquire().unwrap());
//! let cpu = ec.cpu_temp().unwrap();
//! let gpu = ec.gpu_temp().unwrap();
//! let duty = ec.fan_duty().unwrap();
//! if let DutyDecision::Set(new_duty) = next_duty(cpu, gpu, duty) {
//!     ec.write_fan_duty(new_duty).unwrap();
//! }
//! ```

// Grouped modules
pub mod ec;
pub mod engine;

// Standalone modules
pub mod constants;
pub mod display;

// Re-export error types
pub use cf_error::{ClevofanError, Result};

// Re-export EC access types
pub use ec::{
    EcProtocol, EcSnapshot, IoPortChannel, PortChannel, RetryPolicy, SnapshotSource,
    SysfsSnapshotReader,
};

// Re-export engine types
pub use engine::{identify_duty, next_duty, DutyDecision};

// Re-export display types
pub use display::FanStatus;
