//! Embedded controller access
//!
//! - `port` - raw byte I/O on the two legacy ports
//! - `retry` - the bounded spin-wait every handshake step uses
//! - `protocol` - register reads and writes over the IBF/OBF handshake
//! - `decode` - raw register bytes to physical units
//! - `snapshot` - full register images and the bulk debugfs reader

pub mod decode;
pub mod port;
pub mod protocol;
pub mod retry;
pub mod snapshot;

pub use port::{IoPortChannel, PortChannel};
pub use protocol::EcProtocol;
pub use retry::RetryPolicy;
pub use snapshot::{EcSnapshot, SnapshotSource, SysfsSnapshotReader};
