//! OpenPad device core.
//!
//! Host-side mirror of one connected FSR pad and the machinery that keeps it
//! consistent with the hardware: the typed report session ([`Reporter`]), the
//! select-then-access convention for the device's indexed tables, the
//! [`PadDevice`] state mirror with read-after-write resync, the
//! [`ConnectionManager`] with its per-session failure denylist, and the
//! tick-driven polling/aggregation loop exposed through [`DeviceContext`].
//!
//! Everything here is single-threaded and synchronous by design: all device
//! I/O happens on the caller's tick, one request/response pair in flight at a
//! time. The external tick driver (UI timer, CLI loop) is the only mutator.

pub mod connection;
pub mod context;
pub mod pad_device;
pub mod reporter;
pub mod state;

pub use connection::ConnectionManager;
pub use context::DeviceContext;
pub use pad_device::PadDevice;
pub use reporter::{ReadResult, Reporter};
pub use state::{
    AdcState, DeviceChanges, LedMapping, LightRule, LightsState, PadState, PollingData, SensorState,
};
