//! Static channels connecting the serial tasks to the control loop.
//!
//! The profile table itself is never shared across tasks; only complete
//! lines cross this boundary, so the loop remains the single writer of all
//! state.

use embassy_sync::channel::Channel;

use crate::protocol::{ControlLine, ResponseLine};
use crate::RawMutex;

/// Complete inbound control lines, serial reader task -> control loop.
pub static CONTROL_LINE_CHANNEL: Channel<RawMutex, ControlLine, 2> = Channel::new();

/// Outbound response lines, control loop -> serial writer task.
pub static CONTROL_RESPONSE_CHANNEL: Channel<RawMutex, ResponseLine, 2> = Channel::new();
