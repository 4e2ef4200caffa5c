//! # Line Transport
//!
//! A minimal broker stand-in: one delivery per input line.
//!
//! ```text
//! telemetry/dht11<TAB>{"deviceId":"D1","encryptedPayload":"..."}
//! {"deviceId":"D1","encryptedPayload":"..."}        # default topic
//! ```
//!
//! A `Requeue` disposition is redelivered in-process with a linear
//! backoff, up to the configured number of attempts.

mod line;

pub use line::{parse_line, run_line_transport, LineTransportOptions, TransportStats};
