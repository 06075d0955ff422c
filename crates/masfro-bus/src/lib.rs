//! `masfro-bus` — typed agent messaging.
//!
//! Named, bounded FIFO queues with at-most-once delivery.  The bus is
//! internal to the process: no durability, no retries across restarts.
//! A full queue fails the send with a typed error and the caller decides
//! whether to drop, retry, or escalate.
//!
//! # Crate layout
//!
//! | Module       | Contents                                          |
//! |--------------|---------------------------------------------------|
//! | [`envelope`] | `Envelope`, `Performative`, `Payload`, ids        |
//! | [`bus`]      | `MessageBus` — register/send/recv/broadcast       |
//! | [`error`]    | `BusError`, `BusResult<T>`                        |

pub mod bus;
pub mod envelope;
pub mod error;

#[cfg(test)]
mod tests;

pub use bus::MessageBus;
pub use envelope::{ConversationId, Envelope, Payload, Performative, Recipient};
pub use error::{BusError, BusResult};

/// Default queue capacity when registering without an explicit one.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1_024;
