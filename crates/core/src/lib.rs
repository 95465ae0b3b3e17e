//! Domain building blocks for the EventSub relay.
//!
//! Everything in this crate is pure: no sockets, no database, no clock
//! reads. The API crate wires these pieces to the network.

pub mod error;
pub mod eventsub;
pub mod protocol;
pub mod signature;
pub mod types;
