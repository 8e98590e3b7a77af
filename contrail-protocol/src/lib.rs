//! Wire-level types shared by the Contrail client and server.
//!
//! A remote call is a [`Command`]: the id of the source dataset, a method
//! name, and the positional/keyword arguments as [`Value`]s. Commands are
//! framed into bytes by the codec in [`command`], wrapped in a
//! [`Descriptor`], and resolved by the server into a [`FlightInfo`] whose
//! [`Ticket`] can be redeemed for a stream of record batches.
//!
//! The [`Transport`] trait is the boundary with the (out of scope) bulk
//! transport layer: anything that can move descriptors, tickets and batch
//! streams between a client and a [`FlightService`] can carry Contrail.
//!
//! [`FlightService`]: https://docs.rs/contrail-server

pub mod action;
pub mod command;
pub mod info;
pub mod key;
pub mod transport;
pub mod value;

pub use action::*;
pub use command::*;
pub use info::*;
pub use key::*;
pub use transport::*;
pub use value::*;

/// Registry-assigned dataset identifier.
///
/// Identifiers are the decimal rendering of a monotonically increasing
/// counter; they are issued at store time and never reused.
pub type FlightId = String;
