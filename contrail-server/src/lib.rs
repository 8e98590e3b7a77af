//! The Contrail server: a registry of uploaded tables and a dispatcher
//! that executes remote method calls against them.
//!
//! [`FlightService`] is the handler surface the transport layer drives:
//! streaming uploads ([`FlightService::do_put`]), descriptor resolution
//! with synchronous command dispatch ([`FlightService::get_flight_info`]),
//! data streaming ([`FlightService::do_get`]), listings and admin actions.
//! [`LocalTransport`] binds that surface to the client-facing
//! [`Transport`][contrail_protocol::Transport] trait in-process.

pub mod actions;
pub mod config;
pub mod dispatch;
pub mod local;
pub mod registry;
pub mod service;
mod store;

pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use local::LocalTransport;
pub use registry::{Entry, Registry};
pub use service::{FlightService, ShutdownSignal};
