//! Client proxy for Contrail servers.
//!
//! A [`RemoteDataset`] binds a dataset id on a remote server and exposes
//! one method per operation in the shared capability set. Every call is
//! a pure remote invocation: arguments are encoded into a command, the
//! command resolves to a ticket over the [`Transport`], and the ticket's
//! batch stream is materialized back into a local [`Table`].
//!
//! [`Transport`]: contrail_protocol::Transport
//! [`Table`]: contrail_table::Table

mod dataset;
mod readers;

pub use dataset::{RemoteDataset, list_flights};
