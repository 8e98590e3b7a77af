//! Contrail: upload tabular datasets to a server and transform them
//! remotely, as if they were local.

pub use contrail_protocol::*;
pub use {
    contrail_client as client, contrail_error as error, contrail_server as server,
    contrail_table as table,
};
