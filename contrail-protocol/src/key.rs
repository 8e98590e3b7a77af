use std::fmt::{self, Display};

use bytes::Bytes;
use contrail_error::{ContrailResult, contrail_bail, contrail_err};
use serde::{Deserialize, Serialize};

/// Descriptor kind codes, as carried inside tickets.
const KIND_UNKNOWN: u8 = 0;
const KIND_PATH: u8 = 1;
const KIND_COMMAND: u8 = 2;

/// A caller-supplied locator for a dataset: either a user-given name
/// (path-style) or an encoded command (command-style).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Path(Vec<String>),
    Command(Bytes),
    /// Placeholder descriptor reported for tombstoned registry slots.
    Unknown,
}

impl Descriptor {
    pub fn for_path(name: impl Into<String>) -> Self {
        Descriptor::Path(vec![name.into()])
    }

    pub fn for_command(command: impl Into<Bytes>) -> Self {
        Descriptor::Command(command.into())
    }
}

impl From<&FlightKey> for Descriptor {
    fn from(key: &FlightKey) -> Self {
        match key {
            FlightKey::Path(segments) => Descriptor::Path(segments.clone()),
            FlightKey::Command(command) => Descriptor::Command(command.clone()),
            FlightKey::Unknown => Descriptor::Unknown,
        }
    }
}

/// The immutable identity of a stored dataset.
///
/// Two keys are equal iff their kind and payload are equal. Command keys
/// hold the exact encoded command bytes, so two dispatches of the same
/// call derive the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlightKey {
    Path(Vec<String>),
    Command(Bytes),
    Unknown,
}

impl FlightKey {
    pub fn kind_code(&self) -> u8 {
        match self {
            FlightKey::Unknown => KIND_UNKNOWN,
            FlightKey::Path(_) => KIND_PATH,
            FlightKey::Command(_) => KIND_COMMAND,
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(self, FlightKey::Path(_))
    }

    /// The file stem a path-style key persists under.
    pub fn path_name(&self) -> Option<&str> {
        match self {
            FlightKey::Path(segments) => segments.first().map(String::as_str),
            _ => None,
        }
    }
}

impl From<&Descriptor> for FlightKey {
    fn from(descriptor: &Descriptor) -> Self {
        match descriptor {
            Descriptor::Path(segments) => FlightKey::Path(segments.clone()),
            Descriptor::Command(command) => FlightKey::Command(command.clone()),
            Descriptor::Unknown => FlightKey::Unknown,
        }
    }
}

impl Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightKey::Path(segments) => write!(f, "path:{}", segments.join("/")),
            FlightKey::Command(command) => write!(f, "cmd:{} bytes", command.len()),
            FlightKey::Unknown => write!(f, "unknown"),
        }
    }
}

/// Serialized form of a [`FlightKey`]: the `(kind, command, path)` tuple.
#[derive(Serialize, Deserialize)]
struct TicketRepr(u8, Option<Vec<u8>>, Vec<String>);

/// An opaque token redeemable for the data stream of one stored dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket(Bytes);

impl Ticket {
    pub fn for_key(key: &FlightKey) -> ContrailResult<Self> {
        let repr = match key {
            FlightKey::Path(segments) => TicketRepr(KIND_PATH, None, segments.clone()),
            FlightKey::Command(command) => {
                TicketRepr(KIND_COMMAND, Some(command.to_vec()), Vec::new())
            }
            FlightKey::Unknown => TicketRepr(KIND_UNKNOWN, None, Vec::new()),
        };
        let encoded = serde_json::to_vec(&repr)
            .map_err(|e| contrail_err!("failed to serialize ticket: {}", e))?;
        Ok(Ticket(encoded.into()))
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Ticket(bytes.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn decode(&self) -> ContrailResult<FlightKey> {
        let TicketRepr(kind, command, path) = serde_json::from_slice(&self.0)
            .map_err(|e| contrail_err!("invalid ticket: {}", e))?;
        match kind {
            KIND_PATH => Ok(FlightKey::Path(path)),
            KIND_COMMAND => {
                let command =
                    command.ok_or_else(|| contrail_err!("command ticket is missing its command"))?;
                Ok(FlightKey::Command(command.into()))
            }
            KIND_UNKNOWN => Ok(FlightKey::Unknown),
            other => contrail_bail!("invalid ticket kind {}", other),
        }
    }
}
