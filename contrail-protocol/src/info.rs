use arrow_schema::SchemaRef;

use crate::{Descriptor, FlightId, Ticket};

/// Metadata for one registry slot, as returned by descriptor resolution
/// and flight listings.
///
/// Tombstoned slots are reported as placeholders: the id survives, the
/// descriptor is [`Descriptor::Unknown`] and everything else is absent.
/// Slots therefore stay visibly stable across deletes.
#[derive(Debug, Clone)]
pub struct FlightInfo {
    pub id: FlightId,
    pub descriptor: Descriptor,
    pub schema: Option<SchemaRef>,
    pub row_count: Option<u64>,
    pub byte_size: Option<u64>,
    pub ticket: Option<Ticket>,
}

impl FlightInfo {
    /// Placeholder for a deleted slot.
    pub fn tombstone(id: impl Into<FlightId>) -> Self {
        Self {
            id: id.into(),
            descriptor: Descriptor::Unknown,
            schema: None,
            row_count: None,
            byte_size: None,
            ticket: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self.descriptor, Descriptor::Unknown)
    }
}
