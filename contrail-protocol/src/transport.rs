use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use async_trait::async_trait;
use contrail_error::ContrailResult;
use futures::stream::BoxStream;

use crate::{Action, ActionResult, ActionType, Descriptor, FlightId, FlightInfo, Ticket};

/// A stream of record batches moving across the transport boundary.
pub type BatchStream = BoxStream<'static, ContrailResult<RecordBatch>>;

/// The boundary with the bulk-data transport layer.
///
/// Contrail does not implement a network transport; it requires these
/// five primitives of whatever carries its descriptors and tickets.
/// `contrail-server` ships a `LocalTransport` that binds them directly to
/// an in-process `FlightService`. Authentication and TLS are the
/// transport's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stream a dataset to the server under a path-style descriptor.
    /// Registration happens only once the stream is fully persisted.
    async fn upload(
        &self,
        descriptor: Descriptor,
        schema: SchemaRef,
        data: BatchStream,
    ) -> ContrailResult<FlightId>;

    /// Resolve a descriptor to its metadata and endpoint ticket. A
    /// command-style descriptor that is not yet registered is dispatched
    /// synchronously before this returns.
    async fn resolve_descriptor(&self, descriptor: &Descriptor) -> ContrailResult<FlightInfo>;

    /// Redeem a ticket for the corresponding data stream.
    async fn fetch(&self, ticket: &Ticket) -> ContrailResult<BatchStream>;

    /// Enumerate every registry slot, tombstone placeholders included.
    async fn list_all(&self) -> ContrailResult<Vec<FlightInfo>>;

    /// Route an admin action to the server.
    async fn run_action(&self, action: Action) -> ContrailResult<Vec<ActionResult>>;

    /// Enumerate the admin actions the server supports.
    async fn list_actions(&self) -> ContrailResult<Vec<ActionType>>;
}
