use std::sync::Arc;

use arrow_schema::SchemaRef;
use async_trait::async_trait;
use contrail_error::ContrailResult;
use contrail_protocol::{
    Action, ActionResult, ActionType, BatchStream, Descriptor, FlightId, FlightInfo, Ticket,
    Transport,
};

use crate::service::FlightService;

/// An in-process [`Transport`] bound directly to a [`FlightService`].
///
/// Used for loopback wiring and tests; a network transport would
/// implement the same trait on the other side of a wire.
#[derive(Clone)]
pub struct LocalTransport {
    service: Arc<FlightService>,
}

impl LocalTransport {
    pub fn new(service: Arc<FlightService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<FlightService> {
        &self.service
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn upload(
        &self,
        descriptor: Descriptor,
        schema: SchemaRef,
        data: BatchStream,
    ) -> ContrailResult<FlightId> {
        self.service.do_put(&descriptor, schema, data).await
    }

    async fn resolve_descriptor(&self, descriptor: &Descriptor) -> ContrailResult<FlightInfo> {
        self.service.get_flight_info(descriptor).await
    }

    async fn fetch(&self, ticket: &Ticket) -> ContrailResult<BatchStream> {
        self.service.do_get(ticket).await
    }

    async fn list_all(&self) -> ContrailResult<Vec<FlightInfo>> {
        self.service.list_flights()
    }

    async fn run_action(&self, action: Action) -> ContrailResult<Vec<ActionResult>> {
        self.service.do_action(&action).await
    }

    async fn list_actions(&self) -> ContrailResult<Vec<ActionType>> {
        Ok(self.service.list_actions())
    }
}
