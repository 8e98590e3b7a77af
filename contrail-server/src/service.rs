use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrow_schema::SchemaRef;
use contrail_error::{ContrailError, ContrailResult, contrail_bail, contrail_err};
use contrail_protocol::{
    Action, ActionResult, ActionType, BatchStream, Descriptor, FlightId, FlightInfo, FlightKey,
    Ticket,
};
use contrail_table::OpSet;
use futures::StreamExt;
use tokio::sync::watch;

use crate::actions;
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::registry::{Entry, Registry};
use crate::store;

/// The server-side handler surface driven by the transport layer.
///
/// Handlers may run concurrently from any number of transport workers;
/// the registry's lock is the only synchronization point. Once a
/// shutdown action is acknowledged the service keeps answering reads for
/// the grace period but rejects further mutations.
pub struct FlightService {
    config: ServerConfig,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    draining: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl FlightService {
    /// Open the service with the builtin capability set, reloading any
    /// persisted datasets from the configured data directory.
    pub fn open(config: ServerConfig) -> ContrailResult<Self> {
        Self::with_ops(config, OpSet::builtin())
    }

    pub fn with_ops(config: ServerConfig, ops: OpSet) -> ContrailResult<Self> {
        let registry = Arc::new(Registry::open(&config.data_dir)?);
        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            config,
            registry,
            dispatcher: Dispatcher::new(ops),
            draining: AtomicBool::new(false),
            shutdown_tx,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept a streamed upload under a path descriptor.
    ///
    /// Chunks are appended to a temporary file as they arrive, so the
    /// dataset is never resident twice and an interrupted stream leaves
    /// no registry entry. The registry lock is taken only for the final
    /// promote-and-register step.
    pub async fn do_put(
        &self,
        descriptor: &Descriptor,
        schema: SchemaRef,
        mut data: BatchStream,
    ) -> ContrailResult<FlightId> {
        self.ensure_accepting()?;
        let Descriptor::Path(segments) = descriptor else {
            contrail_bail!(InvalidArguments: "uploads require a path descriptor");
        };
        let Some(name) = segments.first() else {
            contrail_bail!(InvalidArguments: "path descriptor has no segments");
        };
        let key = FlightKey::from(descriptor);
        if self.registry.resolve_key(&key).is_ok() {
            contrail_bail!(DuplicateKey: "{}", key);
        }

        let dest = self.registry.dataset_path(name)?;
        let mut writer =
            store::IncrementalWriter::create(dest.with_extension("parquet.tmp"), schema)?;
        while let Some(batch) = data.next().await {
            let batch = match batch {
                Ok(batch) => batch,
                Err(e) => {
                    writer.abort();
                    return Err(e);
                }
            };
            if let Err(e) = writer.append(&batch) {
                writer.abort();
                return Err(e);
            }
        }
        let tmp = writer.finish()?;
        let table = match store::read_table(&tmp) {
            Ok(table) => table,
            Err(e) => {
                let _ = std::fs::remove_file(&tmp);
                return Err(e);
            }
        };

        let mut inner = self.registry.write();
        if inner.resolve_key(&key).is_ok() {
            drop(inner);
            let _ = std::fs::remove_file(&tmp);
            contrail_bail!(DuplicateKey: "{}", key);
        }
        if let Err(e) = std::fs::rename(&tmp, &dest) {
            drop(inner);
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        let id = inner.store(key, table)?;
        drop(inner);
        log::info!("stored uploaded dataset {} as {}", id, dest.display());
        Ok(id)
    }

    /// Resolve a descriptor to its metadata and ticket. A command
    /// descriptor that is not yet registered is dispatched first, so the
    /// caller observes either the existing entry or a freshly computed
    /// one.
    pub async fn get_flight_info(&self, descriptor: &Descriptor) -> ContrailResult<FlightInfo> {
        let key = FlightKey::from(descriptor);
        let id = match self.registry.resolve_key(&key) {
            Ok(id) => id,
            Err(ContrailError::UnknownKey(_)) => match descriptor {
                Descriptor::Command(raw) => {
                    self.ensure_accepting()?;
                    self.dispatcher.execute(&self.registry, raw)?
                }
                _ => return Err(contrail_err!(UnknownKey: "{}", key)),
            },
            Err(e) => return Err(e),
        };
        let entry = self.registry.lookup(&id)?;
        flight_info(id, &entry)
    }

    /// Redeem a ticket for a data stream. Command keys stream the
    /// in-memory chunks; path keys stream lazily from the persisted
    /// artifact in configured batch sizes.
    pub async fn do_get(&self, ticket: &Ticket) -> ContrailResult<BatchStream> {
        let key = ticket.decode()?;
        match &key {
            FlightKey::Command(_) => {
                let table = self.registry.table_for_key(&key)?;
                Ok(futures::stream::iter(table.into_batches().into_iter().map(Ok)).boxed())
            }
            FlightKey::Path(_) => {
                self.registry.resolve_key(&key)?;
                let name = key
                    .path_name()
                    .ok_or_else(|| contrail_err!(UnknownKey: "{}", key))?;
                let path = self.registry.dataset_path(name)?;
                store::batch_stream(&path, self.config.stream_batch_size)
            }
            FlightKey::Unknown => contrail_bail!(UnknownKey: "{}", key),
        }
    }

    /// Every registry slot in id order, tombstone placeholders included.
    pub fn list_flights(&self) -> ContrailResult<Vec<FlightInfo>> {
        self.registry
            .list()
            .into_iter()
            .map(|(id, entry)| match entry {
                Some(entry) => flight_info(id, &entry),
                None => Ok(FlightInfo::tombstone(id)),
            })
            .collect()
    }

    pub fn list_actions(&self) -> Vec<ActionType> {
        actions::ACTION_TYPES.to_vec()
    }

    /// Route an admin action. The shutdown acknowledgment is returned
    /// before the server begins terminating, so it can flush to the
    /// caller.
    pub async fn do_action(&self, action: &Action) -> ContrailResult<Vec<ActionResult>> {
        if action.name == "shutdown" {
            self.begin_shutdown();
            return Ok(vec![ActionResult::new("Shutdown!")]);
        }
        self.ensure_accepting()?;
        actions::handle(&self.registry, action)
    }

    /// A handle that resolves once the post-shutdown grace period has
    /// elapsed; the hosting transport awaits it to know when to stop.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.shutdown_tx.subscribe(),
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    fn ensure_accepting(&self) -> ContrailResult<()> {
        if self.is_shutting_down() {
            return Err(ContrailError::ShuttingDown);
        }
        Ok(())
    }

    fn begin_shutdown(&self) {
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!(
            "shutdown requested, terminating in {:?}",
            self.config.shutdown_grace
        );
        let tx = self.shutdown_tx.clone();
        let grace = self.config.shutdown_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = tx.send(true);
        });
    }
}

fn flight_info(id: FlightId, entry: &Entry) -> ContrailResult<FlightInfo> {
    Ok(FlightInfo {
        id,
        descriptor: Descriptor::from(&entry.key),
        schema: Some(entry.table.schema()),
        row_count: Some(entry.table.num_rows() as u64),
        byte_size: Some(entry.table.byte_size() as u64),
        ticket: Some(Ticket::for_key(&entry.key)?),
    })
}

/// See [`FlightService::shutdown_signal`].
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once the grace period after a shutdown action elapses.
    /// Resolves immediately if the service has already been dropped.
    pub async fn wait(mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}
