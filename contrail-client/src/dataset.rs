use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use contrail_error::{ContrailResult, contrail_bail, contrail_err};
use contrail_protocol::{
    Action, ActionType, Command, Descriptor, FlightId, FlightInfo, Transport, Value,
};
use contrail_table::{Table, ops};
use futures::StreamExt;
use itertools::Itertools;

/// A client-side handle to one dataset stored on a Contrail server.
///
/// The transformation methods form a fixed table generated from the
/// shared capability set: each one captures the bound id, encodes a
/// command, and funnels through [`RemoteDataset::invoke`]. No compute
/// happens locally.
pub struct RemoteDataset {
    transport: Arc<dyn Transport>,
    id: FlightId,
}

impl RemoteDataset {
    /// Upload a local table under `name` and bind to the new flight.
    pub async fn upload(
        transport: Arc<dyn Transport>,
        name: &str,
        table: Table,
    ) -> ContrailResult<Self> {
        let schema = table.schema();
        let data = futures::stream::iter(table.into_batches().into_iter().map(Ok)).boxed();
        let id = transport
            .upload(Descriptor::for_path(name), schema, data)
            .await?;
        log::info!("created remote dataset '{}' (id: {})", name, id);
        Ok(Self { transport, id })
    }

    /// Read a `.csv` or `.parquet` file and upload it under its file
    /// stem.
    pub async fn upload_file(
        transport: Arc<dyn Transport>,
        path: impl AsRef<Path>,
    ) -> ContrailResult<Self> {
        let (name, table) = crate::readers::read_file(path.as_ref())?;
        Self::upload(transport, &name, table).await
    }

    /// Bind to an already stored flight without uploading anything.
    pub async fn connect(transport: Arc<dyn Transport>, id: &str) -> ContrailResult<Self> {
        let info = inspect(&transport, id).await?;
        log::info!("connected to flight {}", info.id);
        Ok(Self {
            transport,
            id: info.id,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Encode and submit one remote call, materializing the resulting
    /// stream into a local table.
    pub async fn invoke(
        &self,
        method: &str,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> ContrailResult<Table> {
        let command = Command {
            source_id: self.id.clone(),
            method: method.to_string(),
            args,
            kwargs,
        };
        let descriptor = Descriptor::for_command(command.encode()?);
        let info = self.transport.resolve_descriptor(&descriptor).await?;
        let ticket = info
            .ticket
            .ok_or_else(|| contrail_err!("flight {} resolved without a ticket", info.id))?;
        let mut stream = self.transport.fetch(&ticket).await?;
        let mut batches = Vec::new();
        while let Some(batch) = stream.next().await {
            batches.push(batch?);
        }
        if batches.is_empty() {
            let schema = info
                .schema
                .ok_or_else(|| contrail_err!("flight {} returned no data and no schema", info.id))?;
            return Ok(Table::empty(schema));
        }
        Table::from_batches(batches)
    }

    pub async fn slice(&self, offset: usize, length: Option<usize>) -> ContrailResult<Table> {
        let mut args = vec![Value::from(offset)];
        if let Some(length) = length {
            args.push(Value::from(length));
        }
        self.invoke(ops::SLICE, args, BTreeMap::new()).await
    }

    pub async fn select(&self, columns: &[&str]) -> ContrailResult<Table> {
        self.invoke(ops::SELECT, vec![names_value(columns)], BTreeMap::new())
            .await
    }

    pub async fn drop_columns(&self, names: &[&str]) -> ContrailResult<Table> {
        self.invoke(ops::DROP_COLUMNS, vec![names_value(names)], BTreeMap::new())
            .await
    }

    pub async fn rename_columns(&self, names: &[&str]) -> ContrailResult<Table> {
        self.invoke(ops::RENAME_COLUMNS, vec![names_value(names)], BTreeMap::new())
            .await
    }

    pub async fn take(&self, indices: &[i64]) -> ContrailResult<Table> {
        let indices = indices.iter().map(|&i| Value::Int(i)).collect_vec();
        self.invoke(ops::TAKE, vec![Value::List(indices)], BTreeMap::new())
            .await
    }

    pub async fn filter(&self, mask: &[bool]) -> ContrailResult<Table> {
        let mask = mask.iter().map(|&keep| Value::Bool(keep)).collect_vec();
        self.invoke(ops::FILTER, vec![Value::List(mask)], BTreeMap::new())
            .await
    }

    pub async fn sort_by(&self, column: &str, descending: bool) -> ContrailResult<Table> {
        let mut kwargs = BTreeMap::new();
        if descending {
            kwargs.insert("descending".to_string(), Value::Bool(true));
        }
        self.invoke(ops::SORT_BY, vec![Value::from(column)], kwargs)
            .await
    }

    pub async fn combine_chunks(&self) -> ContrailResult<Table> {
        self.invoke(ops::COMBINE_CHUNKS, Vec::new(), BTreeMap::new())
            .await
    }

    /// Human-readable flight listing, one line per registry slot.
    pub async fn list(&self) -> ContrailResult<Vec<String>> {
        list_flights(&self.transport).await
    }

    /// Metadata for one flight id.
    pub async fn inspect(&self, id: &str) -> ContrailResult<FlightInfo> {
        inspect(&self.transport, id).await
    }

    pub async fn save(&self, id: &str, name: &str) -> ContrailResult<String> {
        self.action(Action::new("save", format!("{} {}", id, name)))
            .await
    }

    pub async fn delete(&self, id: &str) -> ContrailResult<String> {
        self.action(Action::new("delete", id)).await
    }

    pub async fn clear(&self) -> ContrailResult<String> {
        self.action(Action::new("clear", "")).await
    }

    pub async fn shutdown(&self) -> ContrailResult<String> {
        self.action(Action::new("shutdown", "")).await
    }

    pub async fn list_actions(&self) -> ContrailResult<Vec<ActionType>> {
        self.transport.list_actions().await
    }

    async fn action(&self, action: Action) -> ContrailResult<String> {
        let results = self.transport.run_action(action).await?;
        results
            .into_iter()
            .map(|result| result.message)
            .next()
            .ok_or_else(|| contrail_err!("action returned no result"))
    }
}

/// Render the server's flight listing without a bound dataset.
pub async fn list_flights(transport: &Arc<dyn Transport>) -> ContrailResult<Vec<String>> {
    Ok(transport
        .list_all()
        .await?
        .iter()
        .map(describe)
        .collect_vec())
}

async fn inspect(transport: &Arc<dyn Transport>, id: &str) -> ContrailResult<FlightInfo> {
    let listing = transport.list_all().await?;
    let Some(info) = listing.into_iter().find(|info| info.id == id) else {
        contrail_bail!(UnknownId: "{}", id);
    };
    if info.is_tombstone() {
        contrail_bail!(UnknownId: "{}", id);
    }
    Ok(info)
}

fn describe(info: &FlightInfo) -> String {
    let what = match &info.descriptor {
        Descriptor::Path(segments) => segments.join("/"),
        Descriptor::Command(raw) => match Command::decode(raw) {
            Ok(command) => format!("{} of flight {}", command.render(), command.source_id),
            Err(_) => "<undecodable command>".to_string(),
        },
        Descriptor::Unknown => "<deleted>".to_string(),
    };
    match (info.row_count, info.byte_size) {
        (Some(rows), Some(bytes)) => {
            format!("Flight {}: {} ({} rows, {} bytes)", info.id, what, rows, bytes)
        }
        _ => format!("Flight {}: {}", info.id, what),
    }
}
