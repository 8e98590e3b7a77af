use bytes::Bytes;
use contrail_error::{ContrailResult, contrail_err};
use contrail_protocol::{Command, FlightId, FlightKey};
use contrail_table::{Invocation, OpOutcome, OpSet};

use crate::registry::Registry;

/// Executes decoded commands against the registry.
///
/// The method whitelist is the [`OpSet`] handed in at construction;
/// nothing outside it is reachable remotely.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    ops: OpSet,
}

impl Dispatcher {
    pub fn new(ops: OpSet) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &OpSet {
        &self.ops
    }

    /// Execute one encoded command and return the id of the resulting
    /// stored table.
    ///
    /// The result is registered under a command key holding the exact
    /// encoded bytes, so re-dispatching the same call resolves to the
    /// already stored entry instead of computing again.
    pub fn execute(&self, registry: &Registry, raw: &Bytes) -> ContrailResult<FlightId> {
        let command = Command::decode(raw)?;
        let method = command.method.clone();

        // Reading the source and storing the result must be one critical
        // section: two identical concurrent dispatches may not both miss
        // the dedup check, and the id counter advances exactly once per
        // stored result.
        let mut inner = registry.write();
        let entry = inner.lookup(&command.source_id)?;
        let Some(op) = self.ops.lookup(&method) else {
            return Err(contrail_err!(UnsupportedMethod: "{}", method));
        };
        let key = FlightKey::Command(raw.clone());
        if let Ok(existing) = inner.resolve_key(&key) {
            return Ok(existing);
        }
        let invocation = Invocation::from_parts(command.args, command.kwargs);
        match op.invoke(&entry.table, &invocation)? {
            OpOutcome::Table(result) => inner.store(key, result),
            OpOutcome::Scalar(value) => {
                Err(contrail_err!(NonTableResult: "{} produced {}", method, value))
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(OpSet::builtin())
    }
}
