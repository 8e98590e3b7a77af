//! Table operations the dispatcher is allowed to invoke.
//!
//! Every remotely callable operation is registered in an [`OpSet`] under
//! its method name, together with a human-readable signature. The set is
//! the whitelist consulted at dispatch time: a method name outside it is
//! rejected before any table is touched. Each operation interprets the
//! normalized [`Invocation`] itself, since argument shapes differ per
//! operation.

mod chunks;
mod filter;
mod project;
mod slice;
mod sort;
mod take;

pub use chunks::{COMBINE_CHUNKS, NUM_ROWS, combine_chunks, num_rows};
pub use filter::{FILTER, filter};
pub use project::{COLUMN_NAMES, DROP_COLUMNS, RENAME_COLUMNS, SELECT, drop_columns, rename_columns, select};
pub use slice::{SLICE, slice};
pub use sort::{SORT_BY, SortKey, sort_by};
pub use take::{TAKE, take};

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use contrail_error::{ContrailResult, contrail_bail, contrail_err};
use contrail_protocol::Value;

use crate::{Invocation, Table};

/// What an operation produced: a chainable table, or a scalar value that
/// cannot be stored back into the registry.
#[derive(Debug, Clone)]
pub enum OpOutcome {
    Table(Table),
    Scalar(Value),
}

type OpFn = Arc<dyn Fn(&Table, &Invocation) -> ContrailResult<OpOutcome> + Send + Sync>;

/// A named table operation with its declared signature.
#[derive(Clone)]
pub struct TableOp {
    name: Arc<str>,
    signature: Arc<str>,
    func: OpFn,
}

impl TableOp {
    pub fn new(
        name: impl Into<Arc<str>>,
        signature: impl Into<Arc<str>>,
        func: impl Fn(&Table, &Invocation) -> ContrailResult<OpOutcome> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn invoke(&self, table: &Table, invocation: &Invocation) -> ContrailResult<OpOutcome> {
        (self.func)(table, invocation)
    }
}

impl Debug for TableOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableOp")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// The enumerable capability set shared by client and server.
///
/// Immutable once built; `with_op` returns an extended copy, which is how
/// tests register recording stubs without touching the builtin set.
#[derive(Debug, Clone)]
pub struct OpSet {
    ops: Arc<BTreeMap<String, TableOp>>,
}

impl OpSet {
    pub fn empty() -> Self {
        Self {
            ops: Arc::new(BTreeMap::new()),
        }
    }

    /// The builtin table operations.
    pub fn builtin() -> Self {
        [
            chunks::combine_chunks_op(),
            chunks::num_rows_op(),
            filter::op(),
            project::column_names_op(),
            project::drop_columns_op(),
            project::rename_columns_op(),
            project::select_op(),
            slice::op(),
            sort::op(),
            take::op(),
        ]
        .into_iter()
        .fold(Self::empty(), Self::with_op)
    }

    pub fn with_op(self, op: TableOp) -> Self {
        let mut ops = (*self.ops).clone();
        ops.insert(op.name().to_string(), op);
        Self { ops: Arc::new(ops) }
    }

    pub fn lookup(&self, name: &str) -> Option<&TableOp> {
        self.ops.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableOp> {
        self.ops.values()
    }
}

impl Default for OpSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Shared argument helpers. Operations own their shapes; these only cover
/// the recurring cases.
pub(crate) fn expect_nullary(name: &str, invocation: &Invocation) -> ContrailResult<()> {
    match invocation {
        Invocation::Nullary => Ok(()),
        _ => contrail_bail!(InvalidArguments: "{} takes no arguments", name),
    }
}

/// A bare positional value with no keywords.
pub(crate) fn sole_positional<'a>(
    name: &str,
    invocation: &'a Invocation,
) -> ContrailResult<&'a Value> {
    match invocation {
        Invocation::Positional(value) => Ok(value),
        _ => contrail_bail!(InvalidArguments: "{} takes exactly one positional argument", name),
    }
}

pub(crate) fn int_value(name: &str, value: &Value) -> ContrailResult<usize> {
    value
        .as_usize()
        .ok_or_else(|| contrail_err!(InvalidArguments: "{} expects a non-negative integer, got {}", name, value))
}

pub(crate) fn reject_unknown_keywords(
    name: &str,
    kwargs: &BTreeMap<String, Value>,
    known: &[&str],
) -> ContrailResult<()> {
    for keyword in kwargs.keys() {
        if !known.contains(&keyword.as_str()) {
            contrail_bail!(InvalidArguments: "{} got an unexpected keyword '{}'", name, keyword);
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::sample_table;
    use itertools::Itertools;

    #[test]
    fn builtin_capability_set_is_enumerable() {
        let ops = OpSet::builtin();
        assert_eq!(
            ops.names().collect_vec(),
            vec![
                "column_names",
                "combine_chunks",
                "drop_columns",
                "filter",
                "num_rows",
                "rename_columns",
                "select",
                "slice",
                "sort_by",
                "take",
            ]
        );
        assert!(ops.lookup("to_pydict").is_none());
    }

    #[test]
    fn every_builtin_op_declares_a_signature() {
        for op in OpSet::builtin().iter() {
            assert!(op.signature().starts_with(op.name()), "{:?}", op);
        }
    }

    #[test]
    fn with_op_registers_a_stub() {
        let ops = OpSet::builtin().with_op(TableOp::new("noop", "noop()", |table, _| {
            Ok(OpOutcome::Table(table.clone()))
        }));
        let outcome = ops
            .lookup("noop")
            .unwrap()
            .invoke(&sample_table(), &Invocation::Nullary)
            .unwrap();
        assert!(matches!(outcome, OpOutcome::Table(t) if t.num_rows() == 3));
    }
}
