use contrail_error::ContrailResult;
use contrail_protocol::Value;

use crate::ops::{OpOutcome, TableOp, expect_nullary};
use crate::Table;

/// Concatenate all chunks into one batch.
pub fn combine_chunks(table: &Table) -> ContrailResult<Table> {
    let combined = table.combined()?;
    Table::try_new(table.schema(), vec![combined])
}

/// Total row count.
pub fn num_rows(table: &Table) -> usize {
    table.num_rows()
}

/// Method names in the shared capability set.
pub const COMBINE_CHUNKS: &str = "combine_chunks";
pub const NUM_ROWS: &str = "num_rows";

pub(crate) fn combine_chunks_op() -> TableOp {
    TableOp::new(COMBINE_CHUNKS, "combine_chunks()", |table, invocation| {
        expect_nullary("combine_chunks", invocation)?;
        Ok(OpOutcome::Table(combine_chunks(table)?))
    })
}

pub(crate) fn num_rows_op() -> TableOp {
    TableOp::new(NUM_ROWS, "num_rows()", |table, invocation| {
        expect_nullary("num_rows", invocation)?;
        Ok(OpOutcome::Scalar(Value::Int(num_rows(table) as i64)))
    })
}
