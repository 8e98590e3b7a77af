use arrow_array::UInt64Array;
use arrow_select::take::take_record_batch;
use contrail_error::{ContrailResult, contrail_bail, contrail_err};
use contrail_protocol::Value;

use crate::Table;
use crate::ops::{OpOutcome, TableOp, sole_positional};

/// Gather the given row indices, in order, into a new single-chunk table.
/// Indices may repeat; out-of-range indices are an error.
pub fn take(table: &Table, indices: &[i64]) -> ContrailResult<Table> {
    let indices = indices
        .iter()
        .map(|&index| {
            u64::try_from(index)
                .map_err(|_| contrail_err!(InvalidArguments: "row index {} is negative", index))
        })
        .collect::<ContrailResult<Vec<_>>>()?;
    let combined = table.combined()?;
    let taken = take_record_batch(&combined, &UInt64Array::from(indices))?;
    Table::try_new(table.schema(), vec![taken])
}

/// Method name in the shared capability set.
pub const TAKE: &str = "take";

pub(crate) fn op() -> TableOp {
    TableOp::new(TAKE, "take(indices)", |table, invocation| {
        let value = sole_positional("take", invocation)?;
        let Some(items) = value.as_list() else {
            contrail_bail!(InvalidArguments: "take expects a list of row indices");
        };
        let indices = items
            .iter()
            .map(|item| {
                item.as_i64()
                    .ok_or_else(|| contrail_err!(InvalidArguments: "take expects integer indices, got {}", item))
            })
            .collect::<ContrailResult<Vec<_>>>()?;
        Ok(OpOutcome::Table(take(table, &indices)?))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{column_a, sample_table};

    #[test]
    fn gathers_across_chunks_with_repeats() {
        let table = take(&sample_table(), &[2, 0, 2]).unwrap();
        assert_eq!(column_a(&table), vec![3, 1, 3]);
    }

    #[test]
    fn rejects_negative_and_out_of_range() {
        assert!(take(&sample_table(), &[-1]).is_err());
        assert!(take(&sample_table(), &[3]).is_err());
    }
}
