use arrow_array::BooleanArray;
use arrow_select::filter::filter_record_batch;
use contrail_error::{ContrailResult, contrail_bail, contrail_err};

use crate::Table;
use crate::ops::{OpOutcome, TableOp, sole_positional};

/// Keep the rows whose mask entry is true. The mask must cover every row.
pub fn filter(table: &Table, mask: &[bool]) -> ContrailResult<Table> {
    if mask.len() != table.num_rows() {
        contrail_bail!(
            InvalidArguments: "mask length {} does not match row count {}",
            mask.len(),
            table.num_rows()
        );
    }
    let combined = table.combined()?;
    let filtered = filter_record_batch(&combined, &BooleanArray::from(mask.to_vec()))?;
    Table::try_new(table.schema(), vec![filtered])
}

/// Method name in the shared capability set.
pub const FILTER: &str = "filter";

pub(crate) fn op() -> TableOp {
    TableOp::new(FILTER, "filter(mask)", |table, invocation| {
        let value = sole_positional("filter", invocation)?;
        let Some(items) = value.as_list() else {
            contrail_bail!(InvalidArguments: "filter expects a list of booleans");
        };
        let mask = items
            .iter()
            .map(|item| {
                item.as_bool()
                    .ok_or_else(|| contrail_err!(InvalidArguments: "filter expects booleans, got {}", item))
            })
            .collect::<ContrailResult<Vec<_>>>()?;
        Ok(OpOutcome::Table(filter(table, &mask)?))
    })
}
