use arrow_ord::sort::lexsort_to_indices;
use arrow_schema::SortOptions;
use arrow_select::take::take_record_batch;
use contrail_error::{ContrailResult, contrail_bail, contrail_err};
use contrail_protocol::Value;

use crate::ops::{OpOutcome, TableOp, reject_unknown_keywords};
use crate::{Invocation, Table};

/// One sort criterion: a column and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Stable lexicographic sort by the given keys, producing a single-chunk
/// table.
pub fn sort_by(table: &Table, keys: &[SortKey]) -> ContrailResult<Table> {
    if keys.is_empty() {
        contrail_bail!(InvalidArguments: "sort_by needs at least one sort key");
    }
    let combined = table.combined()?;
    let columns = keys
        .iter()
        .map(|key| {
            let index = table
                .schema()
                .index_of(&key.column)
                .map_err(|_| contrail_err!(InvalidArguments: "no column named '{}'", key.column))?;
            Ok(arrow_ord::sort::SortColumn {
                values: combined.column(index).clone(),
                options: Some(SortOptions {
                    descending: key.descending,
                    ..Default::default()
                }),
            })
        })
        .collect::<ContrailResult<Vec<_>>>()?;
    let indices = lexsort_to_indices(&columns, None)?;
    let sorted = take_record_batch(&combined, &indices)?;
    Table::try_new(table.schema(), vec![sorted])
}

/// Method name in the shared capability set.
pub const SORT_BY: &str = "sort_by";

pub(crate) fn op() -> TableOp {
    TableOp::new(
        SORT_BY,
        "sort_by(column | [[column, order], …][, descending])",
        |table, invocation| {
            let keys = sort_keys(invocation)?;
            Ok(OpOutcome::Table(sort_by(table, &keys)?))
        },
    )
}

fn sort_keys(invocation: &Invocation) -> ContrailResult<Vec<SortKey>> {
    let descending = match invocation.keywords() {
        Some(kwargs) => {
            reject_unknown_keywords("sort_by", kwargs, &["descending"])?;
            match kwargs.get("descending") {
                Some(value) => value.as_bool().ok_or_else(
                    || contrail_err!(InvalidArguments: "descending expects a boolean, got {}", value),
                )?,
                None => false,
            }
        }
        None => false,
    };
    let Some(value) = invocation.positional() else {
        contrail_bail!(InvalidArguments: "sort_by needs a column to sort on");
    };
    keys_from_value(value, descending)
}

fn keys_from_value(value: &Value, descending: bool) -> ContrailResult<Vec<SortKey>> {
    if let Some(column) = value.as_str() {
        return Ok(vec![SortKey {
            column: column.to_string(),
            descending,
        }]);
    }
    let Some(items) = value.as_list() else {
        contrail_bail!(InvalidArguments: "sort_by expects a column name or a list of sort keys");
    };
    items
        .iter()
        .map(|item| {
            if let Some(column) = item.as_str() {
                return Ok(SortKey {
                    column: column.to_string(),
                    descending,
                });
            }
            if let Some([column, order]) = item.as_list() {
                let column = column.as_str().ok_or_else(
                    || contrail_err!(InvalidArguments: "sort key column must be a string, got {}", column),
                )?;
                return Ok(SortKey {
                    column: column.to_string(),
                    descending: parse_order(order)?,
                });
            }
            contrail_bail!(InvalidArguments: "sort keys are names or [name, order] pairs, got {}", item)
        })
        .collect()
}

fn parse_order(order: &Value) -> ContrailResult<bool> {
    match order.as_str() {
        Some("ascending") => Ok(false),
        Some("descending") => Ok(true),
        _ => contrail_bail!(InvalidArguments: "sort order must be 'ascending' or 'descending', got {}", order),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{column_a, sample_table};

    #[test]
    fn sorts_descending_by_key() {
        let table = sort_by(&sample_table(), &[SortKey::descending("a")]).unwrap();
        assert_eq!(column_a(&table), vec![3, 2, 1]);
    }

    #[test]
    fn unknown_column_fails() {
        assert!(sort_by(&sample_table(), &[SortKey::ascending("zzz")]).is_err());
    }

    #[test]
    fn mixed_invocation_applies_descending_keyword() {
        let kwargs = [("descending".to_string(), Value::Bool(true))]
            .into_iter()
            .collect();
        let outcome = op()
            .invoke(
                &sample_table(),
                &Invocation::Mixed(Value::from("a"), kwargs),
            )
            .unwrap();
        let OpOutcome::Table(table) = outcome else {
            unreachable!("sort_by returns tables");
        };
        assert_eq!(column_a(&table), vec![3, 2, 1]);
    }

    #[test]
    fn pair_list_invocation() {
        let value = Value::List(vec![Value::List(vec![
            Value::from("a"),
            Value::from("descending"),
        ])]);
        let OpOutcome::Table(table) = op()
            .invoke(&sample_table(), &Invocation::Positional(value))
            .unwrap()
        else {
            unreachable!("sort_by returns tables");
        };
        assert_eq!(column_a(&table), vec![3, 2, 1]);
    }
}
