use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::{Field, Schema};
use contrail_error::{ContrailResult, contrail_bail, contrail_err};
use contrail_protocol::Value;
use itertools::Itertools;

use crate::Table;
use crate::ops::{OpOutcome, TableOp, expect_nullary, sole_positional};

/// Project `table` down to the given columns, by name or index, in the
/// given order.
pub fn select(table: &Table, columns: &[Value]) -> ContrailResult<Table> {
    let indices = columns
        .iter()
        .map(|column| column_index(table, column))
        .collect::<ContrailResult<Vec<_>>>()?;
    project(table, &indices)
}

/// Remove the named columns, keeping the rest in schema order.
pub fn drop_columns(table: &Table, names: &[&str]) -> ContrailResult<Table> {
    let schema = table.schema();
    for name in names {
        if schema.index_of(name).is_err() {
            contrail_bail!(InvalidArguments: "no column named '{}'", name);
        }
    }
    let indices = schema
        .fields()
        .iter()
        .positions(|field| !names.contains(&field.name().as_str()))
        .collect_vec();
    project(table, &indices)
}

/// Rename every column; `names` must match the column count.
pub fn rename_columns(table: &Table, names: &[&str]) -> ContrailResult<Table> {
    let schema = table.schema();
    if names.len() != schema.fields().len() {
        contrail_bail!(
            InvalidArguments: "rename_columns got {} names for {} columns",
            names.len(),
            schema.fields().len()
        );
    }
    let fields = schema
        .fields()
        .iter()
        .zip(names)
        .map(|(field, name)| field.as_ref().clone().with_name(*name))
        .collect::<Vec<Field>>();
    let renamed = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
    let batches = table
        .batches()
        .iter()
        .map(|batch| Ok(RecordBatch::try_new(renamed.clone(), batch.columns().to_vec())?))
        .collect::<ContrailResult<Vec<_>>>()?;
    Table::try_new(renamed, batches)
}

fn project(table: &Table, indices: &[usize]) -> ContrailResult<Table> {
    let schema = Arc::new(table.schema().project(indices)?);
    let batches = table
        .batches()
        .iter()
        .map(|batch| Ok(batch.project(indices)?))
        .collect::<ContrailResult<Vec<_>>>()?;
    Table::try_new(schema, batches)
}

fn column_index(table: &Table, column: &Value) -> ContrailResult<usize> {
    if let Some(name) = column.as_str() {
        return table
            .schema()
            .index_of(name)
            .map_err(|_| contrail_err!(InvalidArguments: "no column named '{}'", name));
    }
    if let Some(index) = column.as_usize() {
        if index >= table.num_columns() {
            contrail_bail!(
                InvalidArguments: "column index {} out of range for {} columns",
                index,
                table.num_columns()
            );
        }
        return Ok(index);
    }
    contrail_bail!(InvalidArguments: "expected a column name or index, got {}", column)
}

/// One name or a list of names.
fn name_list(name: &str, value: &Value) -> ContrailResult<Vec<String>> {
    if let Some(single) = value.as_str() {
        return Ok(vec![single.to_string()]);
    }
    if let Some(items) = value.as_list() {
        return items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| contrail_err!(InvalidArguments: "{} expects column names, got {}", name, item))
            })
            .collect();
    }
    contrail_bail!(InvalidArguments: "{} expects a column name or a list of names", name)
}

/// Method names in the shared capability set.
pub const SELECT: &str = "select";
pub const DROP_COLUMNS: &str = "drop_columns";
pub const RENAME_COLUMNS: &str = "rename_columns";
pub const COLUMN_NAMES: &str = "column_names";

pub(crate) fn select_op() -> TableOp {
    TableOp::new(SELECT, "select(columns)", |table, invocation| {
        let value = sole_positional("select", invocation)?;
        let columns = match value.as_list() {
            Some(items) => items.to_vec(),
            None => vec![value.clone()],
        };
        Ok(OpOutcome::Table(select(table, &columns)?))
    })
}

pub(crate) fn drop_columns_op() -> TableOp {
    TableOp::new(DROP_COLUMNS, "drop_columns(names)", |table, invocation| {
        let names = name_list("drop_columns", sole_positional("drop_columns", invocation)?)?;
        let names = names.iter().map(String::as_str).collect_vec();
        Ok(OpOutcome::Table(drop_columns(table, &names)?))
    })
}

pub(crate) fn rename_columns_op() -> TableOp {
    TableOp::new(
        RENAME_COLUMNS,
        "rename_columns(names)",
        |table, invocation| {
            let value = sole_positional("rename_columns", invocation)?;
            let Some(items) = value.as_list() else {
                contrail_bail!(InvalidArguments: "rename_columns expects a list of names");
            };
            let names = name_list("rename_columns", &Value::List(items.to_vec()))?;
            let names = names.iter().map(String::as_str).collect_vec();
            Ok(OpOutcome::Table(rename_columns(table, &names)?))
        },
    )
}

pub(crate) fn column_names_op() -> TableOp {
    TableOp::new(COLUMN_NAMES, "column_names()", |table, invocation| {
        expect_nullary("column_names", invocation)?;
        Ok(OpOutcome::Scalar(Value::from(table.column_names())))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Invocation;
    use crate::testing::sample_table;

    #[test]
    fn select_by_name_and_index() {
        let table = sample_table();
        let by_name = select(&table, &[Value::from("b")]).unwrap();
        assert_eq!(by_name.column_names(), vec!["b"]);
        let by_index = select(&table, &[Value::from(1i64), Value::from(0i64)]).unwrap();
        assert_eq!(by_index.column_names(), vec!["b", "a"]);
        assert_eq!(by_index.num_rows(), 3);
    }

    #[test]
    fn select_unknown_column_fails() {
        assert!(select(&sample_table(), &[Value::from("c")]).is_err());
        assert!(select(&sample_table(), &[Value::from(2i64)]).is_err());
    }

    #[test]
    fn drop_columns_keeps_order() {
        let table = drop_columns(&sample_table(), &["a"]).unwrap();
        assert_eq!(table.column_names(), vec!["b"]);
        assert!(drop_columns(&sample_table(), &["nope"]).is_err());
    }

    #[test]
    fn rename_columns_checks_arity() {
        let renamed = rename_columns(&sample_table(), &["x", "y"]).unwrap();
        assert_eq!(renamed.column_names(), vec!["x", "y"]);
        assert_eq!(renamed.num_rows(), 3);
        assert!(rename_columns(&sample_table(), &["x"]).is_err());
    }

    #[test]
    fn column_names_is_a_scalar_result() {
        let outcome = column_names_op()
            .invoke(&sample_table(), &Invocation::Nullary)
            .unwrap();
        assert!(matches!(
            outcome,
            OpOutcome::Scalar(Value::List(names))
                if names == vec![Value::from("a"), Value::from("b")]
        ));
    }
}
