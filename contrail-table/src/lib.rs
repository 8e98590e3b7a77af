//! Tabular values and the table-operation capability set.
//!
//! A [`Table`] is a schema plus an ordered sequence of Arrow record
//! batches — the opaque tabular value the rest of the system stores and
//! transforms. The [`ops`] module enumerates the operations a dispatcher
//! may invoke against one; nothing outside the capability set is
//! remotely callable.

pub mod invocation;
pub mod ops;
mod table;

pub use invocation::Invocation;
pub use ops::{OpOutcome, OpSet, TableOp};
pub use table::Table;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use arrow_array::{Array, Int32Array, RecordBatch, StringArray};
    use arrow_schema::{DataType, Field, Schema};

    use crate::Table;

    /// Three rows over two columns, split across two chunks.
    pub fn sample_table() -> Table {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Utf8, false),
        ]));
        let first = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec!["x", "y"])),
            ],
        )
        .unwrap();
        let second = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int32Array::from(vec![3])),
                Arc::new(StringArray::from(vec!["z"])),
            ],
        )
        .unwrap();
        Table::try_new(schema, vec![first, second]).unwrap()
    }

    pub fn column_a(table: &Table) -> Vec<i32> {
        table
            .batches()
            .iter()
            .flat_map(|batch| {
                batch
                    .column(0)
                    .as_any()
                    .downcast_ref::<Int32Array>()
                    .unwrap()
                    .values()
                    .iter()
                    .copied()
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
