use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use arrow_select::concat::concat_batches;
use contrail_error::{ContrailResult, contrail_bail};
use itertools::Itertools;

/// An immutable tabular value: a schema and an ordered sequence of record
/// batch chunks sharing that schema.
///
/// Cloning is cheap; batches hold their columns behind `Arc`s.
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    /// Fails if any batch's schema differs from `schema`.
    pub fn try_new(schema: SchemaRef, batches: Vec<RecordBatch>) -> ContrailResult<Self> {
        for batch in &batches {
            if batch.schema() != schema {
                contrail_bail!(
                    "batch schema {:?} does not match table schema {:?}",
                    batch.schema(),
                    schema
                );
            }
        }
        Ok(Self { schema, batches })
    }

    /// Build a table from at least one batch, taking the schema from the
    /// first.
    pub fn from_batches(batches: Vec<RecordBatch>) -> ContrailResult<Self> {
        let Some(first) = batches.first() else {
            contrail_bail!("cannot infer a schema from zero batches");
        };
        Self::try_new(first.schema(), batches)
    }

    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    /// In-memory footprint of all chunks.
    pub fn byte_size(&self) -> usize {
        self.batches
            .iter()
            .map(RecordBatch::get_array_memory_size)
            .sum()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect_vec()
    }

    /// Zero-copy slice of `length` rows starting at `offset`, clamped to
    /// the table bounds.
    pub fn slice(&self, offset: usize, length: usize) -> Table {
        let offset = offset.min(self.num_rows());
        let mut to_skip = offset;
        let mut to_take = length.min(self.num_rows() - offset);
        let mut batches = Vec::new();
        for batch in &self.batches {
            if to_take == 0 {
                break;
            }
            let rows = batch.num_rows();
            if to_skip >= rows {
                to_skip -= rows;
                continue;
            }
            let take = (rows - to_skip).min(to_take);
            batches.push(batch.slice(to_skip, take));
            to_skip = 0;
            to_take -= take;
        }
        Table {
            schema: self.schema.clone(),
            batches,
        }
    }

    /// All chunks concatenated into a single batch.
    pub fn combined(&self) -> ContrailResult<RecordBatch> {
        Ok(concat_batches(&self.schema, self.batches.iter())?)
    }
}
