//! Parquet persistence for path-keyed datasets.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use contrail_error::{ContrailError, ContrailResult};
use contrail_protocol::BatchStream;
use contrail_table::Table;
use futures::StreamExt;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

/// Write a whole table to `path`.
pub(crate) fn write_table(path: &Path, table: &Table) -> ContrailResult<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, table.schema(), None)?;
    for batch in table.batches() {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

/// Read a whole file back into memory.
pub(crate) fn read_table(path: &Path) -> ContrailResult<Table> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema: SchemaRef = builder.schema().clone();
    let batches = builder
        .build()?
        .collect::<Result<Vec<RecordBatch>, _>>()
        .map_err(ContrailError::from)?;
    if batches.is_empty() {
        return Ok(Table::empty(schema));
    }
    Table::try_new(schema, batches)
}

/// Stream a file lazily in batches, without materializing the whole
/// dataset.
pub(crate) fn batch_stream(path: &Path, batch_size: usize) -> ContrailResult<BatchStream> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(batch_size)
        .build()?;
    Ok(futures::stream::iter(reader.map(|batch| batch.map_err(ContrailError::from))).boxed())
}

/// Appends upload chunks to a temporary file; the artifact becomes
/// visible only on [`finish`][IncrementalWriter::finish]. An aborted or
/// dropped writer leaves no final artifact behind.
pub(crate) struct IncrementalWriter {
    writer: ArrowWriter<File>,
    tmp: PathBuf,
}

impl IncrementalWriter {
    pub fn create(tmp: PathBuf, schema: SchemaRef) -> ContrailResult<Self> {
        let file = File::create(&tmp)?;
        let writer = ArrowWriter::try_new(file, schema, None)?;
        Ok(Self { writer, tmp })
    }

    pub fn append(&mut self, batch: &RecordBatch) -> ContrailResult<()> {
        Ok(self.writer.write(batch)?)
    }

    /// Close the temporary file and return its path for promotion.
    pub fn finish(self) -> ContrailResult<PathBuf> {
        if let Err(e) = self.writer.close() {
            let _ = std::fs::remove_file(&self.tmp);
            return Err(e.into());
        }
        Ok(self.tmp)
    }

    /// Discard everything written so far.
    pub fn abort(self) {
        drop(self.writer);
        if let Err(e) = std::fs::remove_file(&self.tmp) {
            log::warn!("failed to remove aborted upload {}: {}", self.tmp.display(), e);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use arrow_array::Int64Array;
    use arrow_schema::{DataType, Field, Schema};

    use super::*;

    fn table() -> Table {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(Int64Array::from(vec![1, 2, 3, 4]))],
        )
        .unwrap();
        Table::try_new(schema, vec![batch]).unwrap()
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");
        write_table(&path, &table()).unwrap();
        let read = read_table(&path).unwrap();
        assert_eq!(read.num_rows(), 4);
        assert_eq!(read.column_names(), vec!["v"]);
    }

    #[tokio::test]
    async fn streams_in_requested_batch_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");
        write_table(&path, &table()).unwrap();
        let mut stream = batch_stream(&path, 2).unwrap();
        let mut sizes = Vec::new();
        while let Some(batch) = stream.next().await {
            sizes.push(batch.unwrap().num_rows());
        }
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn aborted_writer_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join("partial.parquet.tmp");
        let mut writer = IncrementalWriter::create(tmp.clone(), table().schema()).unwrap();
        writer.append(&table().batches()[0]).unwrap();
        writer.abort();
        assert!(!tmp.exists());
    }
}
