//! Local file ingestion for uploads.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use contrail_error::{ContrailResult, contrail_bail, contrail_err};
use contrail_table::Table;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

/// Parse a `.csv` or `.parquet` file into a table, returning the file
/// stem as the dataset name.
pub(crate) fn read_file(path: &Path) -> ContrailResult<(String, Table)> {
    let name = path
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or_else(|| contrail_err!(InvalidArguments: "cannot derive a dataset name from {}", path.display()))?;
    let extension = path.extension().and_then(OsStr::to_str).unwrap_or("");
    let table = match extension {
        "csv" => read_csv(path)?,
        "parquet" => read_parquet(path)?,
        other => {
            contrail_bail!(InvalidArguments: "unknown file format '{}', use .csv or .parquet", other)
        }
    };
    Ok((name.to_string(), table))
}

fn read_csv(path: &Path) -> ContrailResult<Table> {
    let mut file = File::open(path)?;
    let format = arrow::csv::reader::Format::default().with_header(true);
    let (schema, _) = format.infer_schema(&mut file, None)?;
    file.seek(SeekFrom::Start(0))?;
    let schema: SchemaRef = Arc::new(schema);
    let reader = arrow::csv::ReaderBuilder::new(schema.clone())
        .with_header(true)
        .build(file)?;
    collect(schema, reader)
}

fn read_parquet(path: &Path) -> ContrailResult<Table> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    collect(schema, builder.build()?)
}

fn collect(
    schema: SchemaRef,
    reader: impl Iterator<Item = Result<RecordBatch, arrow_schema::ArrowError>>,
) -> ContrailResult<Table> {
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    if batches.is_empty() {
        return Ok(Table::empty(schema));
    }
    Table::try_new(schema, batches)
}
