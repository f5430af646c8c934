use std::path::Path;

use csv::Writer;

use crate::error::Result;
use crate::flatten::RecordTable;

/// Writes the record table to the given path, header row first.
///
/// Any existing file at the path is replaced.
pub fn write_table(path: &Path, table: &RecordTable) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
