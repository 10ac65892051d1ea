// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

//! Result export and serial import, both in the usual spreadsheet dialect:
//! a header row, one row per record, fields quoted only when necessary.

use std::{fs, io, path::Path};

use crate::{
    error::{Error, Result},
    record::DeviceRecord,
};

/// Write `records`, header first. Unknown columns render as empty cells.
pub fn write_records<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    records: &[DeviceRecord],
) -> csv::Result<()> {
    let header = DeviceRecord::COLUMNS;
    wtr.write_record(header)?;
    for record in records {
        wtr.write_record(header.iter().map(|column| record.get(column).unwrap_or("")))?;
    }
    Ok(())
}

pub fn to_string(records: &[DeviceRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    write_records(&mut wtr, records)?;
    let buf = wtr.into_inner().map_err(|err| Error::Io(err.into_error()))?;
    String::from_utf8(buf).map_err(|err| Error::Validation(err.to_string()))
}

pub fn export<P: AsRef<Path>>(path: P, records: &[DeviceRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    write_records(&mut wtr, records)?;
    wtr.flush()?;
    Ok(())
}

/// Values of `column` from CSV with a header row. Values are trimmed and
/// blank cells skipped.
pub fn column_values<R: io::Read>(rdr: R, column: &str) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);

    // Spreadsheet exports often start with a byte order mark
    let idx = rdr
        .headers()?
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| Error::Validation(format!("Missing column \"{}\"", column)))?;

    let mut values = Vec::new();
    for row in rdr.records() {
        let row = row?;
        if let Some(value) = row.get(idx).map(str::trim) {
            if !value.is_empty() {
                values.push(value.to_string());
            }
        }
    }
    Ok(values)
}

/// Serial numbers from the named column of a CSV file.
pub fn load_serials<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<String>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(Error::Validation(format!(
            "Unsupported file type '{}'. Please select a CSV file.",
            path.display()
        )));
    }
    column_values(fs::File::open(path)?, column)
}
