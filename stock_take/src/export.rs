//! CSV export of the counted stock

use crate::models::Item;
use std::io::Write;

/// Column headers, matching the JSON field names
pub const CSV_HEADER: [&str; 6] = ["id", "barcode", "partNumber", "name", "qty", "loc"];

/// Write all items as CSV (header first); missing text fields become empty cells
pub fn write_items_csv<W: Write>(writer: W, items: &[Item]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;

    for item in items {
        wtr.write_record([
            item.id.to_string().as_str(),
            item.barcode.as_str(),
            item.part_number.as_deref().unwrap_or(""),
            item.name.as_deref().unwrap_or(""),
            item.qty.to_string().as_str(),
            item.loc.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Render all items to a CSV string
pub fn items_to_csv(items: &[Item]) -> csv::Result<String> {
    let mut buf = Vec::new();
    write_items_csv(&mut buf, items)?;
    // csv only ever writes the UTF-8 it was given
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
