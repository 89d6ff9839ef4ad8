//! Row Selector

use crate::error::StoreError;
use crate::store::SheetPort;
use crate::types::SourceRow;

/// A row is pending when its marker is blank and it carries any content.
pub fn is_pending(row: &SourceRow) -> bool {
    if !row.marker.trim().is_empty() {
        return false;
    }
    !(row.category_id.trim().is_empty()
        && row.category_name.trim().is_empty()
        && row.raw_html.trim().is_empty())
}

pub fn select_pending(rows: Vec<SourceRow>) -> Vec<SourceRow> {
    rows.into_iter().filter(is_pending).collect()
}

/// Read the source sheet and keep only rows that still need processing.
pub fn pending_rows<P: SheetPort + ?Sized>(port: &mut P) -> Result<Vec<SourceRow>, StoreError> {
    Ok(select_pending(port.read_source_rows()?))
}
