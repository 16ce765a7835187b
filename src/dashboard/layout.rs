use crate::dom::{Document, NodeId};

/// Widest grid the dashboard ever uses.
pub const MAX_COLUMNS: usize = 4;

/// Column count for `widgets` cards.
pub fn column_count(widgets: usize) -> usize {
    match widgets {
        0..=1 => 1,
        2..=4 => 2,
        5..=6 => 3,
        _ => MAX_COLUMNS,
    }
}

pub fn grid_template(columns: usize) -> String {
    format!("grid-template-columns: repeat({columns}, 1fr)")
}

/// Write the grid for `widgets` cards onto `host` and return the column count.
pub fn apply(doc: &mut Document, host: NodeId, widgets: usize) -> usize {
    let columns = column_count(widgets);
    doc.set_attr(host, "data-columns", &columns.to_string());
    doc.set_attr(host, "style", &grid_template(columns));
    columns
}

/// Chunk `items` into rows of `columns`, the order a grid would place them.
pub fn rows<T>(items: &[T], columns: usize) -> impl Iterator<Item = &[T]> {
    items.chunks(columns.max(1))
}
