mod controller;
mod registry;

pub use controller::{RowController, RowSnapshot};
pub use registry::{RowId, RowRegistry, RowView};
