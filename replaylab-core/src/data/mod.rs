//! Bar sources, the time-aligned cursor and the read-only view strategies get.

pub mod cursor;
pub mod source;
pub mod view;

pub use cursor::{CursorError, DataCursor};
pub use source::{BarSource, DataError, DateRange, InMemorySource};
pub use view::DataView;
