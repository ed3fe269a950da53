//! In-memory table engine: columns, records, the derived view and the
//! selection/edit state, driven through [`Sheet::apply`].

pub mod columns;
pub mod engine;
pub mod records;
pub mod selection;
pub mod view;

pub use columns::{Column, ColumnKind, DisplayHint};
pub use engine::{Effect, ExportSnapshot, Intent, Sheet};
pub use records::Value;
pub use selection::{NavKey, Phase, Selection};
pub use view::{STATUS_KEY, SortDirection, StatusFilter};
