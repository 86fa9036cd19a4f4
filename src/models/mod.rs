pub mod collection;
pub mod export;
pub mod item;

pub use collection::CollectionStore;
pub use export::{DocumentResult, ExportReport, GroupOutcome};
pub use item::{InvoiceEntry, Item, ItemId, ItemStatus};
