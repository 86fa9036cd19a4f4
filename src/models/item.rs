use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog item (name, company, price)
///
/// Produced by the catalog search and never mutated afterwards; the workflow
/// only moves it between collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(default)]
    pub company: String, // grouping key
    pub price: f64,
}

impl Item {
    pub fn new(name: impl Into<String>, company: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            company: company.into(),
            price,
        }
    }
}

/// Registry id, assigned when an item enters a `CollectionStore`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Which collection an entry currently lives in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    InSearchResults,
    InBasket,
    InInvoice,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::InSearchResults => "search results",
            ItemStatus::InBasket => "basket",
            ItemStatus::InInvoice => "invoice",
        };
        f.write_str(s)
    }
}

/// An invoice item together with its registry id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceEntry {
    pub id: ItemId,
    pub item: Item,
}
