use crate::models::InvoiceEntry;
use indexmap::IndexMap;

/// Company -> invoice entries, in first-seen order
pub type InvoiceGroups = IndexMap<String, Vec<InvoiceEntry>>;

/// Partition invoice entries by company.
///
/// Groups appear in the order their key is first seen; entries keep invoice
/// order within a group. Keys compare by exact string equality, so an empty
/// company is a group of its own.
pub fn group_by_company<I>(entries: I) -> InvoiceGroups
where
    I: IntoIterator<Item = InvoiceEntry>,
{
    let mut groups = InvoiceGroups::new();
    for entry in entries {
        groups
            .entry(entry.item.company.clone())
            .or_insert_with(Vec::new)
            .push(entry);
    }
    groups
}
