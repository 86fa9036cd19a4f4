use crate::models::{CollectionStore, ExportReport, InvoiceEntry, Item, ItemId, ItemStatus};
use crate::service::exporter::{DocumentExporter, DocumentWriter, ExportError};
use crate::service::grouper::{group_by_company, InvoiceGroups};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("item {0} is not known to this workflow")]
    UnknownItem(ItemId),

    #[error("item {id} is in the {actual}, expected it in the {expected}")]
    InvalidTransition {
        id: ItemId,
        expected: ItemStatus,
        actual: ItemStatus,
    },
}

/// One row of a collection view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    #[serde(flatten)]
    pub item: Item,
}

/// Serializable view of all three collections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub search_results: Vec<ItemView>,
    pub basket: Vec<ItemView>,
    pub invoice: Vec<ItemView>,
}

/// Search results -> basket -> invoice state machine for one session
#[derive(Debug, Default)]
pub struct Workflow {
    store: CollectionStore,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the search snapshot. Basket and invoice are left alone.
    pub fn replace_search_results(&mut self, items: Vec<Item>) -> Vec<ItemId> {
        self.store.clear_search_results();
        let ids: Vec<ItemId> = items
            .into_iter()
            .map(|item| self.store.insert(item, ItemStatus::InSearchResults))
            .collect();
        tracing::debug!("Search results replaced: {} items", ids.len());
        ids
    }

    /// Put a copy of a search result into the basket.
    ///
    /// The search result stays where it is, so selecting it again adds
    /// another basket entry. Returns the new basket entry's id.
    pub fn select(&mut self, id: ItemId) -> Result<ItemId, WorkflowError> {
        self.expect_status(id, ItemStatus::InSearchResults)?;
        let item = self
            .store
            .get(id)
            .cloned()
            .ok_or(WorkflowError::UnknownItem(id))?;

        let basket_id = self.store.insert(item, ItemStatus::InBasket);
        tracing::debug!("Selected search result {} as basket item {}", id, basket_id);
        Ok(basket_id)
    }

    /// Move a basket entry to the end of the invoice
    pub fn add_to_invoice(&mut self, id: ItemId) -> Result<(), WorkflowError> {
        self.transition(id, ItemStatus::InBasket, ItemStatus::InInvoice)
    }

    /// Move an invoice entry back to the end of the basket
    pub fn remove_from_invoice(&mut self, id: ItemId) -> Result<(), WorkflowError> {
        self.transition(id, ItemStatus::InInvoice, ItemStatus::InBasket)
    }

    /// Group the invoice by company, write one document per group, and drop
    /// the invoice entries whose document was written.
    ///
    /// An unsafe company key fails the call with nothing written and the
    /// invoice unchanged. Entries of failed groups stay in the invoice.
    pub fn export_invoice<W: DocumentWriter>(
        &mut self,
        exporter: &DocumentExporter<W>,
    ) -> Result<ExportReport, ExportError> {
        let groups = self.begin_export();
        let report = exporter.export(&groups)?;
        self.finish_export(&report);
        Ok(report)
    }

    /// Snapshot the invoice grouped by company. Nothing is removed until
    /// `finish_export` sees the report.
    pub fn begin_export(&self) -> InvoiceGroups {
        let groups = group_by_company(self.invoice_entries());
        tracing::info!(
            "Exporting invoice: {} items in {} company groups",
            self.store.len(ItemStatus::InInvoice),
            groups.len()
        );
        groups
    }

    /// Drop the invoice entries whose document was written. An entry moved
    /// out of the invoice since `begin_export` is left where it is.
    pub fn finish_export(&mut self, report: &ExportReport) {
        for id in report.succeeded_ids() {
            if self.store.status(id) == Some(ItemStatus::InInvoice) {
                self.store.remove(id);
            } else {
                tracing::debug!("Item {} left the invoice during export, keeping it", id);
            }
        }

        if !report.is_complete() {
            tracing::warn!(
                "{} company documents failed, {} items kept in invoice",
                report.failed_count(),
                self.store.len(ItemStatus::InInvoice)
            );
        }
    }

    pub fn search_results(&self) -> Vec<(ItemId, &Item)> {
        self.store.items(ItemStatus::InSearchResults)
    }

    pub fn basket(&self) -> Vec<(ItemId, &Item)> {
        self.store.items(ItemStatus::InBasket)
    }

    pub fn invoice(&self) -> Vec<(ItemId, &Item)> {
        self.store.items(ItemStatus::InInvoice)
    }

    pub fn invoice_entries(&self) -> Vec<InvoiceEntry> {
        self.invoice()
            .into_iter()
            .map(|(id, item)| InvoiceEntry {
                id,
                item: item.clone(),
            })
            .collect()
    }

    pub fn status(&self, id: ItemId) -> Option<ItemStatus> {
        self.store.status(id)
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let view = |rows: Vec<(ItemId, &Item)>| -> Vec<ItemView> {
            rows.into_iter()
                .map(|(id, item)| ItemView {
                    id,
                    item: item.clone(),
                })
                .collect()
        };

        WorkflowSnapshot {
            search_results: view(self.search_results()),
            basket: view(self.basket()),
            invoice: view(self.invoice()),
        }
    }

    fn transition(&mut self, id: ItemId, from: ItemStatus, to: ItemStatus) -> Result<(), WorkflowError> {
        self.expect_status(id, from)?;
        self.store.relocate(id, to);
        tracing::debug!("Item {} moved from {} to {}", id, from, to);
        Ok(())
    }

    fn expect_status(&self, id: ItemId, expected: ItemStatus) -> Result<(), WorkflowError> {
        match self.store.status(id) {
            None => Err(WorkflowError::UnknownItem(id)),
            Some(actual) if actual != expected => Err(WorkflowError::InvalidTransition {
                id,
                expected,
                actual,
            }),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentResult;
    use crate::service::exporter::read_document;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn catalog() -> Vec<Item> {
        vec![
            Item::new("A", "X", 20.0),
            Item::new("B", "Y", 15.0),
            Item::new("C", "X", 30.0),
        ]
    }

    fn names(rows: Vec<(ItemId, &Item)>) -> Vec<String> {
        rows.into_iter().map(|(_, i)| i.name.clone()).collect()
    }

    #[test]
    fn select_copies_without_removing_search_result() {
        let mut wf = Workflow::new();
        let ids = wf.replace_search_results(catalog());

        let first = wf.select(ids[0]).unwrap();
        let second = wf.select(ids[0]).unwrap();

        assert_ne!(first, second);
        assert_eq!(names(wf.search_results()), vec!["A", "B", "C"]);
        assert_eq!(names(wf.basket()), vec!["A", "A"]);
        assert_eq!(wf.status(ids[0]), Some(ItemStatus::InSearchResults));
    }

    #[test]
    fn add_and_remove_move_exact_entries() {
        let mut wf = Workflow::new();
        let ids = wf.replace_search_results(catalog());
        let a1 = wf.select(ids[0]).unwrap();
        let a2 = wf.select(ids[0]).unwrap();
        let b = wf.select(ids[1]).unwrap();

        wf.add_to_invoice(a2).unwrap();
        assert_eq!(wf.basket().iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![a1, b]);
        assert_eq!(names(wf.invoice()), vec!["A"]);

        wf.remove_from_invoice(a2).unwrap();
        assert_eq!(wf.basket().iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![a1, b, a2]);
        assert!(wf.invoice().is_empty());
    }

    #[test]
    fn skipping_a_stage_is_rejected_and_changes_nothing() {
        let mut wf = Workflow::new();
        let ids = wf.replace_search_results(catalog());

        let err = wf.add_to_invoice(ids[0]).unwrap_err();

        assert_eq!(
            err,
            WorkflowError::InvalidTransition {
                id: ids[0],
                expected: ItemStatus::InBasket,
                actual: ItemStatus::InSearchResults,
            }
        );
        assert!(wf.basket().is_empty());
        assert!(wf.invoice().is_empty());
        assert_eq!(wf.search_results().len(), 3);
    }

    #[test]
    fn transitions_from_wrong_source_are_rejected() {
        let mut wf = Workflow::new();
        let ids = wf.replace_search_results(catalog());
        let a = wf.select(ids[0]).unwrap();

        assert!(matches!(
            wf.remove_from_invoice(a),
            Err(WorkflowError::InvalidTransition { actual: ItemStatus::InBasket, .. })
        ));
        assert!(matches!(
            wf.select(a),
            Err(WorkflowError::InvalidTransition { expected: ItemStatus::InSearchResults, .. })
        ));

        wf.add_to_invoice(a).unwrap();
        assert!(matches!(
            wf.add_to_invoice(a),
            Err(WorkflowError::InvalidTransition { actual: ItemStatus::InInvoice, .. })
        ));
        assert_eq!(names(wf.basket()), Vec::<String>::new());
        assert_eq!(names(wf.invoice()), vec!["A"]);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut wf = Workflow::new();
        assert_eq!(wf.select(ItemId(99)), Err(WorkflowError::UnknownItem(ItemId(99))));
        assert_eq!(wf.add_to_invoice(ItemId(99)), Err(WorkflowError::UnknownItem(ItemId(99))));
        assert_eq!(
            wf.remove_from_invoice(ItemId(99)),
            Err(WorkflowError::UnknownItem(ItemId(99)))
        );
    }

    #[test]
    fn new_search_keeps_basket_and_invoice() {
        let mut wf = Workflow::new();
        let ids = wf.replace_search_results(catalog());
        let a = wf.select(ids[0]).unwrap();
        let b = wf.select(ids[1]).unwrap();
        wf.add_to_invoice(b).unwrap();

        let fresh = wf.replace_search_results(vec![Item::new("D", "Z", 11.0)]);

        assert_eq!(names(wf.search_results()), vec!["D"]);
        assert_eq!(wf.status(ids[0]), None);
        assert_eq!(wf.status(a), Some(ItemStatus::InBasket));
        assert_eq!(wf.status(b), Some(ItemStatus::InInvoice));
        assert!(wf.select(fresh[0]).is_ok());
    }

    #[test]
    fn export_clears_invoice_and_keeps_basket() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DocumentExporter::to_dir(dir.path());
        let mut wf = Workflow::new();
        let ids = wf.replace_search_results(catalog());
        let basket: Vec<ItemId> = ids.iter().map(|id| wf.select(*id).unwrap()).collect();
        let kept = wf.select(ids[1]).unwrap();
        for id in &basket {
            wf.add_to_invoice(*id).unwrap();
        }
        let basket_before = wf.snapshot().basket;

        let report = wf.export_invoice(&exporter).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.groups.len(), 2);
        assert!(wf.invoice().is_empty());
        assert_eq!(wf.snapshot().basket, basket_before);
        assert_eq!(wf.status(kept), Some(ItemStatus::InBasket));
        assert_eq!(
            names_of(&read_document(&dir.path().join("X.csv")).unwrap()),
            vec!["A", "C"]
        );
    }

    #[test]
    fn exporting_empty_invoice_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DocumentExporter::to_dir(dir.path());
        let mut wf = Workflow::new();

        let report = wf.export_invoice(&exporter).unwrap();

        assert!(report.groups.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unsafe_company_leaves_invoice_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DocumentExporter::to_dir(dir.path());
        let mut wf = Workflow::new();
        let ids = wf.replace_search_results(vec![
            Item::new("A", "X", 20.0),
            Item::new("B", "a/b", 20.0),
        ]);
        for id in ids {
            let b = wf.select(id).unwrap();
            wf.add_to_invoice(b).unwrap();
        }

        let err = wf.export_invoice(&exporter).unwrap_err();

        assert!(matches!(err, ExportError::UnsafeGroupKey { .. }));
        assert_eq!(names(wf.invoice()), vec!["A", "B"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn finish_export_keeps_items_moved_back_to_basket() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DocumentExporter::to_dir(dir.path());
        let mut wf = Workflow::new();
        let ids = wf.replace_search_results(catalog());
        let a = wf.select(ids[0]).unwrap();
        let b = wf.select(ids[1]).unwrap();
        wf.add_to_invoice(a).unwrap();
        wf.add_to_invoice(b).unwrap();

        let groups = wf.begin_export();
        wf.remove_from_invoice(a).unwrap();
        let report = exporter.export(&groups).unwrap();
        wf.finish_export(&report);

        assert!(report.is_complete());
        assert!(wf.invoice().is_empty());
        assert_eq!(wf.status(a), Some(ItemStatus::InBasket));
        assert_eq!(wf.status(b), None);
    }

    struct FailFor(&'static str);

    impl DocumentWriter for FailFor {
        fn write_document(&self, company: &str, _entries: &[InvoiceEntry]) -> Result<PathBuf, ExportError> {
            if company == self.0 {
                return Err(ExportError::Io {
                    path: PathBuf::from(company),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            Ok(PathBuf::from(format!("{company}.csv")))
        }
    }

    #[test]
    fn partial_failure_keeps_only_failed_group_in_invoice() {
        let exporter = DocumentExporter::new(FailFor("Y"));
        let mut wf = Workflow::new();
        let ids = wf.replace_search_results(catalog());
        for id in ids {
            let b = wf.select(id).unwrap();
            wf.add_to_invoice(b).unwrap();
        }

        let report = wf.export_invoice(&exporter).unwrap();

        assert_eq!(report.failed_count(), 1);
        assert!(matches!(report.groups[1].result, DocumentResult::Failed { .. }));
        assert_eq!(names(wf.invoice()), vec!["B"]);
    }

    fn names_of(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[derive(Debug, Clone)]
    enum Op {
        Select(usize),
        AddToInvoice(usize),
        RemoveFromInvoice(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..5).prop_map(Op::Select),
            (0usize..16).prop_map(Op::AddToInvoice),
            (0usize..16).prop_map(Op::RemoveFromInvoice),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: transitions applied to items legitimately in their source
        /// collection never lose or duplicate an entry across basket + invoice.
        #[test]
        fn basket_and_invoice_conserve_selected_items(ops in prop::collection::vec(op(), 0..60)) {
            let mut wf = Workflow::new();
            let search = wf.replace_search_results(
                (0..5).map(|i| Item::new(format!("item-{i}"), format!("co-{}", i % 2), 10.0 + i as f64)).collect(),
            );
            let mut selected: Vec<ItemId> = Vec::new();

            for op in ops {
                match op {
                    Op::Select(i) => selected.push(wf.select(search[i]).unwrap()),
                    Op::AddToInvoice(i) => {
                        let basket = wf.basket();
                        if !basket.is_empty() {
                            let id = basket[i % basket.len()].0;
                            wf.add_to_invoice(id).unwrap();
                        }
                    }
                    Op::RemoveFromInvoice(i) => {
                        let invoice = wf.invoice();
                        if !invoice.is_empty() {
                            let id = invoice[i % invoice.len()].0;
                            wf.remove_from_invoice(id).unwrap();
                        }
                    }
                }
            }

            let mut held: Vec<ItemId> = wf
                .basket()
                .into_iter()
                .chain(wf.invoice())
                .map(|(id, _)| id)
                .collect();
            held.sort_unstable();
            selected.sort_unstable();
            prop_assert_eq!(held, selected);
            prop_assert_eq!(wf.search_results().len(), 5);
        }
    }
}
