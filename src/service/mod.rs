pub mod exporter;
pub mod grouper;
pub mod workflow;

pub use exporter::{
    read_document, validate_document_name, CsvDocumentWriter, DocumentExporter, DocumentWriter,
    ExportError,
};
pub use grouper::{group_by_company, InvoiceGroups};
pub use workflow::{ItemView, Workflow, WorkflowError, WorkflowSnapshot};
