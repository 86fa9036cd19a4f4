use crate::models::{DocumentResult, ExportReport, GroupOutcome, InvoiceEntry, Item};
use crate::service::grouper::InvoiceGroups;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Column order of every exported document
pub const DOCUMENT_HEADER: [&str; 3] = ["name", "company", "price"];

pub const DOCUMENT_EXTENSION: &str = "csv";

const MAX_NAME_BYTES: usize = 200;
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Device names Windows reserves regardless of extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("company {company:?} cannot be used as a document name: {reason}")]
    UnsafeGroupKey { company: String, reason: &'static str },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error on {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

fn is_reserved_device_name(company: &str) -> bool {
    let stem = company.split('.').next().unwrap_or(company).trim_end();
    RESERVED_NAMES.iter().any(|name| name.eq_ignore_ascii_case(stem))
}

/// Check that a company key maps to a plain file name inside the output directory
pub fn validate_document_name(company: &str) -> Result<(), ExportError> {
    let reason = if company.is_empty() {
        Some("empty company")
    } else if company == "." || company == ".." {
        Some("relative path component")
    } else if company.contains('/') || company.contains('\\') {
        Some("contains a path separator")
    } else if company.chars().any(char::is_control) {
        Some("contains a control character")
    } else if company.contains(RESERVED_CHARS) {
        Some("contains a reserved file name character")
    } else if company.ends_with('.') || company.ends_with(' ') {
        // Windows strips these, "Acme " and "Acme" would be one file
        Some("ends with a dot or space")
    } else if is_reserved_device_name(company) {
        Some("reserved device name")
    } else if company.len() > MAX_NAME_BYTES {
        Some("too long")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ExportError::UnsafeGroupKey {
            company: company.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Run `write` against a temp file in `dir`, then rename it onto `path`.
///
/// `path` is only replaced once `write` succeeds; on failure the temp file
/// is removed and any previous document at `path` stays as it was.
fn persist_atomically<F>(dir: &Path, path: &Path, write: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut File) -> Result<(), ExportError>,
{
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".export-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    write(tmp.as_file_mut())?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Serializes one company group into a standalone document
pub trait DocumentWriter {
    /// Write the document for `company` and return where it landed
    fn write_document(&self, company: &str, entries: &[InvoiceEntry]) -> Result<PathBuf, ExportError>;
}

/// Writes `<output_dir>/<company>.csv` with a `name,company,price` header
#[derive(Debug, Clone)]
pub struct CsvDocumentWriter {
    output_dir: PathBuf,
}

impl CsvDocumentWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Validated path of the document for `company`
    pub fn document_path(&self, company: &str) -> Result<PathBuf, ExportError> {
        validate_document_name(company)?;
        Ok(self
            .output_dir
            .join(format!("{company}.{DOCUMENT_EXTENSION}")))
    }
}

impl DocumentWriter for CsvDocumentWriter {
    fn write_document(&self, company: &str, entries: &[InvoiceEntry]) -> Result<PathBuf, ExportError> {
        let path = self.document_path(company)?;

        std::fs::create_dir_all(&self.output_dir).map_err(|source| ExportError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        persist_atomically(&self.output_dir, &path, |file| {
            let csv_err = |source| ExportError::Csv {
                path: path.clone(),
                source,
            };

            // header is written explicitly so an empty group still gets one
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            writer.write_record(DOCUMENT_HEADER).map_err(csv_err)?;
            for entry in entries {
                writer.serialize(&entry.item).map_err(csv_err)?;
            }
            writer.flush().map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })
        })?;

        Ok(path)
    }
}

/// Read a document produced by `CsvDocumentWriter`
pub fn read_document(path: &Path) -> Result<Vec<Item>, ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize::<Item>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(csv_err)
}

/// Emits one document per company group
#[derive(Debug, Clone)]
pub struct DocumentExporter<W = CsvDocumentWriter> {
    writer: W,
}

impl DocumentExporter<CsvDocumentWriter> {
    pub fn to_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self::new(CsvDocumentWriter::new(output_dir))
    }
}

impl<W: DocumentWriter> DocumentExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Reject the batch if any key is unsafe, or if two keys would name the
    /// same file on a case-insensitive filesystem.
    pub fn validate(groups: &InvoiceGroups) -> Result<(), ExportError> {
        let mut seen: HashMap<String, &str> = HashMap::with_capacity(groups.len());
        for company in groups.keys() {
            validate_document_name(company)?;
            if seen.insert(company.to_lowercase(), company).is_some() {
                return Err(ExportError::UnsafeGroupKey {
                    company: company.clone(),
                    reason: "collides with another company's document name",
                });
            }
        }
        Ok(())
    }

    /// Write every group and report per-group outcomes.
    ///
    /// Key validation fails the whole call before anything is written; after
    /// that, a failed group does not stop the rest of the batch.
    pub fn export(&self, groups: &InvoiceGroups) -> Result<ExportReport, ExportError> {
        Self::validate(groups)?;

        let mut outcomes = Vec::with_capacity(groups.len());
        for (company, entries) in groups {
            let result = match self.writer.write_document(company, entries) {
                Ok(path) => {
                    tracing::info!(
                        "Wrote document for company {:?}: {} items -> {}",
                        company,
                        entries.len(),
                        path.display()
                    );
                    DocumentResult::Written { path }
                }
                Err(e) => {
                    tracing::error!("Document for company {:?} failed: {}", company, e);
                    DocumentResult::Failed { error: e.to_string() }
                }
            };

            outcomes.push(GroupOutcome {
                company: company.clone(),
                item_ids: entries.iter().map(|e| e.id).collect(),
                result,
            });
        }

        let report = ExportReport::new(outcomes);
        tracing::info!(
            "Export finished: {} documents written, {} failed",
            report.written_count(),
            report.failed_count()
        );
        Ok(report)
    }
}
