//! Error types for the bookcut library.

use std::io;
use thiserror::Error;

/// Result type alias for bookcut operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while partitioning a book.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading or writing a JSON document (TOC input, manifest).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The master document is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The master document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// A TOC entry could not be parsed or its anchor could not be placed
    /// on a physical page.
    #[error("Malformed TOC (entry {entry}): {detail}")]
    MalformedToc {
        /// 1-based entry (or source line) number.
        entry: usize,
        /// What went wrong.
        detail: String,
    },

    /// A computed range ends before it starts.
    #[error("Unresolvable range for \"{title}\": end page {end} precedes start page {start}")]
    UnresolvableRange {
        /// Title of the owning TOC entry.
        title: String,
        /// Computed start page.
        start: u32,
        /// Computed end page.
        end: u32,
    },

    /// No page after the last chapter matched the bibliography signature.
    #[error("Bibliography not found between page {lower_bound} and page {total_pages}")]
    BibliographyNotFound {
        /// First page that was scanned.
        lower_bound: u32,
        /// Last page of the document.
        total_pages: u32,
    },

    /// A single PDF artifact could not be produced.
    #[error("Cannot extract \"{title}\" (pages {start}-{end}): {reason}")]
    Partition {
        /// Title of the range.
        title: String,
        /// First page of the range.
        start: u32,
        /// Last page of the range.
        end: u32,
        /// Underlying cause.
        reason: String,
    },

    /// An HTML fragment could not be placed into the partition.
    #[error("Assembly error at page {page}: {detail}")]
    Assembly {
        /// Physical page of the offending fragment.
        page: u32,
        /// What went wrong.
        detail: String,
    },

    /// The strict verifier reported violations.
    #[error("Verification failed with {0} violation(s)")]
    Verification(usize),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl Error {
    /// Whether the run can carry on after this error.
    ///
    /// A missing bibliography degrades to "no carve-out" and a failed PDF
    /// slice only loses that one artifact; everything else stops its stage.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::BibliographyNotFound { .. } | Error::Partition { .. }
        )
    }
}
