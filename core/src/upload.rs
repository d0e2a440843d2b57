//! Upload transport contract.
//!
//! A PDF reaches the backend either as raw bytes or as a link the backend
//! downloads itself; both are answered with an [`UploadAck`].

use core::fmt;
use core::future::Future;

use serde::{Deserialize, Serialize};

use crate::DocumentId;

/// What to upload.
#[derive(Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// A local PDF file.
    File {
        /// File name sent to the backend.
        name: String,
        /// Raw PDF bytes.
        bytes: Vec<u8>,
    },
    /// A link the backend downloads the PDF from.
    Url(String),
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { name, bytes } => f
                .debug_struct("File")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
        }
    }
}

/// Backend acknowledgment of an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAck {
    /// Identifier assigned to the document.
    pub document_id: DocumentId,
    /// Initial status reported by the backend, raw.
    #[serde(default)]
    pub status: Option<String>,
    /// Storage path of the stored PDF.
    #[serde(default)]
    pub file_path: Option<String>,
    /// Public URL of the stored PDF.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Whether the backend matched an existing upload with the same content.
    #[serde(default)]
    pub deduplicated: bool,
}

/// Submits documents to the backend.
pub trait Uploader: Send + Sync {
    /// Uploads a document and returns the backend's acknowledgment.
    fn upload(&self, source: UploadSource) -> impl Future<Output = crate::Result<UploadAck>> + Send;
}
