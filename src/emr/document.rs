//! Document generation: the remote EMR PDF call and attachment formatting
//!
//! This is an external collaborator, invoked only after the conversation
//! reaches a terminal state. Its failures become plain user-visible
//! messages, never engine faults.

use base64::Engine as _;
use thiserror::Error;

use crate::dialog::OutboundMessage;

use super::profile::UserProfile;

/// Errors from the document generation call
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The HTTP request itself failed
    #[error("document API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("document API returned status {0}")]
    Status(reqwest::StatusCode),

    /// No client is configured for this deployment
    #[error("document generation is not configured")]
    Disabled,
}

/// Convenience result alias for document operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// Produces a binary document for a completed profile
pub trait DocumentClient {
    /// Generate the EMR document, returning its raw bytes
    fn generate(&self, profile: &UserProfile) -> DocumentResult<Vec<u8>>;
}

/// Blocking HTTP client posting the profile as JSON
#[derive(Debug)]
pub struct HttpDocumentClient {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpDocumentClient {
    /// Create a client for the given endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl DocumentClient for HttpDocumentClient {
    fn generate(&self, profile: &UserProfile) -> DocumentResult<Vec<u8>> {
        let response = self.client.post(&self.url).json(profile).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DocumentError::Status(status));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Client for deployments without a document API
#[derive(Debug, Default)]
pub struct DisabledDocumentClient;

impl DocumentClient for DisabledDocumentClient {
    fn generate(&self, _profile: &UserProfile) -> DocumentResult<Vec<u8>> {
        Err(DocumentError::Disabled)
    }
}

/// Package PDF bytes as an attachment message with a base64 data URL
pub fn pdf_attachment(name: impl Into<String>, bytes: &[u8]) -> OutboundMessage {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    OutboundMessage::Attachment {
        name: name.into(),
        content_type: "application/pdf".into(),
        content_url: format!("data:application/pdf;base64,{encoded}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_carries_a_data_url() {
        let message = pdf_attachment("GeneratedPdf.pdf", b"%PDF-1.4");
        match message {
            OutboundMessage::Attachment {
                name,
                content_type,
                content_url,
            } => {
                assert_eq!(name, "GeneratedPdf.pdf");
                assert_eq!(content_type, "application/pdf");
                assert!(content_url.starts_with("data:application/pdf;base64,"));
            }
            OutboundMessage::Text { .. } => panic!("expected an attachment"),
        }
    }
}
