//! Supporting documents uploaded alongside a leave request
use super::config::PortalConfig;
use super::error::ValidationError;
use super::store::Record;
use super::types::TimeStamp;
use super::utils::{self, ATTACHMENT_HRP};
use chrono::Utc;

/// An upload as received from the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: &str, data: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: None,
            data,
        }
    }
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Lowercased text after the last dot, or the whole name when there is none.
    pub fn extension(&self) -> String {
        self.filename
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    /// An upload without a file name is treated as no upload at all.
    pub fn is_present(&self) -> bool {
        !self.filename.trim().is_empty()
    }

    pub fn validate(&self, config: &PortalConfig) -> Result<(), ValidationError> {
        let size = self.data.len() as u64;
        if size > config.max_attachment_bytes {
            return Err(ValidationError::AttachmentTooLarge {
                size,
                limit: config.max_attachment_bytes,
            });
        }
        let extension = self.extension();
        if !config.allowed_extensions.iter().any(|e| *e == extension) {
            return Err(ValidationError::AttachmentType(
                extension,
                config.allowed_extensions.join(", ").to_uppercase(),
            ));
        }
        Ok(())
    }
}

/// An attachment persisted against a leave request.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct StoredAttachment {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub leave_id: String,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub mimetype: Option<String>,
    #[n(4)]
    pub checksum: String, // sha256 of data
    #[cbor(n(5), with = "minicbor::bytes")]
    pub data: Vec<u8>,
    #[n(6)]
    pub created_at: TimeStamp<Utc>,
}

impl StoredAttachment {
    pub fn from_upload(
        leave_id: &str,
        upload: Attachment,
        created_at: TimeStamp<Utc>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            id: utils::new_uuid_to_bech32(ATTACHMENT_HRP)?,
            leave_id: leave_id.to_string(),
            checksum: sha256::digest(&upload.data),
            name: upload.filename,
            mimetype: upload.content_type,
            data: upload.data,
            created_at,
        })
    }

    pub fn verify(&self) -> bool {
        sha256::digest(&self.data) == self.checksum
    }
}

impl Record for StoredAttachment {
    const TREE: &'static str = "attachments";

    fn id(&self) -> &str {
        &self.id
    }
}
