//! Upload candidate
//!
//! An `AudioFile` can only be built through validation, so the lifecycle
//! controller never sees a file that failed the pre-flight check.

use std::fmt;
use std::path::Path;

use crate::error::ValidationError;
use crate::services::media_validator::{self, FALLBACK_MIME_TYPE};

/// Validated audio file ready for upload
#[derive(Clone, PartialEq, Eq)]
pub struct AudioFile {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl AudioFile {
    /// Read and validate a file from disk
    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let bytes = std::fs::read(path).map_err(|source| ValidationError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_bytes(file_name, None, bytes)
    }

    /// Validate in-memory content
    ///
    /// `declared_mime` is an optional caller-supplied type (e.g. from a browser
    /// or an HTTP header). When absent, the type is sniffed from magic bytes.
    pub fn from_bytes(
        file_name: impl Into<String>,
        declared_mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        let file_name = file_name.into();

        if bytes.is_empty() {
            return Err(ValidationError::Empty(file_name));
        }

        let detected = declared_mime
            .map(media_validator::normalize_mime)
            .or_else(|| media_validator::sniff_mime(&bytes));

        if !media_validator::is_audio_file(&file_name, detected) {
            tracing::debug!(
                file_name = %file_name,
                detected_mime = ?detected,
                "Rejected non-audio upload candidate"
            );
            return Err(ValidationError::NotAudio {
                file_name,
                detected_mime: detected.map(str::to_string),
            });
        }

        let mime_type = detected
            .filter(|m| media_validator::is_accepted_mime(m))
            .or_else(|| media_validator::mime_for_extension(&file_name))
            .unwrap_or(FALLBACK_MIME_TYPE)
            .to_string();

        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for AudioFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}
