//! A boot image loaded for upload.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

use crate::errors::FabricatorError;

/// Extension accepted by the file picker.
pub const IMAGE_EXTENSION: &str = ".img";

/// Name and contents of a local boot image.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    name: String,
    data: Vec<u8>,
}

impl ImageFile {
    /// Wraps in-memory contents.
    #[must_use]
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Reads an image from disk. Only `.img` files are accepted.
    pub async fn open(path: &Path) -> Result<Self, FabricatorError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if !name.to_ascii_lowercase().ends_with(IMAGE_EXTENSION) {
            return Err(FabricatorError::validation("file", "Please select a .img file"));
        }
        let data = tokio::fs::read(path).await?;
        Ok(Self { name, data })
    }

    /// File name without directories.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw contents.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Standard base64 of the contents.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// Length of [`Self::to_base64`] without encoding anything.
    #[must_use]
    pub fn base64_len(&self) -> usize {
        self.data.len().div_ceil(3) * 4
    }
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}
