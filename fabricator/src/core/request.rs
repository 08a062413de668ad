//! Patch submissions: the raw form, the validated request, and the inputs
//! that are finally dispatched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::patcher::{KmiVersion, PatcherVariant};
use crate::config::Credential;
use crate::errors::ValidationError;

/// Where the boot image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// A local file that gets uploaded first.
    #[default]
    File,
    /// A direct download URL.
    Url,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Url => write!(f, "url"),
        }
    }
}

impl FromStr for SourceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "file" => Ok(Self::File),
            "url" => Ok(Self::Url),
            other => Err(ValidationError::new(
                "source_type",
                format!("Unknown image source: '{other}'"),
            )),
        }
    }
}

/// Raw user choices, before validation.
#[derive(Debug, Clone, Default)]
pub struct PatchForm {
    /// Selected source type.
    pub source_type: SourceType,
    /// Selected local file, if any.
    pub file: Option<PathBuf>,
    /// Entered image URL, if any.
    pub image_url: Option<String>,
    /// Selected patcher.
    pub variant: PatcherVariant,
    /// Selected KMI version.
    pub kmi_version: Option<KmiVersion>,
    /// Credential used to authenticate the dispatch.
    pub credential: Option<Credential>,
}

impl PatchForm {
    /// Creates a form for a remote image URL.
    #[must_use]
    pub fn from_url(url: impl Into<String>, variant: PatcherVariant) -> Self {
        Self {
            source_type: SourceType::Url,
            image_url: Some(url.into()),
            variant,
            ..Default::default()
        }
    }

    /// Creates a form for a local image file.
    #[must_use]
    pub fn from_file(path: impl Into<PathBuf>, variant: PatcherVariant) -> Self {
        Self {
            source_type: SourceType::File,
            file: Some(path.into()),
            variant,
            ..Default::default()
        }
    }

    /// Sets the KMI version.
    #[must_use]
    pub fn with_kmi(mut self, kmi: KmiVersion) -> Self {
        self.kmi_version = Some(kmi);
        self
    }

    /// Sets the credential.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }
}

/// The single image source of a validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Local file to upload.
    File(PathBuf),
    /// Remote image URL.
    Url(String),
}

/// A validated submission. Lives only for one submission.
#[derive(Debug, Clone)]
pub struct PatchRequest {
    /// Exactly one image source.
    pub source: ImageSource,
    /// Selected patcher.
    pub variant: PatcherVariant,
    /// KMI version; present whenever the variant requires it.
    pub kmi_version: Option<KmiVersion>,
    /// Credential used to authenticate.
    pub credential: Credential,
}

/// Named string inputs of one workflow dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Patcher; selects the workflow definition.
    pub variant: PatcherVariant,
    /// Hosted image URL.
    pub image_url: Option<String>,
    /// Image inlined as base64.
    pub image_base64: Option<String>,
    /// KMI version.
    pub kmi_version: Option<KmiVersion>,
}

impl DispatchRequest {
    /// Creates a dispatch for a hosted image.
    #[must_use]
    pub fn for_url(
        variant: PatcherVariant,
        image_url: impl Into<String>,
        kmi_version: Option<KmiVersion>,
    ) -> Self {
        Self {
            variant,
            image_url: Some(image_url.into()),
            image_base64: None,
            kmi_version,
        }
    }

    /// Creates a dispatch carrying the image inline.
    #[must_use]
    pub fn for_inline(
        variant: PatcherVariant,
        image_base64: impl Into<String>,
        kmi_version: Option<KmiVersion>,
    ) -> Self {
        Self {
            variant,
            image_url: None,
            image_base64: Some(image_base64.into()),
            kmi_version,
        }
    }

    /// Workflow inputs, omitting empty values.
    #[must_use]
    pub fn inputs(&self) -> BTreeMap<String, String> {
        let mut inputs = BTreeMap::new();
        inputs.insert("patcher_type".to_string(), self.variant.as_str().to_string());
        let optional = [
            ("image_url", self.image_url.as_deref()),
            ("image_base64", self.image_base64.as_deref()),
            ("kmi_version", self.kmi_version.as_ref().map(KmiVersion::as_str)),
        ];
        for (key, value) in optional {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                inputs.insert(key.to_string(), value.to_string());
            }
        }
        inputs
    }

    /// Combined character count of all non-empty inputs.
    #[must_use]
    pub fn input_chars(&self) -> usize {
        self.inputs().values().map(|v| v.chars().count()).sum()
    }
}
