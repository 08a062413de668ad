//! Form validation. Runs before any network call.

use crate::core::{ImageSource, PatchForm, PatchRequest, SourceType};
use crate::errors::FabricatorError;
use crate::upload::IMAGE_EXTENSION;

/// Message shown when no credential was resolved.
pub const MISSING_TOKEN_MESSAGE: &str =
    "GitHub token not configured. Please check your environment configuration.";

/// Checks a form and turns it into a request.
///
/// The credential is checked first, then the image source matching the
/// selected source type, then the KMI version. Only the source matching the
/// source type is carried over.
pub fn validate(form: PatchForm) -> Result<PatchRequest, FabricatorError> {
    let credential = form
        .credential
        .filter(|c| !c.is_empty())
        .ok_or_else(|| FabricatorError::configuration(MISSING_TOKEN_MESSAGE))?;

    let source = match form.source_type {
        SourceType::File => {
            let path = form
                .file
                .ok_or_else(|| FabricatorError::validation("file", "Please select a file"))?;
            let is_image = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.to_ascii_lowercase().ends_with(IMAGE_EXTENSION));
            if !is_image {
                return Err(FabricatorError::validation("file", "Please select a .img file"));
            }
            ImageSource::File(path)
        }
        SourceType::Url => {
            let url = form
                .image_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .ok_or_else(|| FabricatorError::validation("image_url", "Please provide an image URL"))?;
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(FabricatorError::validation(
                    "image_url",
                    "Image URL must start with http:// or https://",
                ));
            }
            ImageSource::Url(url)
        }
    };

    if form.variant.requires_kmi() && form.kmi_version.is_none() {
        return Err(FabricatorError::validation(
            "kmi_version",
            format!("Please select a KMI version for {}", form.variant.display_name()),
        ));
    }

    Ok(PatchRequest {
        source,
        variant: form.variant,
        kmi_version: form.kmi_version,
        credential,
    })
}
