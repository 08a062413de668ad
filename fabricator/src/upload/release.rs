//! Staging an image as an asset of a temporary pre-release.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::image::ImageFile;
use super::progress::SharedProgress;
use crate::errors::{FabricatorError, UploadError};
use crate::github::{ActionsTransport, Release, ReleaseDraft};

/// Tag prefix of staging releases.
pub const STAGING_TAG_PREFIX: &str = "lkm-upload-";

/// An image staged on a release. Pass it to [`ReleaseStaging::discard`] once
/// the run no longer needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    /// The temporary release.
    pub release: Release,
    /// Public download URL of the asset.
    pub url: String,
}

/// Uploads images as release assets on the target repository.
///
/// Needs a token with `contents: write`.
pub struct ReleaseStaging<T: ActionsTransport> {
    transport: Arc<T>,
}

impl<T: ActionsTransport> ReleaseStaging<T> {
    /// Creates a stager over `transport`.
    #[must_use]
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Creates a published pre-release and uploads `file` to it.
    ///
    /// If the asset upload fails the release is deleted again.
    pub async fn stage(
        &self,
        file: &ImageFile,
        progress: SharedProgress,
    ) -> Result<StagedUpload, FabricatorError> {
        let draft = staging_draft(file);
        let release = self
            .transport
            .create_release(&draft)
            .await
            .map_err(permission_hint)?;
        info!(release_id = release.id, tag = %release.tag_name, "Created staging release");

        match self.transport.upload_release_asset(&release, file, progress).await {
            Ok(asset) => {
                info!(
                    release_id = release.id,
                    url = %asset.browser_download_url,
                    "Staged image"
                );
                Ok(StagedUpload {
                    release,
                    url: asset.browser_download_url,
                })
            }
            Err(err) => {
                if let Err(cleanup) = self.transport.delete_release(&release).await {
                    warn!(release_id = release.id, error = %cleanup, "Could not delete staging release");
                }
                Err(permission_hint(err))
            }
        }
    }

    /// Deletes a staging release and its tag.
    pub async fn discard(&self, staged: &StagedUpload) -> Result<(), FabricatorError> {
        self.transport.delete_release(&staged.release).await?;
        info!(release_id = staged.release.id, "Discarded staging release");
        Ok(())
    }
}

impl<T: ActionsTransport> std::fmt::Debug for ReleaseStaging<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseStaging").finish_non_exhaustive()
    }
}

fn staging_draft(file: &ImageFile) -> ReleaseDraft {
    let tag = format!("{STAGING_TAG_PREFIX}{}", Uuid::new_v4().simple());
    ReleaseDraft {
        name: format!("Upload {}", file.name()),
        body: "Temporary upload for a patch run. Safe to delete.".to_string(),
        tag_name: tag,
        draft: false,
        prerelease: true,
    }
}

/// 401/403/404 on the release endpoints means the token cannot write.
fn permission_hint(err: FabricatorError) -> FabricatorError {
    match err {
        FabricatorError::Remote(remote) if remote.is_auth_failure() || remote.status == 404 => {
            UploadError::PermissionDenied {
                status: remote.status,
            }
            .into()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RemoteApiError;
    use crate::testing::MockTransport;
    use crate::upload::no_progress;

    #[tokio::test]
    async fn test_stage_returns_asset_url() {
        let transport = Arc::new(MockTransport::new());
        let staging = ReleaseStaging::new(Arc::clone(&transport));
        let file = ImageFile::new("boot.img", vec![1, 2, 3]);

        let staged = staging.stage(&file, no_progress()).await.unwrap();

        assert!(staged.url.ends_with("/boot.img"));
        assert_eq!(transport.call_count("create_release"), 1);
        let draft = transport.release_drafts().remove(0);
        assert!(draft.tag_name.starts_with(STAGING_TAG_PREFIX));
        assert!(draft.prerelease);
        assert!(!draft.draft);

        staging.discard(&staged).await.unwrap();
        assert_eq!(transport.call_count("delete_release"), 1);
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_permission_hint() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_next("create_release", RemoteApiError::new(403, "Resource not accessible by integration"));
        let staging = ReleaseStaging::new(Arc::clone(&transport));

        let err = staging
            .stage(&ImageFile::new("boot.img", vec![0; 16]), no_progress())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FabricatorError::Upload(UploadError::PermissionDenied { status: 403 })
        ));
        assert!(err.to_string().contains("contents: write"));
    }

    #[tokio::test]
    async fn test_failed_asset_upload_deletes_release() {
        let transport = Arc::new(MockTransport::new());
        transport.fail_next("upload_release_asset", RemoteApiError::new(500, "Server Error"));
        let staging = ReleaseStaging::new(Arc::clone(&transport));

        let err = staging
            .stage(&ImageFile::new("boot.img", vec![0; 16]), no_progress())
            .await
            .unwrap_err();

        assert!(matches!(err, FabricatorError::Remote(_)));
        assert_eq!(transport.call_count("delete_release"), 1);
    }
}
