//! Artifacts produced by a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ArtifactId;

/// A named binary bundle produced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact identifier.
    pub id: ArtifactId,
    /// Artifact name as uploaded by the workflow.
    pub name: String,
    /// Size of the archive in bytes.
    pub size_in_bytes: u64,
    /// API URL of the zip archive.
    pub archive_download_url: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// File name to save the downloaded archive under.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        if self.name.ends_with(".zip") {
            self.name.clone()
        } else {
            format!("{}.zip", self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_file_name() {
        let artifact: Artifact = serde_json::from_str(
            r#"{
                "id": 11,
                "name": "patched-boot",
                "size_in_bytes": 33554432,
                "archive_download_url": "https://api.github.com/repos/o/r/actions/artifacts/11/zip",
                "created_at": "2024-05-01T10:05:00Z",
                "expired": false
            }"#,
        )
        .unwrap();
        assert_eq!(artifact.archive_file_name(), "patched-boot.zip");

        let zipped = Artifact {
            name: "already.zip".into(),
            ..artifact
        };
        assert_eq!(zipped.archive_file_name(), "already.zip");
    }
}
