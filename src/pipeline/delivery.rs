use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ClipframeError, ClipframeResult};
use crate::pipeline::orchestrator::EncodedArtifact;

/// An artifact exposed to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredArtifact {
    /// Public URL: `<public prefix>/<file name>`.
    pub url: String,
    /// Artifact path on disk.
    pub path: PathBuf,
    /// File size in bytes.
    pub byte_size: u64,
}

/// Expose a finished artifact under `public_prefix`.
///
/// The file must exist, be a regular file and be non-empty; anything else is a
/// [`ClipframeError::Delivery`].
pub fn deliver(
    artifact: &EncodedArtifact,
    public_prefix: &str,
) -> ClipframeResult<DeliveredArtifact> {
    let byte_size = check_artifact(&artifact.path)?;
    let name = artifact
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ClipframeError::delivery(format!(
                "artifact path '{}' has no usable file name",
                artifact.path.display()
            ))
        })?;
    let url = public_url(public_prefix, name);
    tracing::info!(url = %url, bytes = byte_size, "artifact delivered");
    Ok(DeliveredArtifact {
        url,
        path: artifact.path.clone(),
        byte_size,
    })
}

/// Read a delivered artifact back, e.g. to stream it to a client.
pub fn read_artifact_bytes(path: &Path) -> ClipframeResult<Vec<u8>> {
    check_artifact(path)?;
    std::fs::read(path).map_err(|e| {
        ClipframeError::delivery(format!("failed to read artifact '{}': {e}", path.display()))
    })
}

/// Join prefix and file name with exactly one `/`.
pub fn public_url(public_prefix: &str, file_name: &str) -> String {
    let prefix = public_prefix.trim_end_matches('/');
    format!("{prefix}/{file_name}")
}

fn check_artifact(path: &Path) -> ClipframeResult<u64> {
    let meta = std::fs::metadata(path).map_err(|e| {
        ClipframeError::delivery(format!("artifact '{}' is missing: {e}", path.display()))
    })?;
    if !meta.is_file() {
        return Err(ClipframeError::delivery(format!(
            "artifact '{}' is not a regular file",
            path.display()
        )));
    }
    if meta.len() == 0 {
        return Err(ClipframeError::delivery(format!(
            "artifact '{}' is empty",
            path.display()
        )));
    }
    Ok(meta.len())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/delivery.rs"]
mod tests;
