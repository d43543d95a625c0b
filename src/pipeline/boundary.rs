//! Request/response contract for the web-facing layer.
//!
//! Transport (HTTP, multipart upload, storage) lives outside this crate. This module only decides
//! whether a request may enter the pipeline and shapes the result into a caller-facing response.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::assets::locator::SourceLocator;
use crate::composition::label::OverlayLabel;
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{ClipframeError, ClipframeResult, ErrorKind};
use crate::pipeline::delivery::deliver;
use crate::pipeline::job::JobInputs;
use crate::pipeline::orchestrator::Pipeline;

/// The only accepted upload content type.
pub const MP4_CONTENT_TYPE: &str = "video/mp4";

/// What to do with an accepted request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Render and encode server-side, answer with the finished artifact.
    #[default]
    Render,
    /// Skip rendering; answer with the source clip so a client can draw the overlays itself.
    PreviewOnly,
}

/// Incoming generate request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateRequest {
    /// Clip locator (path or URL).
    pub video: String,
    /// Declared upload content type, when the transport knows it.
    pub content_type: Option<String>,
    /// Local copy of the clip used for probing.
    pub local_path: Option<PathBuf>,
    /// Free-text label.
    pub label: String,
    /// Render or preview.
    pub mode: DeliveryMode,
}

/// A request that passed validation.
#[derive(Clone, Debug)]
pub struct ValidatedRequest {
    /// Parsed clip locator.
    pub video: SourceLocator,
    /// Validated label.
    pub label: OverlayLabel,
    /// Local copy for probing.
    pub local_path: Option<PathBuf>,
    /// Requested mode.
    pub mode: DeliveryMode,
}

impl ValidatedRequest {
    /// Pipeline inputs for this request.
    pub fn into_job_inputs(self) -> JobInputs {
        JobInputs {
            video: Some(self.video),
            probe_path: self.local_path,
            label: self.label,
        }
    }
}

impl GenerateRequest {
    /// Reject requests that must never reach the pipeline.
    pub fn validate(&self) -> ClipframeResult<ValidatedRequest> {
        let Some(video) = SourceLocator::parse(&self.video) else {
            return Err(ClipframeError::validation("Missing video or label"));
        };
        if self.label.trim().is_empty() {
            return Err(ClipframeError::validation("Missing video or label"));
        }
        match self.content_type.as_deref().map(str::trim) {
            Some(ct) if !is_mp4_content_type(ct) => {
                return Err(ClipframeError::validation(
                    "Invalid file type. Only MP4 is allowed.",
                ));
            }
            Some(_) => {}
            None if !video.has_mp4_extension() => {
                return Err(ClipframeError::validation(
                    "Invalid file type. Only MP4 is allowed.",
                ));
            }
            None => {}
        }
        let label = OverlayLabel::parse(&self.label)?;
        Ok(ValidatedRequest {
            video,
            label,
            local_path: self.local_path.clone(),
            mode: self.mode,
        })
    }
}

/// `video/mp4`, ignoring case and any `;` parameters.
fn is_mp4_content_type(ct: &str) -> bool {
    ct.split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(MP4_CONTENT_TYPE))
}

/// Caller-facing result. Never carries internal stage detail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// Artifact URL (render) or source locator (preview).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Label as it is drawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Human-readable outcome.
    pub message: String,
    /// Failure class, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Frame count of the rendered artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in_frames: Option<u64>,
}

impl GenerateResponse {
    /// Failure response for `err`.
    pub fn failure(err: &ClipframeError) -> Self {
        Self {
            success: false,
            video_url: None,
            label: None,
            message: err.user_message(),
            error_kind: Some(err.kind()),
            duration_in_frames: None,
        }
    }

    /// Status code a transport should answer with.
    pub fn http_status(&self) -> u16 {
        match self.error_kind {
            None => 200,
            Some(ErrorKind::BadInput) => 400,
            Some(ErrorKind::RenderFailed | ErrorKind::DeliveryFailed) => 500,
        }
    }
}

/// Validate, render (unless previewing) and deliver one request.
///
/// Never panics on bad input and never returns an error: every failure is folded into the
/// response, with the detail logged.
#[tracing::instrument(skip_all, fields(mode = ?req.mode))]
pub fn handle_generate(
    pipeline: &Pipeline,
    req: &GenerateRequest,
    cancel: &CancelToken,
) -> GenerateResponse {
    match generate(pipeline, req, cancel) {
        Ok(resp) => resp,
        Err(e) => {
            match e.kind() {
                ErrorKind::BadInput => tracing::info!(error = %e, "request rejected"),
                _ => tracing::error!(error = %e, kind = ?e.kind(), "generate failed"),
            }
            GenerateResponse::failure(&e)
        }
    }
}

fn generate(
    pipeline: &Pipeline,
    req: &GenerateRequest,
    cancel: &CancelToken,
) -> ClipframeResult<GenerateResponse> {
    let valid = req.validate()?;
    if valid.mode == DeliveryMode::PreviewOnly {
        return Ok(GenerateResponse {
            success: true,
            video_url: Some(valid.video.to_string()),
            label: Some(valid.label.display().to_string()),
            message: "Video uploaded successfully. Ready for preview.".to_string(),
            error_kind: None,
            duration_in_frames: None,
        });
    }

    let label = valid.label.display().to_string();
    let artifact = pipeline.run(valid.into_job_inputs(), cancel)?;
    let delivered = deliver(&artifact, &pipeline.config().public_prefix)?;
    Ok(GenerateResponse {
        success: true,
        video_url: Some(delivered.url),
        label: Some(label),
        message: "Video generated successfully".to_string(),
        error_kind: None,
        duration_in_frames: Some(artifact.duration_in_frames),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/boundary.rs"]
mod tests;
