//! Stage resolution: which `project.task.type` ids count as open (for
//! workload) or to-do (for the digest).

use taskdesk_core::error::ErrorCode;
use taskdesk_core::gateway::{
    self, Collection, Comparison, Domain, GatewayError, RecordGateway, SearchOptions,
};
use taskdesk_core::model::{RecordId, Stage};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("No open stages found")]
    NoOpenStages,

    #[error("Config missing todo_stage_names")]
    MissingTodoConfig,

    #[error("No matching stages found")]
    NoTodoStages,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl StageError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoOpenStages => ErrorCode::NoOpenStages,
            Self::MissingTodoConfig | Self::NoTodoStages => ErrorCode::MissingTodoStages,
            Self::Gateway(e) => e.code(),
        }
    }
}

/// Where a set of open stage ids came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSource {
    /// Matched `open_stage_names` from the config.
    Configured,
    /// Every stage whose `fold` flag is false.
    Unfolded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenStages {
    pub ids: Vec<RecordId>,
    pub source: StageSource,
}

/// Ids of stages whose name is one of `names`.
///
/// # Errors
///
/// Propagates gateway faults.
pub fn stage_ids_by_name(
    gateway: &dyn RecordGateway,
    names: &[String],
) -> Result<Vec<RecordId>, GatewayError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let stages: Vec<Stage> = gateway::search(
        gateway,
        Collection::Stage,
        &Domain::new().is_in("name", names.iter().map(String::as_str)),
        &["id", "name"],
        &SearchOptions::default(),
    )?;
    Ok(stages.into_iter().map(|s| s.id).collect())
}

/// Resolve the open stage set for one assignment attempt.
///
/// Configured names win; when they are absent or match nothing, every stage
/// not folded is used instead (an unset `fold` counts as unfolded).
///
/// # Errors
///
/// [`StageError::NoOpenStages`] when both steps come up empty.
pub fn resolve_open_stages(
    gateway: &dyn RecordGateway,
    configured: &[String],
) -> Result<OpenStages, StageError> {
    let ids = stage_ids_by_name(gateway, configured)?;
    if !ids.is_empty() {
        return Ok(OpenStages {
            ids,
            source: StageSource::Configured,
        });
    }

    debug!(
        configured = configured.len(),
        "no configured open stages matched, using unfolded stages"
    );
    let unfolded: Vec<Stage> = gateway::search(
        gateway,
        Collection::Stage,
        &Domain::new().excluding("fold", Comparison::Eq, true),
        Stage::FIELDS,
        &SearchOptions::default(),
    )?;
    if unfolded.is_empty() {
        return Err(StageError::NoOpenStages);
    }
    Ok(OpenStages {
        ids: unfolded.into_iter().map(|s| s.id).collect(),
        source: StageSource::Unfolded,
    })
}

/// Resolve the digest's to-do stages. There is no fallback here.
///
/// # Errors
///
/// [`StageError::MissingTodoConfig`] for an empty name list and
/// [`StageError::NoTodoStages`] when no stage matches.
pub fn resolve_todo_stages(
    gateway: &dyn RecordGateway,
    names: &[String],
) -> Result<Vec<RecordId>, StageError> {
    if names.is_empty() {
        return Err(StageError::MissingTodoConfig);
    }
    let ids = stage_ids_by_name(gateway, names)?;
    if ids.is_empty() {
        return Err(StageError::NoTodoStages);
    }
    Ok(ids)
}
