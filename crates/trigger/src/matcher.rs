//! Decides whether a job definition fires for a push.

use crate::changes::ChangedFiles;
use crate::definition::JobDefinition;
use crate::TriggerError;

/// Returns `true` when `definition` should run for a push to `branch`.
///
/// The branch filter is checked first and the change set is only requested
/// when the branch matches and the definition declares path filters. Errors
/// from the change-set provider are returned unchanged.
pub fn should_run(
    definition: &JobDefinition,
    branch: &str,
    changes: &ChangedFiles<'_>,
) -> Result<bool, TriggerError> {
    if !definition.branches().matches(branch) {
        return Ok(false);
    }
    if definition.paths().is_empty() {
        return Ok(true);
    }
    let changes = changes.get()?;
    Ok(definition.paths().matches(changes))
}
