//! Exit codes for hostkeep
//!
//! Each fail-fast error kind gets its own status so wrapper scripts and
//! timers can tell them apart.

use hostkeep_common::HostkeepError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// A package or install step exited non-zero
pub const EXIT_STEP_FAILED: i32 = 3;

/// Not root and no escalation command available
pub const EXIT_NO_PRIVILEGE: i32 = 4;

/// A required tool is not installed
pub const EXIT_MISSING_TOOL: i32 = 5;

/// SIGINT ended a step before it completed
pub const EXIT_INTERRUPTED: i32 = 130;

/// Map a failed run to the process exit status
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<HostkeepError>() {
        Some(HostkeepError::NoPrivilege(_)) => EXIT_NO_PRIVILEGE,
        Some(HostkeepError::MissingTool(_)) => EXIT_MISSING_TOOL,
        Some(HostkeepError::StepFailed { code, .. }) if *code == EXIT_INTERRUPTED => {
            EXIT_INTERRUPTED
        }
        Some(HostkeepError::StepFailed { .. }) => EXIT_STEP_FAILED,
        _ => EXIT_GENERAL_ERROR,
    }
}
