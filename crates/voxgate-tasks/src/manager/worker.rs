//! Execution of one claimed task.
//!
//! The worker only produces an outcome. Recording it in the table is the
//! registry's job, so a stale worker can never overwrite newer state.

use voxgate_core::GenerationError;
use voxgate_driver::GenerationDriver;

use super::paths::ResultFiles;
use crate::table::{Claim, JobOutcome};

/// Generate the claimed task's audio and store it as a result file.
pub async fn run_job(driver: &GenerationDriver, results: &ResultFiles, claim: &Claim) -> JobOutcome {
    let audio = match driver.generate_encoded(&claim.parameters, &claim.cancel).await {
        Ok(audio) => audio,
        Err(GenerationError::Cancelled) => return JobOutcome::Cancelled,
        // An engine error after the cancel signal is reported as the cancel.
        Err(_) if claim.cancel.is_cancelled() => return JobOutcome::Cancelled,
        Err(e) => return JobOutcome::Failed(e.to_string()),
    };

    if claim.cancel.is_cancelled() {
        return JobOutcome::Cancelled;
    }

    match results.write(claim.parameters.format, &audio.bytes).await {
        Ok(path) => JobOutcome::Completed(path),
        Err(e) => JobOutcome::Failed(format!("Failed to store result: {e}")),
    }
}
