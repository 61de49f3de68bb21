use erabee_server::bootstrap::bootstrap_with_config;
use serde_json::Value;

use crate::commands::{build_runtime, init_logging, load_config, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("digest") {
        Ok(config) => config,
        Err(result) => return result,
    };
    init_logging(&config);

    let app = match bootstrap_with_config(config) {
        Ok(app) => app,
        Err(error) => return CommandResult::failure("digest", "bootstrap", error.to_string(), 3),
    };
    let runtime = match build_runtime("digest") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let report = runtime.block_on(app.handler.run_digest());
    let details = serde_json::to_value(&report).unwrap_or(Value::Null);
    let failed = report.failed_skills();

    if failed == 0 && report.cleanup_error.is_none() {
        return CommandResult::success_with_details(
            "digest",
            format!("ran {} skills, deleted {} messages", report.skills.len(), report.deleted),
            details,
        );
    }

    let mut problems = Vec::new();
    if failed > 0 {
        problems.push(format!("{failed} of {} skills failed", report.skills.len()));
    }
    if let Some(error) = &report.cleanup_error {
        problems.push(format!("cleanup failed: {error}"));
    }
    CommandResult::failure_with_details("digest", "digest_partial", problems.join("; "), details, 5)
}
