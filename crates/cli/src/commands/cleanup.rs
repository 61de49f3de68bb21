use erabee_server::bootstrap::bootstrap_with_config;
use serde_json::json;

use crate::commands::{build_runtime, init_logging, load_config, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("cleanup") {
        Ok(config) => config,
        Err(result) => return result,
    };
    init_logging(&config);

    if config.slack.user_token.is_none() {
        return CommandResult::failure(
            "cleanup",
            "config_validation",
            "cleanup searches with slack.user_token; set ERABEE_SLACK_USER_TOKEN",
            2,
        );
    }

    let retention_days = config.digest.retention_days;
    let app = match bootstrap_with_config(config) {
        Ok(app) => app,
        Err(error) => return CommandResult::failure("cleanup", "bootstrap", error.to_string(), 3),
    };
    let runtime = match build_runtime("cleanup") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    match runtime.block_on(app.handler.run_cleanup()) {
        Ok(report) => CommandResult::success_with_details(
            "cleanup",
            format!(
                "deleted {} of {} matched messages older than {retention_days} days",
                report.deleted, report.matched
            ),
            json!({
                "matched": report.matched,
                "deleted": report.deleted,
                "failed": report.failed,
            }),
        ),
        Err(error) => CommandResult::failure("cleanup", "slack_api", error.to_string(), 4),
    }
}
