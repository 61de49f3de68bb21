use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use erabee_server::bootstrap::bootstrap_with_config;
use erabee_slack::InboundEvent;
use serde_json::Value;

use crate::commands::{build_runtime, init_logging, load_config, CommandResult};

pub fn run(path: &Path) -> CommandResult {
    let raw = match read_event(path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure("event", "event_input", format!("{error:#}"), 4);
        }
    };

    let config = match load_config("event") {
        Ok(config) => config,
        Err(result) => return result,
    };
    init_logging(&config);

    let app = match bootstrap_with_config(config) {
        Ok(app) => app,
        Err(error) => return CommandResult::failure("event", "bootstrap", error.to_string(), 3),
    };
    let runtime = match build_runtime("event") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let response = runtime.block_on(app.handler.handle(&InboundEvent::new(raw)));
    let details = serde_json::to_value(&response).unwrap_or(Value::Null);
    CommandResult::success_with_details(
        "event",
        format!("handled event from {}", path.display()),
        details,
    )
}

fn read_event(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read event file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("event file {} is not valid JSON", path.display()))
}
