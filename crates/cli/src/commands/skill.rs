use erabee_core::{Invocation, ReplyTarget};
use erabee_server::bootstrap::bootstrap_with_config;
use erabee_slack::RouteOutcome;

use crate::commands::{build_runtime, init_logging, load_config, CommandResult};

pub fn run(name: &str, args: Vec<String>, channel: Option<String>) -> CommandResult {
    let config = match load_config("skill") {
        Ok(config) => config,
        Err(result) => return result,
    };
    init_logging(&config);

    let app = match bootstrap_with_config(config) {
        Ok(app) => app,
        Err(error) => return CommandResult::failure("skill", "bootstrap", error.to_string(), 3),
    };

    if !app.handler.knows(name) {
        return CommandResult::failure(
            "skill",
            "unknown_skill",
            format!("no skill named `{name}`; try `erabee skill help`"),
            4,
        );
    }

    let runtime = match build_runtime("skill") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let reply = channel.map(ReplyTarget::channel).unwrap_or_default();
    let invocation = Invocation::new(name, args, reply);
    match runtime.block_on(app.handler.invoke(&invocation)) {
        Ok(RouteOutcome::Dispatched) => CommandResult::success("skill", format!("ran {name}")),
        Ok(RouteOutcome::Ignored) => CommandResult::failure(
            "skill",
            "unknown_skill",
            format!("no skill named `{name}`"),
            4,
        ),
        Err(error) => CommandResult::failure("skill", error.error_class(), error.to_string(), 5),
    }
}
