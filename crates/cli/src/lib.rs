pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "erabee",
    about = "Erabee operator CLI",
    long_about = "Run skills and the daily digest by hand, clean up old posts, replay invocation events and inspect config.",
    after_help = "Examples:\n  erabee skill qiita --channel C0123\n  erabee skill lunch 新宿\n  erabee digest\n  erabee event fixtures/url_verification.json\n  erabee config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run one skill by method name and post its message to Slack")]
    Skill {
        #[arg(help = "Method name, e.g. lunch, qiita, help")]
        name: String,
        #[arg(help = "Positional arguments passed to the skill")]
        args: Vec<String>,
        #[arg(long, help = "Reply channel; defaults to slack.channel")]
        channel: Option<String>,
    },
    #[command(about = "Run the daily digest skills followed by retention cleanup")]
    Digest,
    #[command(about = "Delete the bot's messages older than digest.retention_days")]
    Cleanup,
    #[command(about = "Replay an invocation event from a JSON file and print the response")]
    Event {
        #[arg(help = "Path to a JSON invocation event")]
        file: PathBuf,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Skill { name, args, channel } => commands::skill::run(&name, args, channel),
        Command::Digest => commands::digest::run(),
        Command::Cleanup => commands::cleanup::run(),
        Command::Event { file } => commands::event::run(&file),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
