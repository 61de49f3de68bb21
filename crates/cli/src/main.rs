use std::process::ExitCode;

fn main() -> ExitCode {
    erabee_cli::run()
}
