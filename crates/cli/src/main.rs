use std::process::ExitCode;

fn main() -> ExitCode {
    curabot_cli::run()
}
