use std::process::ExitCode;

fn main() -> ExitCode {
    scudo_cli::run()
}
