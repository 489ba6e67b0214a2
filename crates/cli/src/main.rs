use std::process::ExitCode;

fn main() -> ExitCode {
    planshift_cli::run()
}
