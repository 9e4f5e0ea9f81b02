use std::process::ExitCode;

fn main() -> ExitCode {
    clearance_lib::run()
}
