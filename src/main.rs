//! changed-go-packages - list the Go packages changed between two commits

use std::process::ExitCode;

fn main() -> ExitCode {
    changed_pkgs::cli::run()
}
