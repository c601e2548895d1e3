use std::process::ExitCode;

fn main() -> ExitCode {
    match switchboardd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("switchboardd: {error}");
            ExitCode::FAILURE
        }
    }
}
