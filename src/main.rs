#![forbid(unsafe_code)]

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match patient_portal::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("portal failed to start: {e}");
            eprintln!("patient-portal: {e}");
            ExitCode::FAILURE
        }
    }
}
