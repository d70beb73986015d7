use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match uploadforge::server::start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("uploadforge failed: {}", err);
            eprintln!("uploadforge failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
