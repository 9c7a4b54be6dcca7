//! release_cutter - cut a release of the package in the current repository.

use anyhow::Context;
use release_cutter::cli;
use release_cutter::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await.context("release failed") {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Never quiet for fatal errors
            let output = OutputManager::new(false, false);
            let release_error = e.downcast_ref::<release_cutter::ReleaseError>();

            // The domain error already renders its inner error
            match release_error {
                Some(release_error) => output.error(&format!("{}: {}", e, release_error)),
                None => output.error(&format!("{:#}", e)),
            }

            if let Some(release_error) = release_error {
                let suggestions = release_error.recovery_suggestions();
                if !suggestions.is_empty() {
                    output.println("\n💡 Recovery suggestions:");
                    for suggestion in suggestions {
                        output.indent(&suggestion);
                    }
                }
            }

            process::exit(1);
        }
    }
}
