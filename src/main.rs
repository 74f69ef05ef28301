use log::{error, info, warn};
use randochrontendo::api;
use randochrontendo::core::config::Config;
use std::process::ExitCode;

fn main() -> ExitCode {
    let log_file = Config::log_file_from_env();
    if let Err(e) = randochrontendo::init_logging(&log_file) {
        eprintln!("logging setup failed for {}: {}", log_file.display(), e);
        return ExitCode::FAILURE;
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match api::run(&config) {
        Ok(report) => {
            if report.all_succeeded() {
                info!("🎉 Posted to all {} platforms", report.outcomes.len());
            } else {
                warn!(
                    "Posted to {}/{} platforms",
                    report.succeeded().len(),
                    report.outcomes.len()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ {}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
