use clap::Parser;
use gitpulse::app::GitPulseApp;
use gitpulse::cli::CliArgs;
use gitpulse::logging::init_logging;
use gitpulse::tui::terminal::install_panic_hook;
use tracing::{error, info};

fn main() {
    let args = CliArgs::parse();

    let log_path = init_logging();
    install_panic_hook();
    info!("Starting gitpulse, log file {:?}", log_path);

    let result = GitPulseApp::from_cli(args).and_then(GitPulseApp::run);

    if let Err(e) = result {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    info!("gitpulse shut down cleanly");
}
