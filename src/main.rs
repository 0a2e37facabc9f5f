//! wxfav - Keep favorite weather locations
//!
//! A command-line application that saves favorite locations on the device
//! and shows current weather and forecasts for them.

use std::io;
use std::process::ExitCode;

use clap::Parser;

use wxfav::app::App;
use wxfav::cli::{AppConfig, Cli};
use wxfav::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli);
    logging::init_logging(config.verbose);

    let app = App::new(config);

    let mut stdout = io::stdout();
    match app.run(cli.command, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
