use clap::Parser;
use std::process::ExitCode;
use tidyplan::cli::{Cli, install_interrupt_handler, run_cli};
use tidyplan::logging;
use tidyplan::output::OutputFormatter;
use tidyplan::worker::Session;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    let _guard = match logging::init_logging(&log_file) {
        Ok(guard) => Some(guard),
        Err(e) => {
            OutputFormatter::warning(&format!("File logging disabled: {}", e));
            None
        }
    };

    let mut session = Session::new();
    install_interrupt_handler(&session);

    match run_cli(&cli, &mut session) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::FAILURE
        }
    }
}
