use nbdrive::commands::{self, Cli};
use nbdrive::config::Settings;
use nbdrive::utils::logger::init_logger;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{}", err.user_message());
            return ExitCode::from(2);
        }
    };

    let log_level = if cli.verbose {
        Some("debug")
    } else {
        settings.log_level.as_deref()
    };
    if let Err(err) = init_logger(log_level, settings.log_file.clone()) {
        eprintln!("Failed to initialize logging: {}", err);
    }

    match commands::execute(cli.command, &settings).await {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!("{:?}", err);
            eprintln!("{}", err.user_message());
            ExitCode::from(1)
        }
    }
}

fn load_settings(cli: &Cli) -> nbdrive::NbResult<Settings> {
    match &cli.config {
        Some(path) => Settings::load_from(Some(path.as_path())),
        None => Settings::load(),
    }
}
