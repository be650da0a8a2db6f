//! The `quadratum` management utility.

use quadratum_cli::command::{load_settings, CommandRegistry};
use quadratum_cli::commands::register_builtin_commands;
use quadratum_core::logging::setup_logging;
use quadratum_core::SETTINGS;

#[tokio::main]
async fn main() {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);

    let matches = registry.build_cli().get_matches();

    let settings = match load_settings(&matches) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(err.exit_code());
        }
    };
    SETTINGS.configure(settings);
    let settings = SETTINGS.get();
    setup_logging(settings);

    if let Err(err) = registry.execute(&matches, settings).await {
        tracing::error!(error = %err, "command failed");
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}
