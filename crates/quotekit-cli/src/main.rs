mod adjust_cmd;
#[cfg(feature = "write")]
mod bake_cmd;
mod cli;
mod detect_cmd;
mod page_range;
mod shared;
mod summary_cmd;
mod text_cmd;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "QUOTEKIT_LOG";

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Detect {
            ref source,
            ref format,
        } => detect_cmd::run(source, format),
        Commands::Adjust {
            ref source,
            ref percentage,
            ref format,
        } => adjust_cmd::run(source, percentage, format),
        Commands::Summary {
            ref source,
            ref percentage,
            ref format,
        } => summary_cmd::run(source, percentage.as_deref(), format),
        Commands::Text {
            ref file,
            ref pages,
            mode,
            ref format,
        } => text_cmd::run(file, pages.as_deref(), mode.into(), format),
        #[cfg(feature = "write")]
        Commands::Bake {
            ref source,
            ref percentage,
            ref output,
            ref symbol,
            font_size,
        } => bake_cmd::run(source, percentage, output, symbol, font_size),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
