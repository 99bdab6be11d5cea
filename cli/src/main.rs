mod commands;
mod terminal;

use std::process::ExitCode;

use tracing::error;

use commands::{CommandLine, Commands, Config, OutputFormat, discover, interfaces};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> ExitCode {
    let commands = CommandLine::parse_args();

    if let Err(e) = logging::init(commands.verbose, commands.quiet) {
        eprintln!("failed to set up logging: {e:#}");
        return ExitCode::FAILURE;
    }

    let result = match commands.command {
        Commands::Discover(args) => {
            let cfg = Config {
                quiet: commands.quiet,
                output: args.output,
            };
            if cfg.output == OutputFormat::Text {
                print::banner(cfg.quiet);
            }
            discover::discover(args, &cfg).await
        }
        Commands::Interfaces => {
            let cfg = Config {
                quiet: commands.quiet,
                output: OutputFormat::Text,
            };
            print::banner(cfg.quiet);
            interfaces::interfaces(&cfg)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
