mod cli;
mod commands;

use clap::Parser;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = match cli.command {
        Commands::Discover { window } => commands::discover::run(window),
        Commands::Play { target, url, window } => commands::play::run(&target, &url, window),
        Commands::Emulate {
            speakers,
            port,
            verify,
            advertise_ip,
        } => commands::emulate::run(&speakers, port, verify, advertise_ip),
    };

    match result {
        Ok(message) => {
            if !message.is_empty() {
                println!("{}", message);
            }
        }
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}
