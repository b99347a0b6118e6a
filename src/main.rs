use clap::Parser;
use geobrush::constants::config::SESSION_FILE;
use geobrush::session::{Session, SessionConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Replay a linked-brushing session and print the resulting view state as JSON
#[derive(Parser, Debug)]
#[command(name = "geobrush", version, about)]
struct Cli {
    /// Session file describing the dataset, views and brushing actions
    #[arg(default_value = SESSION_FILE)]
    session: PathBuf,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,

    /// Log hub and view activity at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[cfg(feature = "profile-with-puffin")]
fn start_profiler() -> Option<puffin_http::Server> {
    puffin::set_scopes_on(true);
    let addr = format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT);
    match puffin_http::Server::new(&addr) {
        Ok(server) => {
            log::info!("puffin server listening on {}", addr);
            Some(server)
        }
        Err(e) => {
            log::warn!("could not start puffin server: {}", e);
            None
        }
    }
}

fn run(cli: &Cli) -> geobrush::Result<String> {
    let config = SessionConfig::load(&cli.session)?;
    let report = Session::run(&config)?;
    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    Ok(json)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    #[cfg(feature = "profile-with-puffin")]
    let _profiler = start_profiler();

    match run(&cli) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::debug!("session failed: {:?}", e);
            eprintln!("{}: {}", e.title(), e.user_message());
            ExitCode::FAILURE
        }
    }
}
