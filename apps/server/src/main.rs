#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::{App, HttpServer, middleware, web};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};

mod auth;
mod config;
mod database;
mod error;
mod pool;
mod routes;
mod state;

use config::Config;
use error::AppError;
use logger::{init_tracing, init_with_level};
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "webring-server", version, about = "Webring navigation and backlink monitor")]
struct Cli {
    /// Config file, created with defaults when missing
    #[arg(long, env = "WEBRING_CONFIG")]
    config: Option<PathBuf>,

    /// Keep members in memory instead of the configured database
    #[arg(long)]
    in_memory: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Default)]
enum Command {
    /// Serve the ring and run scheduled checks
    #[default]
    Serve,
    /// Run a single check pass and print its summary
    Check,
    /// Print the effective configuration
    ShowConfig,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.verbose {
        init_with_level(LevelFilter::DEBUG);
    } else {
        init_tracing();
    }

    let mut config = Config::from_config(cli.config.as_ref())?;
    config.apply_process_env()?;

    match cli.command.unwrap_or_default() {
        Command::ShowConfig => {
            println!("{config}");
            Ok(())
        }
        Command::Check => {
            let state = AppState::from_config(&config, cli.in_memory).await?;
            let summary = state.monitor.run_check().await?;
            println!("{}", serde_json::to_string_pretty(&summary).map_err(anyhow::Error::from)?);
            Ok(())
        }
        Command::Serve => run_server(config, cli.in_memory).await,
    }
}

async fn run_server(config: Config, in_memory: bool) -> Result<(), AppError> {
    if config.admin.api_token == config::DEFAULT_API_TOKEN {
        warn!("Admin API token is the default, set WEBRING_API_TOKEN");
    }
    info!("Effective configuration:\n{config}");

    let schedule = config.schedule.check_schedule()?;
    let state = web::Data::new(AppState::from_config(&config, in_memory).await?);
    let scheduler = schedule.spawn(state.monitor.clone(), config.schedule.run_on_start);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    info!("Listening on http://{addr}");

    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::routes)
    })
    .bind(addr)?
    .run()
    .await;

    scheduler.abort();
    result?;

    Ok(())
}
