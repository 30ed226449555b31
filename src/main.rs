use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::filter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use proofed_lib::cli::{self, Command};
use proofed_lib::config::{Config, FlatConfig};

#[derive(Parser, Debug)]
#[command(name = "proofed", version, about = "Media review projects with pinned comments")]
struct Cli {
    #[command(flatten)]
    config: FlatConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tracing_layer = tracing_subscriber::fmt::layer();
    let filter = filter::Targets::new()
        .with_target("tower_http::trace::on_response", Level::DEBUG)
        .with_target("tower_http::trace::make_span", Level::DEBUG)
        .with_target("sqlx::query", Level::WARN)
        .with_default(Level::INFO);
    tracing_subscriber::registry()
        .with(tracing_layer)
        .with(filter)
        .init();

    let args = Cli::parse();
    let config: Config = args.config.into();
    debug!("{:?}", &config);

    cli::run(args.command.unwrap_or(Command::Serve), config).await
}
