use clap::Parser;
use node_status::monitor::{self, connection_hint, Monitor, Options};
use node_status::{BlockRate, ClientBuilder, ErrorKind, DEFAULT_ADDRESS};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "node-status",
    about = "Watch the stats of a local Redbelly node",
    version
)]
struct Cli {
    /// Address of the Redbelly node's status server
    #[arg(short, long, env = "NODE_STATUS_ADDRESS", default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Minimum signing address balance in RBNT before warning
    #[arg(short, long, visible_alias = "minBalance", default_value_t = 10)]
    min_balance: u64,

    /// Frequency to refresh values, in seconds
    #[arg(
        short,
        long,
        visible_alias = "refreshSeconds",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    refresh_seconds: u64,

    /// Keep at most this many block samples for the blocks per second figure
    #[arg(long)]
    max_samples: Option<usize>,

    /// Render a single dashboard and exit
    #[arg(long)]
    once: bool,

    /// Do not clear the terminal between refreshes
    #[arg(long)]
    no_clear: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("node_status=warn")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("Monitoring {}", cli.address);

    let client = ClientBuilder::new().build(&cli.address)?;
    let monitor = Monitor::new(client, cli.min_balance);
    let mut monitor = match cli.max_samples {
        Some(max) => monitor.with_block_rate(BlockRate::bounded(max)),
        None => monitor,
    };

    let options = Options {
        refresh: Duration::from_secs(cli.refresh_seconds),
        clear_screen: !cli.no_clear,
        once: cli.once,
    };

    let mut stdout = std::io::stdout();
    if let Err(e) = monitor::run(&mut monitor, options, &mut stdout, tokio::signal::ctrl_c()).await {
        if e.kind() == ErrorKind::Unexpected {
            println!("\n{}", connection_hint(&cli.address));
            println!("{}", e);
        }
        tracing::error!("exiting: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
