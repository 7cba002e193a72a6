use clap::Parser;
use distmq_journal::broker::{BrokerStateMachine, Server};
use distmq_journal::config::{BrokerConfig, DEFAULT_MAX_SEGMENT_SIZE};
use std::path::PathBuf;
use std::sync::Arc;

/// Single-node distmq broker serving append/pull over TCP.
#[derive(Parser, Debug)]
#[command(name = "distmq-broker", version, about, long_about = None)]
struct Args {
    /// Directory holding the queue logs
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Size in bytes after which a segment is sealed
    #[arg(long, default_value_t = DEFAULT_MAX_SEGMENT_SIZE)]
    max_segment_size: u64,

    /// Fsync every append before acknowledging it
    #[arg(long)]
    sync_on_append: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Using data directory: {:?}", args.data_dir);

    let config = BrokerConfig::new(&args.data_dir)
        .max_segment_size(args.max_segment_size)
        .sync_on_append(args.sync_on_append);
    let broker = Arc::new(BrokerStateMachine::open(config)?);

    let server = Server::new(&args.listen, broker).await?;
    log::info!("Starting server on {}...", args.listen);
    server.run().await?;

    Ok(())
}
