use followers_maze::config::Config;
use tracing::info;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "followers-maze starting");

    let config = Config::parse_args();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.max_procs.max(1))
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("FATAL: failed to start tokio runtime: {e}");
            std::process::exit(1);
        });

    runtime.block_on(async {
        if let Err(e) = followers_maze::run(config).await {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    });
}
