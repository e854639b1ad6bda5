use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries JSON results, so keep logging quiet unless RUST_LOG says otherwise
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    crm_client::cli::run().await
}
