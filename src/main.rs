//! viral-templates - template repository and adaptation engine CLI

use viral_templates::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::parse();

    // WARN by default; -v or RUST_LOG=info for progress
    let level = if args.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(level.into())
        )
        .with_writer(std::io::stderr)
        .init();

    cli::run(args).await
}
