use clap::Parser;
use overlay_trigger::{read_clipboard, TriggerArgs, TriggerRequest};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = TriggerArgs::parse();
    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut request = TriggerRequest::from_args(&args)?;
    if args.clipboard {
        if let Some(text) = read_clipboard() {
            request.add_clipboard(text);
        }
    }

    let response = request.send(&reqwest::Client::new()).await?;
    println!("{}", response.status.as_u16());
    println!("{}", response.preview());

    if !response.status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
