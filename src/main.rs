use anyhow::Result;
use clap::Parser;
use rmcp::ServiceExt;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agri_form::client::ServiceClient;
use agri_form::config::Args;
use agri_form::driver::{spawn_form, Services};
use agri_form::service::AgriForm;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agri_form=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    tracing::info!(
        "Starting agri form server against {} ({:?}, {:?})",
        args.base_url,
        args.variant,
        args.trigger
    );

    let client = Arc::new(ServiceClient::new(&args.base_url)?);
    let form = spawn_form(
        args.profile(),
        Services {
            weather: client.clone(),
            prediction: client,
            timeout: args.timeout(),
        },
    );

    let server = AgriForm::new(form).serve(rmcp::transport::stdio()).await?;
    server.waiting().await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
