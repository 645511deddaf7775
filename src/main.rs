use alert_slack::cli::CliApp;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    CliApp::run().await
}
