/*
 * Responsibility
 * - tokio runtime boot
 * - delegate to app::run() (no logic here)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    crimestat_gateway::app::run().await
}
