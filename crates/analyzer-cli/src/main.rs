use analysis_orchestrator::AnalysisOrchestrator;
use anyhow::{bail, Result};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting QualityLens analyzer");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let orchestrator = AnalysisOrchestrator::yahoo();

    match args.as_slice() {
        [command, ticker] if command == "analyze" => {
            let analysis = orchestrator.analyze(&ticker.to_uppercase()).await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        [command, query] if command == "search" => {
            let hits = orchestrator.search(query).await?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        // Bare ticker is shorthand for analyze.
        [ticker] if !ticker.is_empty() => {
            let analysis = orchestrator.analyze(&ticker.to_uppercase()).await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        _ => {
            bail!("usage: analyzer [analyze] TICKER | analyzer search QUERY");
        }
    }

    Ok(())
}
