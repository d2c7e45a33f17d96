use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use raconfig::Config;
use rageo::{CountryResolver, GeoLocator, NominatimClient};
use rapipeline::{
    read_input, ClaimJournal, Controller, Orchestrator, OutputStore, PipelineOptions,
    ProcessedLedger,
};
use raprobe::{IcyProber, LivenessProber, MediaProber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Configuration & logging ==========

    let config = Config::load()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("📻 RadioAtlas starting");

    let delimiter = config.output.delimiter_char();

    // ========== PHASE 2 : Stores & dedup ledger ==========

    let stations = read_input(Path::new(&config.input.path), delimiter)
        .with_context(|| format!("opening input store {}", config.input.path))?;

    let (store, completed) = OutputStore::open(Path::new(&config.output.path), delimiter)
        .with_context(|| format!("opening output store {}", config.output.path))?;

    let ledger = ProcessedLedger::new();
    ledger.seed(completed);

    let journal = if config.pipeline.strict_at_most_once {
        let path = ClaimJournal::path_for(Path::new(&config.output.path));
        let (journal, claimed) = ClaimJournal::open(&path, delimiter)
            .with_context(|| format!("opening claim journal {}", path.display()))?;
        ledger.seed(claimed);
        Some(journal)
    } else {
        None
    };

    info!(
        "📡 {} station(s) to consider, {} already in the ledger",
        stations.len(),
        ledger.len()
    );

    // ========== PHASE 3 : Probes & pipeline ==========

    // One connection pool shared by every async probe
    let client = reqwest::Client::builder()
        .user_agent(config.probe.user_agent.clone())
        .build()
        .context("building HTTP client")?;

    let geo = GeoLocator::builder()
        .client(client.clone())
        .api_base(config.geo.api_base.clone())
        .token(config.geo.token.clone())
        .timeout(config.geo.timeout())
        .build();

    let geocoder = NominatimClient::new(
        config.geocoder.api_base.clone(),
        config.geocoder.user_agent.clone(),
        config.geocoder.timeout(),
    );

    let orchestrator = Orchestrator::new(
        LivenessProber::new(client.clone(), config.probe.liveness_timeout()),
        MediaProber::new(config.probe.ffprobe_path.clone(), config.probe.media_timeout()),
        IcyProber::new(
            client,
            config.probe.user_agent.clone(),
            config.probe.liveness_timeout(),
        ),
        geo,
        CountryResolver::new(Arc::new(geocoder)),
    );

    let controller = Controller::new(
        orchestrator,
        ledger,
        store,
        journal,
        PipelineOptions {
            concurrency: config.pipeline.concurrency,
            pacing: config.pipeline.pacing(),
        },
    );

    let summary = controller.run(stations).await?;

    if summary.interrupted {
        info!("🛑 Stopped by interrupt");
    }
    info!(
        "✅ {} station(s) processed, {} skipped, results in {}",
        summary.processed, summary.skipped, config.output.path
    );

    Ok(())
}
