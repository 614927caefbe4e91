use anyhow::Result;
use clap::Parser;
use session_intel::risk::{EscalationPolicy, LogNotifier};
use session_intel::{
    create_router, AppState, Config, IngestCapture, KeywordRiskClassifier, OutlineSummarize,
    PlainTextStt, RiskEscalationChannel, SessionDeps,
};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "session-intel", about = "Real-time session intelligence service")]
struct Args {
    /// Configuration file, without extension
    #[arg(long, default_value = "config/session-intel")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Session Intel v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    // Built-in integrations: audio over the ingest API, loopback
    // transcription, keyword classification, extractive summaries, and
    // log-based escalation. Real deployments swap these at the trait seams.
    let deps = SessionDeps {
        capture: Arc::new(IngestCapture::new()),
        stt: Arc::new(PlainTextStt),
        risk: Arc::new(KeywordRiskClassifier::new()),
        summarize: Arc::new(OutlineSummarize::new()),
        escalation: Arc::new(RiskEscalationChannel::new(
            Arc::new(LogNotifier),
            Arc::new(LogNotifier),
            EscalationPolicy::default(),
        )),
    };

    let state = AppState::new(cfg.session_config(), deps);
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
