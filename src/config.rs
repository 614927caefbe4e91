use crate::session::SessionConfig;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Pipeline tuning, all optional with production defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue_capacity: Option<usize>,
    pub queue_watermark: Option<usize>,
    pub stt_concurrency: Option<usize>,
    pub stt_timeout_ms: Option<u64>,
    pub stt_retries: Option<u32>,
    pub reorder_max_wait_ms: Option<u64>,
    pub summary_timeout_ms: Option<u64>,
    pub stop_grace_ms: Option<u64>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Per-session tuning with file overrides applied over the defaults.
    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::default();
        let p = &self.pipeline;

        if let Some(v) = p.queue_capacity {
            session.queue_capacity = v;
        }
        if let Some(v) = p.queue_watermark {
            session.queue_watermark = v;
        }
        if let Some(v) = p.stt_concurrency {
            session.worker.concurrency = v;
        }
        if let Some(v) = p.stt_timeout_ms {
            session.worker.stt_timeout = Duration::from_millis(v);
        }
        if let Some(v) = p.stt_retries {
            session.worker.retries = v;
        }
        if let Some(v) = p.reorder_max_wait_ms {
            session.worker.reorder_max_wait = Duration::from_millis(v);
        }
        if let Some(v) = p.summary_timeout_ms {
            session.summary_timeout = Duration::from_millis(v);
        }
        if let Some(v) = p.stop_grace_ms {
            session.stop_grace = Duration::from_millis(v);
        }
        session
    }
}
