use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::Arc;

use crate::core::AppConfig;
use crate::invoicer::Invoicer;

#[derive(Clone)]
pub struct ApiState {
    pub invoicer: Arc<Invoicer>,
    pub metrics: Arc<RenderMetrics>,
}

impl ApiState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let invoicer = Arc::new(Invoicer::new(&config));
        let metrics = Arc::new(RenderMetrics::new()?);

        tracing::info!(
            html = ?config.templates.html_dir,
            pdf = ?config.templates.pdf_dir,
            docx = ?config.templates.docx_dir,
            output = ?config.output_dir,
            "Template roots configured"
        );

        Ok(ApiState { invoicer, metrics })
    }
}

/// Render counters, registered in a registry owned by the state.
pub struct RenderMetrics {
    pub registry: Registry,
    pub renders: IntCounterVec,
}

impl RenderMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let renders = IntCounterVec::new(
            Opts::new("invoice_renders_total", "Invoices rendered, by format and delivery mode"),
            &["format", "mode"],
        )?;
        registry.register(Box::new(renders.clone()))?;
        Ok(RenderMetrics { registry, renders })
    }
}
