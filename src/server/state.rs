use crate::config::AppConfig;
use crate::document::Document;
use crate::gateway::ModelGateway;
use crate::jobs::JobRegistry;
use crate::pipeline::{PipelineOptions, PipelineOrchestrator};
use crate::store::ContentStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn ModelGateway>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub jobs: JobRegistry,
    pub document: Document,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(config: &AppConfig, gateway: Arc<dyn ModelGateway>) -> Self {
        let store = ContentStore::new(config.slide_table_path.clone());
        let orchestrator = PipelineOrchestrator::new(
            Arc::clone(&gateway),
            store,
            PipelineOptions::from_config(config),
        );
        Self {
            gateway,
            orchestrator: Arc::new(orchestrator),
            jobs: JobRegistry::new(),
            document: Document::new(config.document.clone()),
            static_dir: config.static_dir.clone(),
        }
    }

    pub fn store(&self) -> &ContentStore {
        self.orchestrator.store()
    }
}
