use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talent_pipeline::clock::Clock;
use talent_pipeline::config::PipelineConfig;
use talent_pipeline::panels::SlotStore;
use talent_pipeline::storage::{InMemoryPanelRepository, InMemoryWorkflowRepository};
use talent_pipeline::workflows::PipelineService;

pub(crate) type Slots = SlotStore<InMemoryPanelRepository>;
pub(crate) type Pipeline = PipelineService<InMemoryWorkflowRepository, InMemoryPanelRepository>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Slot store and pipeline service sharing one clock over process-local storage.
pub(crate) fn in_memory_services(
    clock: Arc<dyn Clock>,
    config: PipelineConfig,
) -> (Arc<Slots>, Arc<Pipeline>) {
    let slots = Arc::new(
        SlotStore::new(Arc::new(InMemoryPanelRepository::default()), clock.clone())
            .with_expansion_limit(config.max_expansion_days),
    );
    let pipeline = Arc::new(PipelineService::new(
        Arc::new(InMemoryWorkflowRepository::default()),
        slots.clone(),
        clock,
        config,
    ));
    (slots, pipeline)
}
