use crate::backends::{
    FileToolSource, LanguageModel, McpClient, OllamaBackend, ToolExecutor, ToolSource,
};
use crate::catalog::{adapt_tools, build_catalog, ToolCatalog};
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::CatalogError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, Semaphore};

/// Application state shared across all request handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub source: Arc<dyn ToolSource>,
    pub model: Arc<dyn LanguageModel>,
    pub executor: Arc<dyn ToolExecutor>,
    /// Current catalog snapshot. Swapped whole on refresh; cycles already
    /// running keep the `Arc` they started with.
    catalog: RwLock<Arc<ToolCatalog>>,
    /// Serializes refreshes so a slow, older fetch never overwrites a newer one.
    refresh_lock: Mutex<()>,
    /// Bounds the number of dispatch cycles in flight.
    pub semaphore: Arc<Semaphore>,
    /// Flag indicating a catalog has been fetched at least once
    pub ready: AtomicBool,
}

impl AppState {
    /// Build the backends described by `config` and fetch the first catalog.
    ///
    /// An unreachable tool server is not fatal: the service starts not-ready
    /// and `/tools/refresh` can retry.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let mcp = Arc::new(McpClient::new(config.mcp_server_url.clone(), timeout)?);
        let source: Arc<dyn ToolSource> = match &config.tools_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Using static tools file as catalog source");
                Arc::new(FileToolSource::new(path.clone()))
            }
            None => mcp.clone(),
        };
        let model = Arc::new(OllamaBackend::new(
            &config.ollama_host,
            config.ollama_model.clone(),
            config.model_mode,
            config.model_temperature,
            timeout,
        )?);

        tracing::info!(
            mcp = %config.mcp_server_url,
            ollama = %config.ollama_host,
            model = %config.ollama_model,
            mode = ?config.model_mode,
            "Backends configured"
        );

        let state = Self::with_backends(config, source, model, mcp);

        if let Err(e) = state.refresh_catalog().await {
            tracing::warn!(error = %e, "Initial catalog fetch failed; service not ready");
        }

        Ok(state)
    }

    /// Assemble state from explicit backends. The catalog starts empty and
    /// the state not ready until [`AppState::refresh_catalog`] succeeds.
    pub fn with_backends(
        config: Config,
        source: Arc<dyn ToolSource>,
        model: Arc<dyn LanguageModel>,
        executor: Arc<dyn ToolExecutor>,
    ) -> Self {
        let permits = config.max_concurrent_dispatches.max(1);

        Self {
            config: Arc::new(config),
            source,
            model,
            executor,
            catalog: RwLock::new(Arc::new(build_catalog(Vec::new()))),
            refresh_lock: Mutex::new(()),
            semaphore: Arc::new(Semaphore::new(permits)),
            ready: AtomicBool::new(false),
        }
    }

    /// Fetch descriptors from the source and swap in a new snapshot.
    pub async fn refresh_catalog(&self) -> Result<Arc<ToolCatalog>, CatalogError> {
        let _guard = self.refresh_lock.lock().await;
        let start = std::time::Instant::now();

        let raw = self.source.list_tools().await?;
        let catalog = Arc::new(adapt_tools(&raw)?);

        *self.catalog.write().await = Arc::clone(&catalog);
        self.ready.store(true, Ordering::SeqCst);

        metrics::gauge!("catalog_tools").set(catalog.len() as f64);
        tracing::info!(
            tools = catalog.len(),
            fingerprint = %catalog.fingerprint(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tool catalog loaded"
        );

        Ok(catalog)
    }

    pub async fn catalog(&self) -> Arc<ToolCatalog> {
        Arc::clone(&*self.catalog.read().await)
    }

    /// A dispatcher bound to the current snapshot.
    pub async fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.catalog().await,
            Arc::clone(&self.model),
            Arc::clone(&self.executor),
        )
    }

    /// Check if the service is ready to handle requests.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
