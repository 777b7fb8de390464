//! Export coordinator - main orchestrator for the export process
//!
//! This module coordinates the entire export workflow: it opens the tunnel and
//! the database session, estimates the result size, plans the batch windows,
//! runs the pipeline, and releases the session and tunnel on every exit path.

use crate::adapters::database::DocumentStore;
use crate::adapters::mongo::MongoSession;
use crate::adapters::sink::{create_sink, Sink};
use crate::adapters::tunnel::{open_tunnel, Tunnel};
use crate::config::{ConnectionTarget, ExportConfig};
use crate::core::export::batch::plan_batches;
use crate::core::export::estimator::CountEstimator;
use crate::core::export::pipeline::ExportPipeline;
use crate::core::export::summary::ExportSummary;
use crate::domain::{ExporterError, Result};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::Instrument;

/// Resources acquired for one run
///
/// Owns the database session and, when tunneling, the tunnel. [`teardown`]
/// consumes the context, so each resource is released at most once.
///
/// [`teardown`]: RunContext::teardown
pub struct RunContext {
    store: Arc<dyn DocumentStore>,
    tunnel: Option<Box<dyn Tunnel>>,
}

impl RunContext {
    /// Create a new run context
    pub fn new(store: Arc<dyn DocumentStore>, tunnel: Option<Box<dyn Tunnel>>) -> Self {
        Self { store, tunnel }
    }

    /// Shared handle to the database session
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Whether the connection goes through a tunnel
    pub fn is_tunneled(&self) -> bool {
        self.tunnel.is_some()
    }

    /// Close the session, then the tunnel if one was opened
    ///
    /// The tunnel is closed even when closing the session fails.
    ///
    /// # Errors
    ///
    /// Returns the session close error if there was one, otherwise the tunnel
    /// close error.
    pub async fn teardown(self) -> Result<()> {
        tracing::debug!("Tearing down database session and tunnel");

        let session_closed = self.store.close().await;
        if let Err(e) = &session_closed {
            tracing::error!(error = %e, "Failed to close database session");
        }

        let tunnel_closed = match self.tunnel {
            Some(tunnel) => tunnel.close().await.map_err(ExporterError::from),
            None => Ok(()),
        };
        if let Err(e) = &tunnel_closed {
            tracing::error!(error = %e, "Failed to close tunnel");
        }

        session_closed.and(tunnel_closed)
    }
}

/// Export coordinator
pub struct ExportCoordinator {
    config: ExportConfig,
    context: RunContext,
    sink: Arc<dyn Sink>,
    shutdown: watch::Receiver<bool>,
}

impl ExportCoordinator {
    /// Acquire every resource a run needs
    ///
    /// This:
    /// 1. Opens the sink
    /// 2. Opens the proxy tunnel and points the connection string at it (if `useTunnel`)
    /// 3. Opens the database session
    ///
    /// If the session cannot be opened, an already opened tunnel is closed
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ExporterError::Configuration`] for an unusable connection
    /// target or proxy setting, [`ExporterError::Tunnel`] if the tunnel cannot
    /// be opened and [`ExporterError::Connection`] if the database cannot be reached.
    pub async fn connect(config: ExportConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let sink = create_sink(&config.sink).await?;

        let tunnel = if config.use_tunnel {
            let target = ConnectionTarget::parse(config.mongo_url.expose_secret().as_str())
                .map_err(ExporterError::Configuration)?;
            let destination = target
                .tunnel_destination()
                .map_err(ExporterError::Configuration)?;
            let proxy_url = config
                .proxy
                .resolve()
                .map_err(ExporterError::Configuration)?;

            tracing::info!(destination = %destination, "Creating tunnel for connection to MongoDB");
            let tunnel = open_tunnel(&proxy_url, &destination).await?;
            Some((target, tunnel))
        } else {
            None
        };

        let opened = match &tunnel {
            Some((target, tunnel)) => {
                let tunneled = target.with_host(&tunnel.local_addr().to_string());
                MongoSession::open(&tunneled, config.db_name.as_deref(), &config.collection_name)
                    .await
            }
            None => {
                MongoSession::open(
                    config.mongo_url.expose_secret().as_str(),
                    config.db_name.as_deref(),
                    &config.collection_name,
                )
                .await
            }
        };
        let tunnel = tunnel.map(|(_, tunnel)| tunnel);

        let session = match opened {
            Ok(session) => session,
            Err(e) => {
                if let Some(tunnel) = tunnel {
                    if let Err(close_err) = tunnel.close().await {
                        tracing::warn!(error = %close_err, "Failed to close tunnel after connection error");
                    }
                }
                return Err(e);
            }
        };

        let context = RunContext::new(Arc::new(session), tunnel);
        Ok(Self::from_parts(config, context, sink, shutdown))
    }

    /// Build a coordinator from already acquired resources
    pub fn from_parts(
        config: ExportConfig,
        context: RunContext,
        sink: Arc<dyn Sink>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            context,
            sink,
            shutdown,
        }
    }

    /// Execute the export
    ///
    /// This is the main entry point for the export process. It:
    /// 1. Estimates the number of matching documents
    /// 2. Plans the batch windows
    /// 3. Runs the export pipeline
    /// 4. Tears down the session and tunnel, whatever the outcome of 1-3
    ///
    /// # Errors
    ///
    /// Returns the first error of steps 1-3. If those succeed, a teardown
    /// failure is returned instead.
    pub async fn execute(self) -> Result<ExportSummary> {
        let Self {
            config,
            context,
            sink,
            shutdown,
        } = self;

        let start_time = Instant::now();
        let mut summary = ExportSummary::new(config.collection_name.clone(), sink.describe());
        let span = tracing::info_span!("export", run_id = %summary.run_id);

        async move {
            tracing::info!(
                collection = %config.collection_name,
                sink = %summary.sink,
                tunneled = context.is_tunneled(),
                "Starting export process"
            );

            let outcome = run_export(&config, context.store(), sink, shutdown, &mut summary).await;
            let torn_down = context.teardown().await;

            outcome?;
            torn_down?;

            let summary = summary.with_duration(start_time.elapsed());
            summary.log_summary();
            Ok::<_, ExporterError>(summary)
        }
        .instrument(span)
        .await
    }
}

async fn run_export(
    config: &ExportConfig,
    store: Arc<dyn DocumentStore>,
    sink: Arc<dyn Sink>,
    shutdown: watch::Receiver<bool>,
    summary: &mut ExportSummary,
) -> Result<()> {
    let estimator = CountEstimator::new(config.estimated_items_count, config.count_timeout());
    let total_count = estimator.estimate(store.as_ref(), &config.query).await?;
    summary.total_count = total_count;

    tracing::info!(total_count, "Exporting {total_count} documents");

    let windows = plan_batches(total_count, config.batch_size);
    summary.windows_planned = windows.window_count();

    let pipeline = ExportPipeline::new(
        store,
        sink,
        config.query.clone(),
        config.projection().cloned(),
        config.concurrency,
        shutdown,
    );
    let report = pipeline.run(windows).await?;
    summary.record_pipeline(&report);

    Ok(())
}
