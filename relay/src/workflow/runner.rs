use crate::workflow::config::RelayConfig;
use anchorcore::broadcast::{ClientRegistry, ConnectionId, DisplayConnection, PublishSummary};
use anchorcore::diagnostics::{LogManager, MetricsRecorder};
use anchorcore::prelude::RelayResult;
use anchorcore::processing::{EstimateOutcome, PositionEstimator};
use anchorcore::wire::TelemetryPayload;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Unit of work for the single consumer. Each event runs to completion
/// before the next is taken.
pub enum RelayEvent<C> {
    Telemetry(TelemetryPayload),
    Register { connection: C, role: String },
    Deregister(ConnectionId),
}

/// Owns the smoothing state and the display registry.
pub struct Pipeline<C> {
    estimator: PositionEstimator,
    registry: ClientRegistry<C>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl<C: DisplayConnection> Pipeline<C> {
    pub fn new(config: &RelayConfig, metrics: Arc<MetricsRecorder>) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            estimator: PositionEstimator::new(config.to_estimator_config())?,
            registry: ClientRegistry::new(config.display_role.clone()),
            metrics,
            logger: LogManager::new("pipeline"),
        })
    }

    /// Parses, estimates, and fans out one telemetry message.
    ///
    /// Malformed payloads are counted and returned as errors; the smoothing
    /// windows are left untouched in that case.
    pub fn ingest(
        &mut self,
        payload: TelemetryPayload,
    ) -> RelayResult<(EstimateOutcome, PublishSummary)> {
        let reading = match payload.into_reading() {
            Ok(reading) => reading,
            Err(err) => {
                self.metrics.record_dropped();
                self.logger.warn(&format!("dropping telemetry: {}", err));
                return Err(err);
            }
        };

        let outcome = self.estimator.estimate(reading);
        self.metrics.record_processed(outcome.branch);

        let summary = self.registry.publish(&outcome.estimate);
        self.metrics.record_publish(&summary);
        self.logger.detail(&format!(
            "position ({}, {}) -> delivered {} skipped {} failed {}",
            outcome.estimate.x,
            outcome.estimate.y,
            summary.delivered,
            summary.skipped,
            summary.failed
        ));
        Ok((outcome, summary))
    }

    pub fn handle(&mut self, event: RelayEvent<C>) {
        match event {
            RelayEvent::Telemetry(payload) => {
                // Already logged and counted; the next message proceeds regardless.
                let _ = self.ingest(payload);
            }
            RelayEvent::Register { connection, role } => {
                self.registry.register(connection, &role);
            }
            RelayEvent::Deregister(id) => {
                self.registry.deregister(id);
            }
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &ClientRegistry<C> {
        &self.registry
    }

    #[cfg(test)]
    pub fn estimator(&self) -> &PositionEstimator {
        &self.estimator
    }
}

/// Drains `events` into `pipeline` until every sender is dropped.
pub async fn run_event_loop<C: DisplayConnection>(
    mut events: mpsc::UnboundedReceiver<RelayEvent<C>>,
    mut pipeline: Pipeline<C>,
) -> Pipeline<C> {
    while let Some(event) = events.recv().await {
        pipeline.handle(event);
    }
    pipeline.logger.record("event queue closed");
    pipeline
}
