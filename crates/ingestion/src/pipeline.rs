//! Per-cycle ingestion orchestrator.
//!
//! One call to [`IngestionPipeline::run`] walks a full cycle:
//! discovery, archive download, extraction, then parse and normalize every
//! bulletin file. Fatal errors end the cycle with [`CycleOutcome::Failed`];
//! a bad file only costs that file.

use std::sync::Arc;

use cap_parser::{parse_document, RawBulletin};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::archive::{extract_archive, ArchiveEntry};
use crate::error::{IngestionError, Result};
use crate::normalize::{normalize_bulletin, NormalizedAlert};
use crate::source::AlertSource;

/// Stage of the current (or last) cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Discovering,
    Fetching,
    Extracting,
    Parsing,
    Normalizing,
    Done,
    Failed,
}

/// A bulletin file that was dropped from the cycle.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Result of a completed cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Alerts in file order, then info block order.
    pub alerts: Vec<NormalizedAlert>,
    /// Regular files in the archive.
    pub files_total: usize,
    /// Bulletin files that produced alerts (possibly zero).
    pub files_parsed: usize,
    /// Entries without the bulletin extension.
    pub files_skipped: usize,
    pub failures: Vec<FileFailure>,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Failed {
        /// Stage the cycle was in when it failed.
        stage: CycleState,
        error: IngestionError,
    },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }

    /// Alerts of a completed cycle. Empty for a failed one.
    pub fn alerts(&self) -> &[NormalizedAlert] {
        match self {
            CycleOutcome::Completed(report) => &report.alerts,
            CycleOutcome::Failed { .. } => &[],
        }
    }

    pub fn into_alerts(self) -> Vec<NormalizedAlert> {
        match self {
            CycleOutcome::Completed(report) => report.alerts,
            CycleOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// Ingestion orchestrator over an [`AlertSource`].
pub struct IngestionPipeline {
    source: Arc<dyn AlertSource>,
    state: watch::Sender<CycleState>,
}

impl IngestionPipeline {
    pub fn new(source: Arc<dyn AlertSource>) -> Self {
        let (state, _) = watch::channel(CycleState::Idle);
        Self { source, state }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Current cycle stage.
    pub fn state(&self) -> CycleState {
        *self.state.borrow()
    }

    /// Watch stage transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    fn enter(&self, stage: CycleState) {
        debug!(stage = ?stage, "Cycle stage");
        self.state.send_replace(stage);
    }

    fn fail(&self, stage: CycleState, error: IngestionError) -> CycleOutcome {
        match &error {
            IngestionError::DiscoveryRejected {
                estado,
                descripcion,
            } => {
                error!(estado = *estado, descripcion = %descripcion, "Discovery rejected");
            }
            other => {
                error!(stage = ?stage, error = %other, "Ingestion cycle failed");
            }
        }
        self.state.send_replace(CycleState::Failed);
        CycleOutcome::Failed { stage, error }
    }

    /// Run one full ingestion cycle.
    #[instrument(skip(self), fields(source = %self.source.name()))]
    pub async fn run(&self) -> CycleOutcome {
        self.enter(CycleState::Discovering);
        let envelope = match self.source.discover().await {
            Ok(envelope) => envelope,
            Err(e) => return self.fail(CycleState::Discovering, e),
        };
        let url = match envelope.archive_url() {
            Ok(url) => url.to_string(),
            Err(e) => return self.fail(CycleState::Discovering, e),
        };

        self.enter(CycleState::Fetching);
        let data = match self.source.fetch_archive(&url).await {
            Ok(data) => data,
            Err(e) => return self.fail(CycleState::Fetching, e),
        };

        self.enter(CycleState::Extracting);
        let entries = match extract_archive(&data) {
            Ok(entries) => entries,
            Err(e) => return self.fail(CycleState::Extracting, e),
        };

        let report = self.process_entries(entries);
        self.enter(CycleState::Done);

        info!(
            files = report.files_total,
            parsed = report.files_parsed,
            failed = report.failures.len(),
            alerts = report.alerts.len(),
            "Ingestion cycle complete"
        );
        CycleOutcome::Completed(report)
    }

    /// Run one cycle and return only the alerts. Any fatal error yields an
    /// empty list.
    pub async fn fetch_alerts(&self) -> Vec<NormalizedAlert> {
        self.run().await.into_alerts()
    }

    /// Extract and process an archive already in memory.
    pub fn process_archive(&self, data: &[u8]) -> Result<CycleReport> {
        self.enter(CycleState::Extracting);
        let entries = extract_archive(data)?;
        Ok(self.process_entries(entries))
    }

    /// Parse and normalize every bulletin entry, skipping files that fail.
    ///
    /// Each bulletin file moves the published state to `Parsing`, then to
    /// `Normalizing` once its document has been read.
    pub fn process_entries(&self, entries: Vec<ArchiveEntry>) -> CycleReport {
        let mut report = CycleReport {
            files_total: entries.len(),
            ..Default::default()
        };

        for entry in &entries {
            if !entry.is_markup() {
                debug!(file = %entry.name, "Skipping non-bulletin entry");
                report.files_skipped += 1;
                continue;
            }

            self.enter(CycleState::Parsing);
            let bulletin = match parse_entry(entry) {
                Ok(bulletin) => bulletin,
                Err(e) => {
                    warn!(file = %entry.name, error = %e, "Skipping bulletin file");
                    report.failures.push(FileFailure {
                        file: entry.name.clone(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            self.enter(CycleState::Normalizing);
            let alerts = normalize_bulletin(&bulletin);
            debug!(file = %entry.name, alerts = alerts.len(), "Bulletin processed");
            report.files_parsed += 1;
            report.alerts.extend(alerts);
        }

        report
    }
}

/// Parse one bulletin file into its typed view.
pub fn parse_entry(entry: &ArchiveEntry) -> Result<RawBulletin> {
    let text = entry.text();
    let document = parse_document(&text).map_err(|source| IngestionError::MarkupParse {
        file: entry.name.clone(),
        source,
    })?;

    RawBulletin::from_document(&document).ok_or_else(|| IngestionError::Normalization {
        file: entry.name.clone(),
        message: "document has no <alert> root".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DiscoveryEnvelope;
    use alert_common::SeverityTier;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_utils::{cap_alert_xml, tar_archive, InfoFixture, MALFORMED_XML};

    struct FakeSource {
        estado: i64,
        archive: Bytes,
        fetches: AtomicUsize,
    }

    impl FakeSource {
        fn ok(archive: Vec<u8>) -> Self {
            Self {
                estado: 200,
                archive: Bytes::from(archive),
                fetches: AtomicUsize::new(0),
            }
        }

        fn rejecting(estado: i64) -> Self {
            Self {
                estado,
                archive: Bytes::new(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AlertSource for FakeSource {
        async fn discover(&self) -> Result<DiscoveryEnvelope> {
            Ok(DiscoveryEnvelope {
                estado: self.estado,
                descripcion: if self.estado == 200 { "exito" } else { "No hay datos" }
                    .to_string(),
                datos: Some("https://example.test/archive.tar".to_string()),
                metadatos: None,
            })
        }

        async fn fetch_archive(&self, _url: &str) -> Result<Bytes> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.archive.clone())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn bulletin(id: &str, event: &str) -> String {
        cap_alert_xml(id, &[InfoFixture::new(event, "Moderate").area("Madrid")])
    }

    #[tokio::test]
    async fn test_end_to_end_single_alert() {
        let xml = cap_alert_xml(
            "galicia-1",
            &[InfoFixture::new("Viento", "Severe").area("Galicia")],
        );
        let source = Arc::new(FakeSource::ok(tar_archive(&[("galicia.xml", xml)])));
        let pipeline = IngestionPipeline::new(source.clone());

        let alerts = pipeline.fetch_alerts().await;

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, SeverityTier::Orange);
        assert_eq!(alerts[0].event, "Viento");
        assert_eq!(alerts[0].area, "Galicia");
        assert_eq!(pipeline.state(), CycleState::Done);
    }

    #[tokio::test]
    async fn test_malformed_file_is_skipped() {
        let archive = tar_archive(&[
            ("1.xml", bulletin("one", "Viento")),
            ("2.xml", MALFORMED_XML.to_string()),
            ("3.xml", bulletin("three", "Nevadas")),
        ]);
        let pipeline = IngestionPipeline::new(Arc::new(FakeSource::ok(archive)));

        let outcome = pipeline.run().await;
        let CycleOutcome::Completed(report) = outcome else {
            panic!("cycle should complete");
        };

        let ids: Vec<_> = report.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["one", "three"]);
        assert_eq!(report.files_total, 3);
        assert_eq!(report.files_parsed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file, "2.xml");
    }

    #[tokio::test]
    async fn test_rejected_discovery_skips_fetch() {
        let source = Arc::new(FakeSource::rejecting(404));
        let pipeline = IngestionPipeline::new(source.clone());

        let outcome = pipeline.run().await;

        match &outcome {
            CycleOutcome::Failed { stage, error } => {
                assert_eq!(*stage, CycleState::Discovering);
                assert!(matches!(
                    error,
                    IngestionError::DiscoveryRejected { estado: 404, .. }
                ));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(outcome.alerts().is_empty());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.state(), CycleState::Failed);
    }

    #[tokio::test]
    async fn test_invalid_archive_fails_cycle() {
        let pipeline = IngestionPipeline::new(Arc::new(FakeSource::ok(vec![b'z'; 700])));

        let outcome = pipeline.run().await;
        assert!(matches!(
            outcome,
            CycleOutcome::Failed {
                stage: CycleState::Extracting,
                error: IngestionError::ArchiveDecode(_),
            }
        ));
    }

    #[test]
    fn test_non_markup_entries_are_skipped() {
        let archive = tar_archive(&[
            ("readme.txt", "not a bulletin".to_string()),
            ("1.xml", bulletin("one", "Viento")),
        ]);
        let pipeline = IngestionPipeline::new(Arc::new(FakeSource::rejecting(500)));

        let report = pipeline.process_archive(&archive).unwrap();
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.alerts.len(), 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_document_without_alert_root() {
        let entry = ArchiveEntry {
            name: "other.xml".into(),
            data: Bytes::from_static(b"<feed><entry/></feed>"),
        };
        assert!(matches!(
            parse_entry(&entry),
            Err(IngestionError::Normalization { .. })
        ));
    }

    fn entry(name: &str, xml: &str) -> ArchiveEntry {
        ArchiveEntry {
            name: name.into(),
            data: Bytes::from(xml.to_string()),
        }
    }

    #[test]
    fn test_normalizing_entered_per_parsed_file() {
        let pipeline = IngestionPipeline::new(Arc::new(FakeSource::rejecting(500)));
        let good = bulletin("one", "Viento");

        pipeline.process_entries(vec![entry("1.xml", &good)]);
        assert_eq!(pipeline.state(), CycleState::Normalizing);

        pipeline.process_entries(vec![entry("1.xml", &good), entry("2.xml", MALFORMED_XML)]);
        assert_eq!(pipeline.state(), CycleState::Parsing);

        pipeline.process_entries(vec![entry("2.xml", MALFORMED_XML)]);
        assert_eq!(pipeline.state(), CycleState::Parsing);
    }

    #[test]
    fn test_output_order_is_file_then_info() {
        let first = cap_alert_xml(
            "a",
            &[
                InfoFixture::new("Lluvias", "Severe"),
                InfoFixture::new("Rain", "Severe").language("en-GB"),
            ],
        );
        let archive = tar_archive(&[("a.xml", first), ("b.xml", bulletin("b", "Viento"))]);
        let pipeline = IngestionPipeline::new(Arc::new(FakeSource::rejecting(500)));

        let report = pipeline.process_archive(&archive).unwrap();
        let events: Vec<_> = report.alerts.iter().map(|a| a.event.as_str()).collect();
        assert_eq!(events, vec!["Lluvias", "Rain", "Viento"]);
    }

    #[tokio::test]
    async fn test_mock_source_runs_through_pipeline() {
        let pipeline = IngestionPipeline::new(Arc::new(crate::mock::MockAlertSource::new()));
        let alerts = pipeline.fetch_alerts().await;

        assert_eq!(alerts.len(), 4);
        assert_eq!(alerts[0].id, "mock-1");
        assert_eq!(alerts[1].language, "en-GB");
        assert_eq!(alerts[2].severity, SeverityTier::Yellow);
        assert_eq!(alerts[3].severity, SeverityTier::Red);
        assert!(alerts.iter().all(|a| a.has_polygon()));
    }
}
