//! Pipeline orchestration.
//!
//! One run moves through `Acquire → ParseAll → EnrichAbstracts → NormalizeAll
//! → Dedup → Sort → Emit`, strictly sequentially. Only `Acquire` can end the
//! run early; every later failure is confined to the single publication it
//! happened on and is recorded in the [`RunReport`].

use std::fmt;

use crate::config::Config;
use crate::models::{PublicationRecord, RawUnit};
use crate::parser::{ParseError, RecordParser};
use crate::sink::{Sink, SinkError};
use crate::sources::{Source, SourceError};
use crate::utils::{
    deduplicate_records, normalize_authors, normalize_venue, normalize_year, sort_by_year_desc,
    AuthorSplit, DuplicateStrategy, UnknownYear,
};

pub use crate::config::FatalPolicy;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    ParseAll,
    EnrichAbstracts,
    NormalizeAll,
    Dedup,
    Sort,
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Acquire => "acquire",
            Stage::ParseAll => "parse",
            Stage::EnrichAbstracts => "enrich-abstracts",
            Stage::NormalizeAll => "normalize",
            Stage::Dedup => "dedup",
            Stage::Sort => "sort",
            Stage::Emit => "emit",
        };
        f.write_str(name)
    }
}

/// Errors that end a run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] SourceError),

    #[error("parser configuration: {0}")]
    Parser(#[from] ParseError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Knobs that shape a run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub fetch_abstracts: bool,
    pub author_split: AuthorSplit,
    pub unknown_year: UnknownYear,
    pub dedup: bool,
    pub dedup_strategy: DuplicateStrategy,
    pub title_similarity: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetch_abstracts: config.acquisition.fetch_abstracts,
            author_split: config.normalize.author_split,
            unknown_year: config.normalize.unknown_year,
            dedup: config.dedup.enabled,
            dedup_strategy: config.dedup.strategy,
            title_similarity: config.dedup.title_similarity,
        }
    }
}

/// A raw unit that was dropped, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUnit {
    /// Position of the unit in the acquisition result
    pub index: usize,
    pub kind: &'static str,
    pub reason: String,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Final, ordered records
    pub records: Vec<PublicationRecord>,
    /// Units returned by acquisition
    pub raw_units: usize,
    pub skipped: Vec<SkippedUnit>,
    pub abstracts_fetched: usize,
    pub abstract_failures: usize,
    pub duplicates_removed: usize,
}

/// Drives one acquisition strategy through the full pipeline
#[derive(Debug)]
pub struct Pipeline {
    source: Box<dyn Source>,
    parser: RecordParser,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(source: Box<dyn Source>, parser: RecordParser, options: PipelineOptions) -> Self {
        Self {
            source,
            parser,
            options,
        }
    }

    /// Build the parser and options from configuration
    pub fn from_config(source: Box<dyn Source>, config: &Config) -> Result<Self, PipelineError> {
        let parser = RecordParser::new(config.fields.clone(), &config.markup)?
            .with_citations(config.acquisition.include_citations);
        Ok(Self::new(source, parser, PipelineOptions::from_config(config)))
    }

    pub fn source(&self) -> &dyn Source {
        self.source.as_ref()
    }

    /// Run every stage up to, not including, `Emit`
    pub async fn run(&mut self) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::default();

        tracing::info!(stage = %Stage::Acquire, source = self.source.id(), "Listing publications");
        let units = self.source.list_publications().await?.into_units();
        report.raw_units = units.len();
        if units.is_empty() {
            tracing::warn!("Acquisition returned zero publications");
        }

        tracing::info!(stage = %Stage::ParseAll, "Parsing {} raw units", units.len());
        let mut parsed = self.parse_all(&units, &mut report);

        if self.options.fetch_abstracts {
            if self.source.supports_abstracts() {
                tracing::info!(stage = %Stage::EnrichAbstracts, "Fetching {} abstracts", parsed.len());
                self.enrich_abstracts(&mut parsed, &mut report).await;
            } else {
                tracing::warn!("{} cannot fetch abstracts; skipping enrichment", self.source.name());
            }
        }

        tracing::debug!(stage = %Stage::NormalizeAll, "Normalizing records");
        let mut records: Vec<PublicationRecord> = parsed
            .into_iter()
            .map(|(_, mut record)| {
                normalize_record(&mut record, self.options.author_split);
                record
            })
            .collect();

        if self.options.dedup {
            let (kept, removed) = deduplicate_records(
                records,
                self.options.dedup_strategy,
                self.options.title_similarity,
            );
            if removed > 0 {
                tracing::info!(stage = %Stage::Dedup, "Removed {} duplicate publications", removed);
            }
            records = kept;
            report.duplicates_removed = removed;
        }

        tracing::debug!(stage = %Stage::Sort, "Sorting {} records by year", records.len());
        sort_by_year_desc(&mut records, self.options.unknown_year);

        report.records = records;
        Ok(report)
    }

    /// Run the pipeline and hand the result to `sink`
    ///
    /// When acquisition fails, `on_fatal` decides whether an empty document
    /// is written; the acquisition error is returned either way.
    pub async fn run_to_sink(
        &mut self,
        sink: &dyn Sink,
        on_fatal: FatalPolicy,
    ) -> Result<RunReport, PipelineError> {
        let report = match self.run().await {
            Ok(report) => report,
            Err(error) => {
                if on_fatal == FatalPolicy::Empty {
                    tracing::warn!("Run failed; writing an empty publication list");
                    if let Err(sink_error) = sink.emit(&[]) {
                        tracing::error!("Could not write empty output: {}", sink_error);
                    }
                }
                return Err(error);
            }
        };

        tracing::info!(stage = %Stage::Emit, "Emitting {} records", report.records.len());
        sink.emit(&report.records)?;
        Ok(report)
    }

    /// Release the strategy's session
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.source.shutdown().await {
            tracing::warn!("Failed to shut down {}: {}", self.source.name(), e);
        }
    }

    /// Parse every unit, keeping each record's unit index for enrichment
    fn parse_all(
        &self,
        units: &[RawUnit],
        report: &mut RunReport,
    ) -> Vec<(usize, PublicationRecord)> {
        let mut parsed = Vec::with_capacity(units.len());

        for (index, unit) in units.iter().enumerate() {
            match self.parser.parse(unit) {
                Ok(record) => parsed.push((index, record)),
                Err(e) => {
                    tracing::warn!("Skipping {} unit {}: {}", unit.kind(), index, e);
                    report.skipped.push(SkippedUnit {
                        index,
                        kind: unit.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        parsed
    }

    /// One publication at a time, in source order
    async fn enrich_abstracts(
        &mut self,
        parsed: &mut [(usize, PublicationRecord)],
        report: &mut RunReport,
    ) {
        for (index, record) in parsed.iter_mut() {
            match self.source.fetch_abstract(*index).await {
                Ok(text) => {
                    record.r#abstract = text.trim().to_string();
                    if record.has_abstract() {
                        report.abstracts_fetched += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("No abstract for \"{}\": {}", record.title, e);
                    report.abstract_failures += 1;
                }
            }
        }
    }
}

/// Normalize one record in place: year first, so the venue can drop it
pub fn normalize_record(record: &mut PublicationRecord, split: AuthorSplit) {
    record.title = record.title.split_whitespace().collect::<Vec<_>>().join(" ");
    record.year = normalize_year(&record.year);
    record.venue = normalize_venue(&record.venue, &record.year);
    record.authors = record
        .authors
        .iter()
        .flat_map(|raw| normalize_authors(raw, split))
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AcquisitionResult;
    use crate::parser::{FieldKeys, MarkupSelectors};
    use crate::sources::MockSource;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct MemorySink {
        emitted: Mutex<Vec<Vec<PublicationRecord>>>,
    }

    impl Sink for MemorySink {
        fn emit(&self, records: &[PublicationRecord]) -> Result<(), SinkError> {
            self.emitted.lock().unwrap().push(records.to_vec());
            Ok(())
        }
    }

    fn pipeline(source: MockSource, options: PipelineOptions) -> Pipeline {
        let parser = RecordParser::new(FieldKeys::default(), &MarkupSelectors::default()).unwrap();
        Pipeline::new(Box::new(source), parser, options)
    }

    fn structured(values: Vec<serde_json::Value>) -> AcquisitionResult {
        AcquisitionResult::Structured(values)
    }

    #[tokio::test]
    async fn test_end_to_end_record() {
        let source = MockSource::new().with_listing(structured(vec![json!({
            "title": "X", "author": "A and B", "venue": "Conf, 2021", "year": "2021"
        })]));

        let report = pipeline(source, PipelineOptions::default()).run().await.unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(
            serde_json::to_value(&report.records[0]).unwrap(),
            json!({"title": "X", "authors": ["A", "B"], "venue": "Conf", "year": "2021", "abstract": ""})
        );
    }

    #[tokio::test]
    async fn test_bad_units_are_skipped_with_diagnostics() {
        let source = MockSource::new().with_listing(structured(vec![
            json!({"title": "Good", "year": "2020"}),
            json!("not an object"),
            json!({"title": "Also good"}),
        ]));

        let report = pipeline(source, PipelineOptions::default()).run().await.unwrap();

        assert_eq!(report.raw_units, 3);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.skipped[0].kind, "structured");
    }

    #[tokio::test]
    async fn test_enrichment_uses_unit_indices_and_isolates_failures() {
        let source = MockSource::new()
            .with_listing(structured(vec![
                json!({"title": "First", "year": "2019"}),
                json!(42),
                json!({"title": "Third", "year": "2021"}),
                json!({"title": "Fourth", "year": "2020"}),
            ]))
            .with_abstract(0, "  Abstract one ")
            .failing_abstract(2, "overlay did not open")
            .with_abstract(3, "Abstract four");
        let calls = source.abstract_calls();

        let options = PipelineOptions {
            fetch_abstracts: true,
            ..PipelineOptions::default()
        };
        let report = pipeline(source, options).run().await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![0, 2, 3]);
        assert_eq!(report.abstracts_fetched, 2);
        assert_eq!(report.abstract_failures, 1);

        let titles: Vec<_> = report.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Third", "Fourth", "First"]);
        assert_eq!(report.records[0].r#abstract, "");
        assert_eq!(report.records[1].r#abstract, "Abstract four");
        assert_eq!(report.records[2].r#abstract, "Abstract one");
    }

    #[tokio::test]
    async fn test_enrichment_is_skipped_when_disabled() {
        let source = MockSource::new()
            .with_listing(structured(vec![json!({"title": "Only"})]))
            .with_abstract(0, "unused");
        let calls = source.abstract_calls();

        let report = pipeline(source, PipelineOptions::default()).run().await.unwrap();

        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(report.records[0].r#abstract, "");
    }

    #[tokio::test]
    async fn test_duplicates_are_removed_before_sorting() {
        let source = MockSource::new().with_listing(structured(vec![
            json!({"title": "Graph Networks", "venue": "A", "year": "2020"}),
            json!({"title": "Graph networks.", "venue": "B", "year": "2020"}),
            json!({"title": "Other", "year": "2021"}),
        ]));

        let report = pipeline(source, PipelineOptions::default()).run().await.unwrap();
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[1].venue, "A");

        let source = MockSource::new().with_listing(structured(vec![
            json!({"title": "Same", "year": "2020"}),
            json!({"title": "Same", "year": "2020"}),
        ]));
        let options = PipelineOptions {
            dedup: false,
            ..PipelineOptions::default()
        };
        let report = pipeline(source, options).run().await.unwrap();
        assert_eq!(report.records.len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_acquisition_respects_policy() {
        let sink = MemorySink::default();
        let mut skip = pipeline(
            MockSource::new().failing_listing("connection refused"),
            PipelineOptions::default(),
        );
        let result = skip.run_to_sink(&sink, FatalPolicy::Skip).await;
        assert!(matches!(result, Err(PipelineError::Acquisition(_))));
        assert!(sink.emitted.lock().unwrap().is_empty());

        let mut empty = pipeline(
            MockSource::new().failing_listing("connection refused"),
            PipelineOptions::default(),
        );
        let result = empty.run_to_sink(&sink, FatalPolicy::Empty).await;
        assert!(result.is_err());
        assert_eq!(*sink.emitted.lock().unwrap(), vec![Vec::<PublicationRecord>::new()]);
    }

    #[tokio::test]
    async fn test_zero_units_emit_empty_list() {
        let sink = MemorySink::default();
        let mut run = pipeline(MockSource::new(), PipelineOptions::default());

        let report = run.run_to_sink(&sink, FatalPolicy::Skip).await.unwrap();
        assert_eq!(report.raw_units, 0);
        assert_eq!(*sink.emitted.lock().unwrap(), vec![Vec::<PublicationRecord>::new()]);
    }

    #[test]
    fn test_normalize_record_uses_normalized_year_for_venue() {
        let mut record = PublicationRecord {
            title: "  Spaced   title ".to_string(),
            authors: vec!["A. Smith and B. Jones, C. Lee".to_string()],
            venue: "Journal 12 (3), 2019".to_string(),
            year: "Published 2019".to_string(),
            ..PublicationRecord::default()
        };

        normalize_record(&mut record, AuthorSplit::AndAndComma);

        assert_eq!(record.title, "Spaced title");
        assert_eq!(record.year, "2019");
        assert_eq!(record.venue, "Journal 12 (3)");
        assert_eq!(record.authors, vec!["A. Smith", "B. Jones", "C. Lee"]);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::EnrichAbstracts.to_string(), "enrich-abstracts");
    }
}
