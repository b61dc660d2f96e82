//! Record driver: pulls records through the tokenizer and coercer into a sink.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use csvdv_model::{RecordBuilder, RecordSink};
use tracing::{Dispatch, debug, info_span, warn};

use crate::coerce::ColumnCoercer;
use crate::config::{ParserConfig, ParserTask};
use crate::error::{ConfigError, IngestError, RecordError, Result, TokenizeError};
use crate::source::{DecodingLineSource, LineSource};
use crate::summary::{RunSummary, SkippedLine};
use crate::tokenizer::CsvTokenizer;

#[derive(Debug)]
enum DriverState {
    AwaitingFile,
    AwaitingRecord,
    ProcessingRecord,
    /// Staged record is complete; carries the number of defaults it used.
    RecordComplete(usize),
    SkippingLine(RecordError),
    Finished,
}

/// One ingestion engine over an immutable configuration.
///
/// Engines are cheap to clone and share nothing mutable, so several may run
/// on different threads over the same [`ParserConfig`].
#[derive(Debug, Clone)]
pub struct ParserEngine {
    config: Arc<ParserConfig>,
    coercer: ColumnCoercer,
    dispatch: Option<Dispatch>,
}

impl ParserEngine {
    /// Validates default values against the schema and builds the engine.
    pub fn new(config: impl Into<Arc<ParserConfig>>) -> std::result::Result<Self, ConfigError> {
        let config = config.into();
        let coercer = ColumnCoercer::new(&config)?;
        Ok(Self {
            config,
            coercer,
            dispatch: None,
        })
    }

    pub fn from_task(task: ParserTask) -> std::result::Result<Self, ConfigError> {
        Self::new(task.normalize()?)
    }

    /// Routes this engine's log events to `dispatch` instead of the global subscriber.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Runs every input of `source` into `sink`.
    ///
    /// The sink is finished on success and closed on every exit path.
    pub fn run<L, S>(&self, source: L, sink: S) -> Result<RunSummary>
    where
        L: LineSource,
        S: RecordSink,
    {
        match &self.dispatch {
            Some(dispatch) => {
                tracing::dispatcher::with_default(dispatch, || self.drive(source, sink))
            }
            None => self.drive(source, sink),
        }
    }

    /// Runs the given files, decoded with the configured charset.
    pub fn run_files<I, P, S>(&self, paths: I, sink: S) -> Result<RunSummary>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
        S: RecordSink,
    {
        self.run(
            DecodingLineSource::from_paths(paths, self.config.charset),
            sink,
        )
    }

    fn drive<L, S>(&self, source: L, sink: S) -> Result<RunSummary>
    where
        L: LineSource,
        S: RecordSink,
    {
        let span = info_span!("ingest", columns = self.config.schema.len());
        let _guard = span.enter();
        let start = Instant::now();

        let mut tokenizer = CsvTokenizer::new(source, self.config.tokenizer.clone());
        let mut builder = RecordBuilder::new(sink, self.config.schema.len());
        let mut summary = RunSummary::default();
        let mut state = DriverState::AwaitingFile;

        loop {
            state = match state {
                DriverState::AwaitingFile => {
                    if tokenizer.start_next_file()? {
                        summary.files += 1;
                        debug!(file_index = summary.files - 1, "starting file");
                        self.skip_header_lines(&mut tokenizer)?;
                        DriverState::AwaitingRecord
                    } else {
                        DriverState::Finished
                    }
                }

                DriverState::AwaitingRecord => {
                    if tokenizer.start_next_record()? {
                        DriverState::ProcessingRecord
                    } else {
                        DriverState::AwaitingFile
                    }
                }

                DriverState::ProcessingRecord => {
                    match self.process_record(&mut tokenizer, &mut builder, &mut summary) {
                        Ok(applied) => DriverState::RecordComplete(applied),
                        Err(RecordError::Tokenize(err)) if !err.is_invalid_format() => {
                            return Err(err.into());
                        }
                        Err(RecordError::Config(err)) => return Err(err.into()),
                        Err(err) => DriverState::SkippingLine(err),
                    }
                }

                DriverState::RecordComplete(applied) => {
                    builder.add_record()?;
                    summary.defaults_applied += applied as u64;
                    DriverState::AwaitingRecord
                }

                DriverState::SkippingLine(err) => {
                    builder.discard();
                    let line = tokenizer.discard_rest_of_line();
                    let line_number = tokenizer.current_line_number();
                    let file_index = summary.files.saturating_sub(1);
                    if self.config.stop_on_invalid_record {
                        return Err(IngestError::InvalidRecord {
                            file_index,
                            line_number,
                            line,
                            source: err,
                        });
                    }
                    warn!(
                        file_index,
                        line_number, "Skipped line {line_number} ({err}): {line}"
                    );
                    summary.skipped.push(SkippedLine {
                        file_index,
                        line_number,
                        line,
                        reason: err.to_string(),
                    });
                    DriverState::AwaitingRecord
                }

                DriverState::Finished => break,
            };
        }

        summary.records = builder.committed();
        builder.finish()?;
        debug!(
            files = summary.files,
            records = summary.records,
            skipped = summary.skipped_count(),
            defaults_applied = summary.defaults_applied,
            duration_ms = start.elapsed().as_millis(),
            "ingest complete"
        );
        Ok(summary)
    }

    fn skip_header_lines<L: LineSource>(&self, tokenizer: &mut CsvTokenizer<L>) -> Result<()> {
        for _ in 0..self.config.skip_header_lines {
            if !tokenizer.skip_header_line()? {
                break;
            }
            debug!(line_number = tokenizer.current_line_number(), "skipped header line");
        }
        Ok(())
    }

    /// Stages every column, then checks that the record has no fields left.
    fn process_record<L, S>(
        &self,
        tokenizer: &mut CsvTokenizer<L>,
        builder: &mut RecordBuilder<S>,
        summary: &mut RunSummary,
    ) -> std::result::Result<usize, RecordError>
    where
        L: LineSource,
        S: RecordSink,
    {
        let applied = self.coercer.coerce_record(tokenizer, builder)?;
        if tokenizer.has_more_fields_in_record() {
            if !self.config.allow_extra_columns {
                return Err(TokenizeError::TooManyColumns.into());
            }
            let line_number = tokenizer.current_line_number();
            match tokenizer.skip_remaining_fields() {
                Ok(discarded) => {
                    warn!(line_number, discarded, "Discarded extra columns");
                }
                Err(err) if err.is_invalid_format() => {
                    let rest = tokenizer.discard_rest_of_line();
                    warn!(line_number, rest = %rest, "Discarded malformed extra columns");
                }
                Err(err) => return Err(err.into()),
            }
            summary.extra_columns_discarded += 1;
        }
        Ok(applied)
    }
}
