//! Extraction and cleaning of the film dataset.
//!
//! A run has two stages:
//!
//! 1. **Extraction**: fetch the listing with a [`SingleFetcher`], explode it
//!    into film rows, fetch every detail page with a [`ConcurrentFetcher`],
//!    merge rows with details and write the raw table.
//! 2. **Cleaning**: normalize budgets and years and write the staged table.
//!
//! Fetch failures never abort a run; a refused or exhausted detail page just
//! contributes no columns to its row.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use filmfetch_core::fetch::TracingReporter;
//! use filmfetch_core::pipeline::{Pipeline, PipelineOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(PipelineOptions::default(), Arc::new(TracingReporter));
//! let report = pipeline.run().await?;
//! println!("{} films written to {}", report.films, report.raw_path.display());
//! # Ok(())
//! # }
//! ```

mod cleaning;
mod error;
mod listing;
mod records;
mod table;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument};

use crate::fetch::{
    BatchSummary, ClientSettings, ConcurrentFetcher, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS,
    FetchReporter, RetryPolicy, SingleFetcher,
};

pub use cleaning::{
    BUDGET_CAP_USD, BUDGET_USD_COLUMN, CleanFilmRecord, UNKNOWN_YEAR, UNPARSED_BUDGET,
    clean_budget, clean_records, clean_year,
};
pub use error::PipelineError;
pub use listing::{DETAIL_URL_KEY, detail_urls, explode_listing};
pub use records::{
    FINAL_COLUMNS, FilmRecord, Row, cell_text, flatten_object, merge_details, normalize_column,
};
pub use table::{render_csv, write_csv};

/// Listing endpoint of the public dataset.
pub const DEFAULT_BASE_URL: &str = "http://oscars.yipitdata.com/";

/// Directory the tables are written to by default.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// File name of the raw table.
pub const RAW_FILE_NAME: &str = "raw_films_data.csv";

/// File name of the cleaned table.
pub const STAGE_FILE_NAME: &str = "stage_films_data.csv";

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Listing URL.
    pub base_url: String,
    /// Directory receiving both tables.
    pub output_dir: PathBuf,
    /// Detail fetch concurrency limit.
    pub concurrency: usize,
    /// Attempts per URL, first try included.
    pub max_attempts: u32,
    /// Timeouts and User-Agent for every request.
    pub client: ClientSettings,
    /// Whether to run the cleaning stage.
    pub clean: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            client: ClientSettings::default(),
            clean: true,
        }
    }
}

impl PipelineOptions {
    /// Path of the raw table.
    #[must_use]
    pub fn raw_path(&self) -> PathBuf {
        self.output_dir.join(RAW_FILE_NAME)
    }

    /// Path of the cleaned table.
    #[must_use]
    pub fn stage_path(&self) -> PathBuf {
        self.output_dir.join(STAGE_FILE_NAME)
    }
}

/// Result of [`Pipeline::extract`].
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Raw film rows in listing order.
    pub records: Vec<FilmRecord>,
    /// Counters of the detail batch.
    pub batch: BatchSummary,
    /// Where the raw table was written.
    pub raw_path: PathBuf,
}

/// Summary of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Number of film rows.
    pub films: usize,
    /// Counters of the detail batch.
    pub batch: BatchSummary,
    /// Raw table path.
    pub raw_path: PathBuf,
    /// Cleaned table path, if cleaning ran.
    pub stage_path: Option<PathBuf>,
    /// Wall time of the run.
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

/// Runs extraction and cleaning with the given options.
#[derive(Clone)]
pub struct Pipeline {
    options: PipelineOptions,
    reporter: Arc<dyn FetchReporter>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline reporting fetch events to `reporter`.
    #[must_use]
    pub fn new(options: PipelineOptions, reporter: Arc<dyn FetchReporter>) -> Self {
        Self { options, reporter }
    }

    /// Returns the run options.
    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs extraction, then cleaning unless disabled.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the listing is malformed, the fetcher
    /// settings are invalid, or a table cannot be written.
    #[instrument(skip(self), fields(base_url = %self.options.base_url))]
    pub async fn run(&self) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let extraction = self.extract_from(started).await?;

        let stage_path = if self.options.clean {
            Some(self.clean(&extraction.records).await?)
        } else {
            info!("cleaning skipped");
            None
        };

        Ok(PipelineReport {
            films: extraction.records.len(),
            batch: extraction.batch,
            raw_path: extraction.raw_path,
            stage_path,
            elapsed: started.elapsed(),
        })
    }

    /// Fetches the listing and every detail page, then writes the raw table.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the listing is malformed, the fetcher
    /// settings are invalid, or the raw table cannot be written.
    pub async fn extract(&self) -> Result<Extraction, PipelineError> {
        self.extract_from(Instant::now()).await
    }

    async fn extract_from(&self, started: Instant) -> Result<Extraction, PipelineError> {
        let options = &self.options;

        let detail_fetcher = ConcurrentFetcher::new(
            options.concurrency,
            RetryPolicy::concurrent().with_max_attempts(options.max_attempts),
            options.client.clone(),
            Arc::clone(&self.reporter),
        )?
        .with_start_time(started);
        let listing_fetcher = SingleFetcher::new(
            RetryPolicy::single().with_max_attempts(options.max_attempts),
            options.client.clone(),
            Arc::clone(&self.reporter),
        );

        let listing = listing_fetcher.fetch(&options.base_url).await;
        let rows = explode_listing(&options.base_url, &listing)?;
        let urls = detail_urls(&rows);

        let results = detail_fetcher.fetch_urls(&urls).await;
        let batch = results.summary();

        let records: Vec<FilmRecord> = merge_details(rows, results.into_records())
            .iter()
            .map(FilmRecord::from_row)
            .collect();

        let raw_path = options.raw_path();
        let cells: Vec<Vec<String>> = records.iter().map(FilmRecord::cells).collect();
        write_csv(&raw_path, &FINAL_COLUMNS, &cells).await?;

        info!(
            films = records.len(),
            path = %raw_path.display(),
            "Data Extraction completed successfully. Data saved to {}",
            raw_path.display()
        );

        Ok(Extraction {
            records,
            batch,
            raw_path,
        })
    }

    /// Cleans `records` and writes the staged table, returning its path.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the table cannot be written.
    pub async fn clean(&self, records: &[FilmRecord]) -> Result<PathBuf, PipelineError> {
        let cleaned = clean_records(records);
        let stage_path = self.options.stage_path();
        let cells: Vec<Vec<String>> = cleaned.iter().map(CleanFilmRecord::cells).collect();
        write_csv(&stage_path, &CleanFilmRecord::header(), &cells).await?;

        info!(
            films = cleaned.len(),
            path = %stage_path.display(),
            "Data cleaning completed successfully. Cleaned data saved to {}",
            stage_path.display()
        );
        Ok(stage_path)
    }
}
