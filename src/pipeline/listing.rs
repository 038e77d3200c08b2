//! Explodes the year-grouped listing into one row per film.
//!
//! The listing looks like:
//!
//! ```json
//! {"results": [{"year": "1927 / 28 (1st)", "films": [{"Film": "Wings", "Detail URL": "..."}]}]}
//! ```

use serde_json::Value;
use tracing::{debug, warn};

use super::error::PipelineError;
use super::records::{Row, flatten_object};

/// Listing field holding the film objects of one year.
const FILMS_KEY: &str = "films";

/// Film field holding the detail page URL.
pub const DETAIL_URL_KEY: &str = "Detail URL";

/// Turns the listing into film rows.
///
/// Each film is flattened and carries every field of its year entry except
/// `films`; film fields win on a name collision. A year with no films still
/// yields one row holding the year fields.
///
/// # Errors
///
/// Returns [`PipelineError::MalformedListing`] if `results` is missing or not
/// an array (this includes the empty record returned for a refused listing).
pub fn explode_listing(url: &str, listing: &Value) -> Result<Vec<Row>, PipelineError> {
    let results = listing
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::malformed_listing(url, "missing `results` array"))?;

    let mut rows = Vec::new();
    for (position, entry) in results.iter().enumerate() {
        let Some(entry) = entry.as_object() else {
            warn!(position, "skipping non-object listing entry");
            continue;
        };

        let films: &[Value] = entry
            .get(FILMS_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let parent_fields = || entry.iter().filter(|(key, _)| key.as_str() != FILMS_KEY);

        if films.is_empty() {
            rows.push(parent_fields().map(|(k, v)| (k.clone(), v.clone())).collect());
            continue;
        }

        for film in films {
            let mut row = flatten_object(film);
            for (key, value) in parent_fields() {
                row.entry(key.clone()).or_insert_with(|| value.clone());
            }
            rows.push(row);
        }
    }

    debug!(years = results.len(), films = rows.len(), "listing exploded");
    Ok(rows)
}

/// Detail URLs in row order; a row without one yields an empty string.
#[must_use]
pub fn detail_urls(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            row.get(DETAIL_URL_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}
