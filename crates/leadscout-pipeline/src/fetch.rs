use leadscout_core::{Pagination, PhoneMode, RawRecord, SourceFilters};
use leadscout_scraper::{PlacesQuery, ScraperError};

use crate::ports::RecordSource;

/// Fetches `pagination.page_count` pages in order and concatenates them.
///
/// `skip` starts at `start_page * page_size` and advances by `page_size`
/// after each page. The first failing page aborts the fetch; no partial
/// result is returned.
///
/// # Errors
///
/// Returns the [`ScraperError`] of the first page that failed.
pub async fn fetch_pages(
    source: &dyn RecordSource,
    api_key: &str,
    filters: &SourceFilters,
    pagination: Pagination,
    phone_mode: &PhoneMode,
) -> Result<Vec<RawRecord>, ScraperError> {
    let mut records = Vec::new();

    for (page, skip) in pagination.offsets().into_iter().enumerate() {
        let query = PlacesQuery {
            filters: filters.clone(),
            phone_mode: phone_mode.clone(),
            limit: pagination.page_size,
            skip,
        };
        let batch = source.fetch_page(api_key, &query).await?;
        tracing::debug!(page, skip, count = batch.len(), "fetched page");
        records.extend(batch);
    }

    Ok(records)
}
