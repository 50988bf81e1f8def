//! Turns a stored [`JobTemplate`] plus the settings blob into a [`JobSpec`].

use chrono::NaiveDate;
use leadscout_core::{JobSpec, JobTemplate, Pagination, Settings};

use crate::PipelineError;

/// Page plan for a schedule: one page of `record_limit` records starting at
/// page `skip_times - 1`.
#[must_use]
pub fn schedule_pagination(record_limit: i32, skip_times: i32) -> Pagination {
    Pagination {
        page_size: u32::try_from(record_limit).unwrap_or(0),
        page_count: 1,
        start_page: u32::try_from(skip_times.saturating_sub(1)).unwrap_or(0),
    }
}

/// Page plan for a queued job: `skip_times` pages of `record_limit` records
/// starting at the first page.
#[must_use]
pub fn queued_job_pagination(record_limit: i32, skip_times: i32) -> Pagination {
    Pagination {
        page_size: u32::try_from(record_limit).unwrap_or(0),
        page_count: u32::try_from(skip_times).unwrap_or(0).max(1),
        start_page: 0,
    }
}

/// Resolves credentials and the date range for one run.
///
/// Template values win over settings. Date bounds fall back to the settings
/// dates, then to `default_date` when given. Notify credentials come from the
/// template or settings whenever they are complete; upload runs only when the
/// template asks for it.
///
/// # Errors
///
/// Returns [`PipelineError::MissingSourceKey`] when the settings hold no
/// source API key.
pub fn resolve_job(
    template: &JobTemplate,
    settings: &Settings,
    pagination: Pagination,
    default_date: Option<NaiveDate>,
) -> Result<JobSpec, PipelineError> {
    let source_api_key = settings
        .source_api_key()
        .ok_or(PipelineError::MissingSourceKey)?;

    let mut filters = template.filters.clone();
    filters.added_from = filters
        .added_from
        .or(settings.from_date)
        .or(default_date);
    filters.added_to = filters.added_to.or(settings.to_date).or(default_date);

    Ok(JobSpec {
        source_api_key,
        filters,
        pagination,
        phone_mode: template.phone_mode.clone(),
        enrich_area_codes: template.enrich_area_codes,
        verify_emails: template.verify_emails,
        verifier_api_key: settings.verifier_api_key(),
        notify: template
            .notify
            .clone()
            .or_else(|| settings.notify_credentials()),
        upload_enabled: template.connect_cold_email,
        upload: template
            .upload
            .clone()
            .or_else(|| settings.upload_credentials()),
        output: template.output_naming(),
    })
}
