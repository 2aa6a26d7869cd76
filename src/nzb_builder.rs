//! Builds an NZB XML document for a release's segments.
//!
//! Grounded on the API service's `nzb_builder.py`/`newznab.py` (`nzb_xml_stub`):
//! unlike the stub, this builds one `<segment>` per stored [`Segment`], all under a
//! single bare `<file>` element. Message-ids are XML-escaped since, unlike the
//! original's string formatting, they come from untrusted Usenet subject lines.

use thiserror::Error;

use crate::db::Database;
use crate::segment_schema;
use crate::types::Release;
use crate::Result;

#[derive(Debug, Error)]
pub enum NzbFetchError {
    #[error("no release found for dedupe key {0}")]
    NotFound(String),
    #[error("release {0} has no segments")]
    NoSegments(String),
    #[error("release {0} failed segment validation: {1}")]
    InvalidSegments(String, #[source] segment_schema::SegmentSchemaError),
}

/// Look up `dedupe_key`, validate its segments, and render the NZB document.
pub async fn build_for_dedupe_key(db: &Database, dedupe_key: &str) -> Result<String> {
    let release = db
        .get_release(dedupe_key)
        .await?
        .ok_or_else(|| NzbFetchError::NotFound(dedupe_key.to_string()))
        .map_err(|e| crate::Error::Other(e.to_string()))?;

    if release.segments.is_empty() {
        return Err(crate::Error::Other(
            NzbFetchError::NoSegments(dedupe_key.to_string()).to_string(),
        ));
    }

    segment_schema::validate_all(&release.segments).map_err(|e| {
        crate::Error::Other(NzbFetchError::InvalidSegments(dedupe_key.to_string(), e).to_string())
    })?;

    let mut release = release;
    release.segments.sort_by_key(|s| s.number);

    Ok(build(&release))
}

/// Render `release` as a complete NZB document. Releases with no segments still
/// produce a well-formed `<nzb>` with an empty `<segments>` list.
pub fn build(release: &Release) -> String {
    let mut segments_xml = String::new();
    for segment in &release.segments {
        segments_xml.push_str(&format!(
            r#"<segment bytes="{}" number="{}">{}</segment>"#,
            segment.size,
            segment.number,
            escape(&segment.message_id)
        ));
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<nzb xmlns="http://www.newzbin.com/DTD/2003/nzb">"#,
            r#"<file>"#,
            r#"<segments>{segments}</segments>"#,
            r#"</file></nzb>"#,
        ),
        segments = segments_xml,
    )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
