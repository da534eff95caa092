//! Inbound feature-query parameters as the calling protocol sends them.

use crate::geometry::SpatialReference;

/// One feature-service query. Every field is optional; values are kept as
/// the caller wrote them and interpreted during translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureQuery {
    /// SQL-like attribute filter (`where`).
    pub where_clause: Option<String>,
    /// ArcGIS JSON or compact geometry filter (`geometry`).
    pub geometry: Option<String>,
    /// Spatial reference of `geometry` (`inSR`).
    pub in_sr: Option<String>,
    /// Requested output spatial reference (`outSR`).
    pub out_sr: Option<String>,
    /// Comma-separated `<field> [ASC|DESC]` list (`orderByFields`).
    pub order_by_fields: Option<String>,
    /// Comma-separated integer ids (`objectIds`).
    pub object_ids: Option<String>,
    /// Maximum rows wanted (`resultRecordCount`).
    pub result_record_count: Option<u32>,
    /// Rows to skip (`resultOffset`).
    pub result_offset: Option<u32>,
}

impl FeatureQuery {
    /// The output spatial reference, when one was given and parses.
    #[must_use]
    pub fn out_reference(&self) -> Option<SpatialReference> {
        self.out_sr.as_deref().and_then(SpatialReference::parse)
    }

    /// A positive record count, if requested.
    #[must_use]
    pub fn record_count(&self) -> Option<u32> {
        self.result_record_count.filter(|count| *count > 0)
    }

    /// A positive offset, if requested.
    #[must_use]
    pub fn offset(&self) -> Option<u32> {
        self.result_offset.filter(|offset| *offset > 0)
    }
}
