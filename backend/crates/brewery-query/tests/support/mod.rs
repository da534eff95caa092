//! Shared record builders for pipeline integration tests.

use brewery_query::record::{BreweryAttributes, BreweryRecord, RawCoordinate};

/// A micro brewery with decimal-string coordinates, as the upstream ships it.
pub fn brewery(id: &str, city: &str, longitude: f64, latitude: f64) -> BreweryRecord {
    BreweryRecord {
        attributes: BreweryAttributes {
            id: id.to_owned(),
            name: format!("{id} Brewing"),
            brewery_type: "micro".to_owned(),
            city: Some(city.to_owned()),
            state_province: Some("California".to_owned()),
            country: Some("United States".to_owned()),
            ..BreweryAttributes::default()
        },
        latitude: Some(RawCoordinate::Text(latitude.to_string())),
        longitude: Some(RawCoordinate::Text(longitude.to_string())),
    }
}

/// `count` breweries named `row-0`, `row-1`, ... spread along the equator.
#[expect(
    clippy::integer_division_remainder_used,
    reason = "longitudes wrap every 90 rows"
)]
pub fn numbered_breweries(count: u32) -> Vec<BreweryRecord> {
    (0..count)
        .map(|n| brewery(&format!("row-{n}"), "Somewhere", f64::from(n % 90), 0.0))
        .collect()
}
