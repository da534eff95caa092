//! Spatial filter handling: decoding caller geometries into WGS84, reducing
//! them to a proximity point, and filtering point features against them.
//!
//! The upstream directory has no spatial query support, so every area test
//! happens here after the rows arrive.

mod esri;
pub mod spatial_reference;

use geo::{Centroid, Geometry, Intersects, MapCoords, Point};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ports::define_port_error;
pub use spatial_reference::SpatialReference;
use spatial_reference::{mercator_to_wgs84, wgs84_to_mercator};

define_port_error! {
    /// Failure to understand a caller-supplied geometry. Callers treat it as
    /// "no spatial filter requested".
    pub enum GeometryParseError {
        /// The parameter was blank or described no vertices.
        Empty => "geometry is empty",
        /// The parameter looked like JSON but did not parse.
        InvalidJson { message: String } => "geometry is not valid JSON: {message}",
        /// The JSON parsed but matched no known geometry shape.
        Unsupported { message: String } => "unsupported geometry: {message}",
        /// A coordinate was missing or not a finite number.
        InvalidCoordinate { value: String } => "invalid coordinate: {value}",
    }
}

/// Broad shape classes relevant to filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    /// A single position.
    Point,
    /// Several positions.
    MultiPoint,
    /// One path.
    Line,
    /// Several paths.
    MultiLine,
    /// One area, possibly with holes.
    Polygon,
    /// Several areas.
    MultiPolygon,
    /// A heterogeneous collection.
    Collection,
}

impl GeometryKind {
    /// Whether the shape has an interior points can fall inside.
    #[must_use]
    pub const fn is_polygonal(self) -> bool {
        matches!(self, Self::Polygon | Self::MultiPolygon)
    }
}

/// A caller geometry in WGS84 longitude/latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalGeometry {
    shape: Geometry<f64>,
}

impl CanonicalGeometry {
    /// Wrap a shape whose coordinates are already WGS84.
    #[must_use]
    pub const fn from_wgs84(shape: Geometry<f64>) -> Self {
        Self { shape }
    }

    /// The underlying shape.
    #[must_use]
    pub const fn shape(&self) -> &Geometry<f64> {
        &self.shape
    }

    /// Shape class.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match &self.shape {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::Line(_) | Geometry::LineString(_) => GeometryKind::Line,
            Geometry::MultiLineString(_) => GeometryKind::MultiLine,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
                GeometryKind::Polygon
            }
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::Collection,
        }
    }

    /// The shape itself when it is a point, otherwise its centroid.
    #[must_use]
    pub fn centroid(&self) -> Option<Point<f64>> {
        match &self.shape {
            Geometry::Point(point) => Some(*point),
            shape => shape.centroid(),
        }
    }

    fn intersects_point(&self, point: &Point<f64>) -> bool {
        self.shape.intersects(point)
    }
}

/// Pick the spatial reference a geometry's coordinates are expressed in.
///
/// An explicit `inSR` wins, then the geometry's embedded `spatialReference`,
/// then WGS84.
#[must_use]
pub fn resolve_source_reference(
    in_sr: Option<&str>,
    embedded: Option<&Value>,
) -> SpatialReference {
    in_sr
        .and_then(SpatialReference::parse)
        .or_else(|| embedded.and_then(SpatialReference::from_json))
        .unwrap_or(SpatialReference::Wgs84)
}

/// Decode a caller geometry and reproject it to WGS84.
///
/// # Errors
///
/// Returns [`GeometryParseError`] when `raw` is not a recognisable geometry.
///
/// # Examples
///
/// ```
/// use brewery_query::geometry::{to_canonical, GeometryKind};
///
/// let shape = to_canonical(r#"{"x":-13042314.0,"y":3857628.4}"#, Some("102100"))
///     .expect("point decodes");
/// assert_eq!(shape.kind(), GeometryKind::Point);
/// let point = shape.centroid().expect("point has a centroid");
/// assert!((point.x() + 117.16).abs() < 1e-2);
/// ```
pub fn to_canonical(
    raw: &str,
    in_sr: Option<&str>,
) -> Result<CanonicalGeometry, GeometryParseError> {
    let (decoded, embedded) = esri::parse_geometry_param(raw)?;
    let shape = match resolve_source_reference(in_sr, embedded.as_ref()) {
        SpatialReference::WebMercator => decoded.map_coords(mercator_to_wgs84),
        SpatialReference::Wgs84 => decoded,
        SpatialReference::Unknown(wkid) => {
            debug!(wkid, "unrecognised spatial reference; assuming WGS84");
            decoded
        }
    };
    Ok(CanonicalGeometry::from_wgs84(shape))
}

/// Reduce a caller geometry to one WGS84 point for proximity sorting.
///
/// # Errors
///
/// Returns [`GeometryParseError`] when `raw` does not decode or has no
/// centroid.
pub fn centroid_of(raw: &str, in_sr: Option<&str>) -> Result<Point<f64>, GeometryParseError> {
    to_canonical(raw, in_sr)?
        .centroid()
        .ok_or(GeometryParseError::Empty)
}

/// Decode a caller geometry, logging and discarding parse failures.
#[must_use]
pub fn parse_spatial_filter(raw: &str, in_sr: Option<&str>) -> Option<CanonicalGeometry> {
    to_canonical(raw, in_sr)
        .inspect_err(|error| warn!(%error, "ignoring unparseable geometry filter"))
        .ok()
}

/// Project a WGS84 position into the requested output system.
#[must_use]
pub fn project_output(point: Point<f64>, out_sr: SpatialReference) -> Point<f64> {
    match out_sr {
        SpatialReference::WebMercator => Point::from(wgs84_to_mercator(point.0)),
        SpatialReference::Wgs84 | SpatialReference::Unknown(_) => point,
    }
}

/// Something positioned at a single WGS84 point.
pub trait Located {
    /// Longitude/latitude position; may be non-finite when the source had no
    /// usable coordinates.
    fn position(&self) -> Point<f64>;
}

/// Result of [`containment_filter`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContainmentOutcome<T> {
    /// Features kept.
    pub features: Vec<T>,
    /// Whether a containment test actually ran.
    pub applied: bool,
}

/// Keep the features lying inside or on a polygonal `shape`.
///
/// Points, multipoints and line shapes leave the list untouched with
/// `applied` false, as does an absent shape. Features without finite
/// coordinates never match an area.
pub fn containment_filter<T: Located>(
    features: Vec<T>,
    shape: Option<&CanonicalGeometry>,
) -> ContainmentOutcome<T> {
    let Some(area) = shape.filter(|candidate| candidate.kind().is_polygonal()) else {
        if let Some(other) = shape {
            debug!(kind = ?other.kind(), "geometry is not polygonal; skipping containment");
        }
        return ContainmentOutcome {
            features,
            applied: false,
        };
    };

    let inside = features
        .into_iter()
        .filter(|feature| {
            let position = feature.position();
            position.x().is_finite()
                && position.y().is_finite()
                && area.intersects_point(&position)
        })
        .collect();
    ContainmentOutcome {
        features: inside,
        applied: true,
    }
}

#[cfg(test)]
#[expect(
    clippy::float_arithmetic,
    reason = "coordinate assertions compare within a tolerance"
)]
mod tests {
    //! Canonicalisation, centroid and containment behaviour.

    use super::*;
    use geo::{Coord, polygon};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Site(f64, f64);

    impl Located for Site {
        fn position(&self) -> Point<f64> {
            Point::new(self.0, self.1)
        }
    }

    #[fixture]
    fn sites() -> Vec<Site> {
        vec![
            Site(0.5, 0.5),
            Site(2.0, 2.0),
            Site(1.0, 0.5),
            Site(f64::NAN, 0.5),
            Site(-0.5, 0.5),
        ]
    }

    fn unit_square() -> CanonicalGeometry {
        CanonicalGeometry::from_wgs84(Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]))
    }

    #[rstest]
    fn polygon_keeps_inside_and_boundary_points(sites: Vec<Site>) {
        let outcome = containment_filter(sites, Some(&unit_square()));
        assert!(outcome.applied);
        assert_eq!(outcome.features, vec![Site(0.5, 0.5), Site(1.0, 0.5)]);
    }

    #[rstest]
    #[case(r#"{"x":0.5,"y":0.5}"#)]
    #[case(r#"{"paths":[[[0,0],[1,1]]]}"#)]
    #[case(r#"{"points":[[0,0],[1,1]]}"#)]
    fn non_polygonal_shapes_leave_features_untouched(sites: Vec<Site>, #[case] raw: &str) {
        let shape = to_canonical(raw, None).expect("geometry decodes");
        let outcome = containment_filter(sites.clone(), Some(&shape));
        assert!(!outcome.applied);
        assert_eq!(outcome.features, sites);
    }

    #[rstest]
    fn absent_shape_is_not_applied(sites: Vec<Site>) {
        let outcome = containment_filter(sites.clone(), None);
        assert!(!outcome.applied);
        assert_eq!(outcome.features.len(), sites.len());
    }

    #[test]
    fn multipolygon_matches_either_part() {
        let raw = r#"{"rings":[
            [[0,0],[0,1],[1,1],[1,0],[0,0]],
            [[5,5],[5,6],[6,6],[6,5],[5,5]]
        ]}"#;
        let shape = to_canonical(raw, None).expect("rings decode");
        assert_eq!(shape.kind(), GeometryKind::MultiPolygon);

        let outcome = containment_filter(
            vec![Site(0.5, 0.5), Site(5.5, 5.5), Site(3.0, 3.0)],
            Some(&shape),
        );
        assert_eq!(outcome.features, vec![Site(0.5, 0.5), Site(5.5, 5.5)]);
    }

    #[test]
    fn mercator_envelope_is_reprojected() {
        let min = wgs84_to_mercator(Coord { x: -118.0, y: 32.0 });
        let max = wgs84_to_mercator(Coord { x: -116.0, y: 34.0 });
        let raw = json!({
            "xmin": min.x, "ymin": min.y, "xmax": max.x, "ymax": max.y,
            "spatialReference": { "wkid": 102_100 }
        })
        .to_string();

        let shape = to_canonical(&raw, None).expect("envelope decodes");
        let outcome = containment_filter(
            vec![Site(-117.16, 32.71), Site(-97.47, 35.2)],
            Some(&shape),
        );
        assert_eq!(outcome.features, vec![Site(-117.16, 32.71)]);
    }

    #[rstest]
    #[case(Some("4326"), Some(json!({"wkid": 3857})), SpatialReference::Wgs84)]
    #[case(None, Some(json!({"wkid": 102_100})), SpatialReference::WebMercator)]
    #[case(Some("bogus"), None, SpatialReference::Wgs84)]
    #[case(None, None, SpatialReference::Wgs84)]
    fn in_sr_overrides_embedded_reference(
        #[case] in_sr: Option<&str>,
        #[case] embedded: Option<Value>,
        #[case] expected: SpatialReference,
    ) {
        assert_eq!(resolve_source_reference(in_sr, embedded.as_ref()), expected);
    }

    #[test]
    fn centroid_of_point_is_the_point() {
        let point = centroid_of("-117.16,32.71", Some("4326")).expect("point decodes");
        assert_eq!(point, Point::new(-117.16, 32.71));
    }

    #[test]
    fn centroid_of_envelope_is_its_middle() {
        let point = centroid_of("-118,32,-116,34", None).expect("envelope decodes");
        assert!((point.x() + 117.0).abs() < 1e-9);
        assert!((point.y() - 33.0).abs() < 1e-9);
    }

    #[test]
    fn unparseable_filter_degrades_to_none() {
        assert!(parse_spatial_filter("{broken", None).is_none());
        assert!(parse_spatial_filter("", None).is_none());
    }

    #[test]
    fn output_projection_only_touches_mercator() {
        let point = Point::new(-117.1611, 32.7157);
        assert_eq!(project_output(point, SpatialReference::Wgs84), point);
        assert_eq!(project_output(point, SpatialReference::Unknown(2229)), point);
        let projected = project_output(point, SpatialReference::WebMercator);
        assert!((projected.x() + 13_042_314.0).abs() < 1.0);
    }
}
