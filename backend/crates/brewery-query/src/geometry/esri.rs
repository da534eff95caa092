//! ArcGIS JSON geometry decoding into `geo` shapes.
//!
//! Supports points, multipoints, polylines, polygons and envelopes, plus the
//! compact `x,y` and `xmin,ymin,xmax,ymax` forms feature-service clients send
//! in query strings.

use geo::algorithm::winding_order::{Winding, WindingOrder};
use geo::{
    Contains, Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon, Rect,
};
use serde_json::Value;

use super::GeometryParseError;

/// Decode a query-string geometry parameter.
///
/// Returns the shape together with any embedded `spatialReference` object.
pub(super) fn parse_geometry_param(
    raw: &str,
) -> Result<(Geometry<f64>, Option<Value>), GeometryParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GeometryParseError::Empty);
    }
    if !trimmed.starts_with('{') {
        return parse_compact(trimmed).map(|geometry| (geometry, None));
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|error| GeometryParseError::invalid_json(error.to_string()))?;
    let geometry = geometry_from_value(&value)?;
    Ok((geometry, value.get("spatialReference").cloned()))
}

fn parse_compact(raw: &str) -> Result<Geometry<f64>, GeometryParseError> {
    let numbers = raw
        .split(',')
        .map(str::trim)
        .map(|part| {
            part.parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .ok_or_else(|| GeometryParseError::invalid_coordinate(part))
        })
        .collect::<Result<Vec<_>, _>>()?;
    match numbers.as_slice() {
        [x, y] => Ok(Geometry::Point(Point::new(*x, *y))),
        [xmin, ymin, xmax, ymax] => Ok(envelope(*xmin, *ymin, *xmax, *ymax)),
        _ => Err(GeometryParseError::unsupported(format!(
            "expected 2 or 4 comma-separated numbers, got {}",
            numbers.len()
        ))),
    }
}

fn geometry_from_value(value: &Value) -> Result<Geometry<f64>, GeometryParseError> {
    if let (Some(x), Some(y)) = (value.get("x"), value.get("y")) {
        return Ok(Geometry::Point(Point::new(number(x)?, number(y)?)));
    }
    if let Some(points) = value.get("points") {
        let coords = positions(points)?;
        if coords.is_empty() {
            return Err(GeometryParseError::Empty);
        }
        return Ok(Geometry::MultiPoint(MultiPoint::from(coords)));
    }
    if let Some(paths) = value.get("paths") {
        return polyline(paths);
    }
    if let Some(rings) = value.get("rings") {
        return polygon(rings);
    }
    if let (Some(xmin), Some(ymin), Some(xmax), Some(ymax)) = (
        value.get("xmin"),
        value.get("ymin"),
        value.get("xmax"),
        value.get("ymax"),
    ) {
        return Ok(envelope(
            number(xmin)?,
            number(ymin)?,
            number(xmax)?,
            number(ymax)?,
        ));
    }
    Err(GeometryParseError::unsupported(
        "expected one of x/y, points, paths, rings or xmin/ymin/xmax/ymax",
    ))
}

fn envelope(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Geometry<f64> {
    let rect = Rect::new(Coord { x: xmin, y: ymin }, Coord { x: xmax, y: ymax });
    Geometry::Polygon(rect.to_polygon())
}

fn polyline(paths: &Value) -> Result<Geometry<f64>, GeometryParseError> {
    let mut lines = arrays(paths)?
        .iter()
        .map(|path| positions(path).map(LineString::from))
        .collect::<Result<Vec<_>, _>>()?;
    lines.retain(|line| line.0.len() >= 2);
    match lines.len() {
        0 => Err(GeometryParseError::Empty),
        1 => Ok(Geometry::LineString(lines.remove(0))),
        _ => Ok(Geometry::MultiLineString(MultiLineString::new(lines))),
    }
}

/// ArcGIS rings: clockwise rings are shells, counter-clockwise rings are
/// holes. Each hole joins the first shell containing its first vertex; a hole
/// no shell contains is promoted to a shell.
fn polygon(rings: &Value) -> Result<Geometry<f64>, GeometryParseError> {
    let mut shells: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    let mut holes: Vec<LineString<f64>> = Vec::new();
    for raw_ring in arrays(rings)? {
        let mut ring = LineString::from(positions(raw_ring)?);
        if ring.0.len() < 3 {
            continue;
        }
        ring.close();
        match ring.winding_order() {
            Some(WindingOrder::CounterClockwise) => holes.push(ring),
            _ => shells.push((ring, Vec::new())),
        }
    }

    for hole in holes {
        let owner = hole.0.first().copied().map(Point::from).and_then(|anchor| {
            shells.iter().position(|(shell, _)| {
                Polygon::new(shell.clone(), Vec::new()).contains(&anchor)
            })
        });
        match owner {
            Some(index) => {
                if let Some((_, interiors)) = shells.get_mut(index) {
                    interiors.push(hole);
                }
            }
            None => shells.push((hole, Vec::new())),
        }
    }

    let mut polygons: Vec<Polygon<f64>> = shells
        .into_iter()
        .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
        .collect();
    match polygons.len() {
        0 => Err(GeometryParseError::Empty),
        1 => Ok(Geometry::Polygon(polygons.remove(0))),
        _ => Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons))),
    }
}

fn arrays(value: &Value) -> Result<&Vec<Value>, GeometryParseError> {
    value
        .as_array()
        .ok_or_else(|| GeometryParseError::unsupported("expected an array of coordinate arrays"))
}

fn positions(value: &Value) -> Result<Vec<Coord<f64>>, GeometryParseError> {
    arrays(value)?.iter().map(position).collect()
}

fn position(value: &Value) -> Result<Coord<f64>, GeometryParseError> {
    match value.as_array().map(Vec::as_slice) {
        Some([x, y, ..]) => Ok(Coord {
            x: number(x)?,
            y: number(y)?,
        }),
        _ => Err(GeometryParseError::invalid_coordinate(value.to_string())),
    }
}

fn number(value: &Value) -> Result<f64, GeometryParseError> {
    value
        .as_f64()
        .filter(|number| number.is_finite())
        .ok_or_else(|| GeometryParseError::invalid_coordinate(value.to_string()))
}
