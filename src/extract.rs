use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use geojson::{GeoJson, Geometry as GeoJsonGeometry, Position, Value as GeoJsonValue};
use serde_json::Value;

use crate::error::{Result, SimplifyError};

// Normalize the three top-level GeoJSON shapes into a flat list of geometries,
// preserving document order.
pub fn extract_geometries(document: Value) -> Result<Vec<Geometry<f64>>> {
    println!("Extracting geometries...");
    let geojson = GeoJson::from_json_value(document)?;

    let geometries = match geojson {
        GeoJson::FeatureCollection(fc) => {
            let mut geometries = Vec::with_capacity(fc.features.len());
            for (index, feature) in fc.features.into_iter().enumerate() {
                let geometry = feature.geometry.ok_or_else(|| {
                    SimplifyError::Geometry(format!("feature {} has no geometry", index))
                })?;
                geometries.push(geometry_from_geojson(&geometry)?);
            }
            geometries
        }
        GeoJson::Feature(feature) => {
            let geometry = feature
                .geometry
                .ok_or_else(|| SimplifyError::Geometry("feature has no geometry".to_string()))?;
            vec![geometry_from_geojson(&geometry)?]
        }
        GeoJson::Geometry(geometry) => vec![geometry_from_geojson(&geometry)?],
    };

    println!("Found {} initial geometries", geometries.len());
    Ok(geometries)
}

pub fn geometry_from_geojson(geometry: &GeoJsonGeometry) -> Result<Geometry<f64>> {
    convert_value(&geometry.value)
}

fn convert_value(value: &GeoJsonValue) -> Result<Geometry<f64>> {
    let geometry = match value {
        GeoJsonValue::Point(position) => Geometry::Point(Point::from(to_coord(position)?)),
        GeoJsonValue::MultiPoint(positions) => Geometry::MultiPoint(MultiPoint::new(
            positions
                .iter()
                .map(|p| to_coord(p).map(Point::from))
                .collect::<Result<_>>()?,
        )),
        GeoJsonValue::LineString(coords) => Geometry::LineString(to_line_string(coords)?),
        GeoJsonValue::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString::new(
            lines
                .iter()
                .map(|line| to_line_string(line))
                .collect::<Result<_>>()?,
        )),
        GeoJsonValue::Polygon(rings) => Geometry::Polygon(to_polygon(rings)?),
        GeoJsonValue::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon::new(
            polygons
                .iter()
                .map(|rings| to_polygon(rings))
                .collect::<Result<_>>()?,
        )),
        GeoJsonValue::GeometryCollection(members) => {
            Geometry::GeometryCollection(GeometryCollection::new_from(
                members
                    .iter()
                    .map(geometry_from_geojson)
                    .collect::<Result<_>>()?,
            ))
        }
    };
    Ok(geometry)
}

fn to_coord(position: &Position) -> Result<Coord<f64>> {
    if position.len() < 2 {
        return Err(SimplifyError::Geometry(format!(
            "position needs at least 2 ordinates, got {}",
            position.len()
        )));
    }
    let (x, y) = (position[0], position[1]);
    if !x.is_finite() || !y.is_finite() {
        return Err(SimplifyError::Geometry(format!(
            "non-finite coordinate ({}, {})",
            x, y
        )));
    }
    Ok(Coord { x, y })
}

fn to_line_string(coords: &[Position]) -> Result<LineString<f64>> {
    let points = coords.iter().map(to_coord).collect::<Result<Vec<_>>>()?;
    Ok(LineString::new(points))
}

fn to_ring(coords: &[Position]) -> Result<LineString<f64>> {
    let ring = to_line_string(coords)?;
    if ring.0.len() < 4 {
        return Err(SimplifyError::Geometry(format!(
            "polygon ring needs at least 4 positions, got {}",
            ring.0.len()
        )));
    }
    if !ring.is_closed() {
        return Err(SimplifyError::Geometry("polygon ring is not closed".to_string()));
    }
    Ok(ring)
}

fn to_polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>> {
    let (exterior, holes) = rings
        .split_first()
        .ok_or_else(|| SimplifyError::Geometry("polygon has no rings".to_string()))?;
    let exterior = to_ring(exterior)?;
    let holes = holes
        .iter()
        .map(|ring| to_ring(ring))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, holes))
}

// Split multi-polygons into their member polygons and drop everything that
// has no area to compete with.
pub fn explode_polygons(geometries: Vec<Geometry<f64>>) -> Vec<Geometry<f64>> {
    let mut polygons = Vec::new();
    for geometry in geometries {
        match geometry {
            Geometry::MultiPolygon(multi) => {
                println!("Exploded MultiPolygon into {} polygons", multi.0.len());
                polygons.extend(multi.0.into_iter().map(Geometry::Polygon));
            }
            Geometry::Polygon(polygon) => polygons.push(Geometry::Polygon(polygon)),
            _ => {}
        }
    }
    println!("Total polygons: {}", polygons.len());
    polygons
}
