use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geo::{Geometry, LineString, Polygon};
use geojson::{Feature, Geometry as GeoJsonGeometry, JsonObject, Value as GeoJsonValue};
use serde_json::Value;

use crate::error::{Result, SimplifyError};

fn line_coords(line: &LineString<f64>) -> Vec<Vec<f64>> {
    line.coords().map(|c| vec![c.x, c.y]).collect()
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    let mut rings = vec![line_coords(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(line_coords));
    rings
}

pub fn to_geojson_geometry(geometry: &Geometry<f64>) -> GeoJsonGeometry {
    let value = match geometry {
        Geometry::Point(point) => GeoJsonValue::Point(vec![point.x(), point.y()]),
        Geometry::Line(line) => GeoJsonValue::LineString(vec![
            vec![line.start.x, line.start.y],
            vec![line.end.x, line.end.y],
        ]),
        Geometry::LineString(line) => GeoJsonValue::LineString(line_coords(line)),
        Geometry::Polygon(polygon) => GeoJsonValue::Polygon(polygon_rings(polygon)),
        Geometry::MultiPoint(multi) => {
            GeoJsonValue::MultiPoint(multi.0.iter().map(|p| vec![p.x(), p.y()]).collect())
        }
        Geometry::MultiLineString(multi) => {
            GeoJsonValue::MultiLineString(multi.0.iter().map(line_coords).collect())
        }
        Geometry::MultiPolygon(multi) => {
            GeoJsonValue::MultiPolygon(multi.0.iter().map(polygon_rings).collect())
        }
        Geometry::GeometryCollection(collection) => GeoJsonValue::GeometryCollection(
            collection.0.iter().map(to_geojson_geometry).collect(),
        ),
        Geometry::Rect(rect) => GeoJsonValue::Polygon(polygon_rings(&rect.to_polygon())),
        Geometry::Triangle(triangle) => GeoJsonValue::Polygon(polygon_rings(&triangle.to_polygon())),
    };
    GeoJsonGeometry::new(value)
}

// Wrap a geometry into the output feature. Properties stay empty unless a
// name is given.
pub fn output_feature(geometry: &Geometry<f64>, name: Option<&str>) -> Feature {
    let mut properties = JsonObject::new();
    if let Some(name) = name {
        properties.insert("name".to_string(), Value::String(name.to_string()));
    }

    Feature {
        bbox: None,
        geometry: Some(to_geojson_geometry(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

// Compact JSON, overwriting whatever is at `path`. Returns the bytes written.
pub fn write_feature(path: &Path, feature: &Feature) -> Result<u64> {
    let io_error = |source: std::io::Error| SimplifyError::Io {
        path: path.to_path_buf(),
        source,
    };

    let bytes = serde_json::to_vec(feature).map_err(|e| io_error(e.into()))?;
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes).map_err(io_error)?;
    writer.flush().map_err(io_error)?;

    Ok(bytes.len() as u64)
}
