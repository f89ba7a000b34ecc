use geo::{Area, Geometry};

use crate::error::{Result, SimplifyError};

pub struct Selection {
    pub index: usize,
    pub area: f64,
    pub geometry: Geometry<f64>,
}

// Single pass max-scan. Strict `>` means the first of several equal maxima wins.
pub fn select_largest(geometries: Vec<Geometry<f64>>) -> Result<Selection> {
    let mut best: Option<Selection> = None;

    for (index, geometry) in geometries.into_iter().enumerate() {
        let area = geometry.unsigned_area();
        let replace = match &best {
            Some(current) => area > current.area,
            None => true,
        };
        if replace {
            best = Some(Selection { index, area, geometry });
        }
    }

    best.ok_or(SimplifyError::EmptyInput)
}

/// Indices and areas of the `n` largest geometries, largest first.
/// Equal areas keep their original order.
pub fn rank_by_area(geometries: &[Geometry<f64>], n: usize) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = geometries
        .iter()
        .map(|g| g.unsigned_area())
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    ranked
}

pub fn geom_type(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

// Only simple polygons expose an exterior ring to count.
pub fn exterior_vertex_count(geometry: &Geometry<f64>) -> Option<usize> {
    match geometry {
        Geometry::Polygon(polygon) => Some(polygon.exterior().0.len()),
        _ => None,
    }
}
