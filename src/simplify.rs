use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{
    BoundingRect, Contains, Coord, EuclideanDistance, Geometry, GeometryCollection, Line,
    LineString, MultiLineString, MultiPolygon, Point, Polygon,
};
use rstar::{RTree, RTreeObject, AABB};

/// Douglas-Peucker simplification that refuses any shortcut which would cross
/// another segment of the same geometry or sweep another ring or line to the
/// other side of it.
///
/// Every line and ring of `geometry` is simplified against a shared segment
/// index, so holes cannot be cut by their shell and members of a
/// multi-geometry cannot be pushed through each other. Rings never drop
/// below 4 positions and open lines below 2. Line endpoints, including the
/// start/close vertex of rings, are always kept.
pub fn simplify_preserve_topology(geometry: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    if !(tolerance.is_finite() && tolerance > 0.0) {
        return geometry.clone();
    }

    let mut lines = Vec::new();
    collect_lines(geometry, &mut lines);

    let mut simplifier = TopologySimplifier::new(lines, tolerance);
    simplifier.simplify();

    let mut rebuilder = Rebuilder {
        lines: simplifier.into_results(),
        cursor: 0,
    };
    rebuilder.rebuild(geometry)
}

struct TaggedLine {
    coords: Vec<Coord<f64>>,
    min_size: usize,
    kept: Vec<bool>,
    result_size: usize,
}

impl TaggedLine {
    fn new(line: &LineString<f64>, is_ring: bool) -> Self {
        let coords = line.0.clone();
        let min_size = if is_ring || line.is_closed() { 4 } else { 2 };
        let len = coords.len();
        TaggedLine {
            coords,
            min_size,
            kept: vec![true; len],
            result_size: len,
        }
    }
}

// A segment of line `line` spanning vertices `from..=to`. Input segments
// always have `to == from + 1`; output shortcuts may span more.
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexedSegment {
    line: usize,
    from: usize,
    to: usize,
    start: Coord<f64>,
    end: Coord<f64>,
}

impl IndexedSegment {
    fn as_line(&self) -> Line<f64> {
        Line::new(self.start, self.end)
    }
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.start.x, self.start.y], [self.end.x, self.end.y])
    }
}

struct TopologySimplifier {
    lines: Vec<TaggedLine>,
    input_index: RTree<IndexedSegment>,
    output_index: RTree<IndexedSegment>,
    tolerance: f64,
}

impl TopologySimplifier {
    fn new(lines: Vec<TaggedLine>, tolerance: f64) -> Self {
        let mut segments = Vec::new();
        for (line_idx, line) in lines.iter().enumerate() {
            for (from, pair) in line.coords.windows(2).enumerate() {
                segments.push(IndexedSegment {
                    line: line_idx,
                    from,
                    to: from + 1,
                    start: pair[0],
                    end: pair[1],
                });
            }
        }

        TopologySimplifier {
            lines,
            input_index: RTree::bulk_load(segments),
            output_index: RTree::new(),
            tolerance,
        }
    }

    fn simplify(&mut self) {
        for line_idx in 0..self.lines.len() {
            let len = self.lines[line_idx].coords.len();
            if len < 2 {
                continue;
            }

            // Explicit stack instead of recursion; long coastlines can nest deeply.
            // Right half is pushed first so sections are visited left to right.
            let mut sections = vec![(0, len - 1)];
            while let Some((i, j)) = sections.pop() {
                if let Some(split) = self.simplify_section(line_idx, i, j) {
                    sections.push((split, j));
                    sections.push((i, split));
                }
            }
        }
    }

    // Returns the split vertex when the section cannot be replaced by a
    // single segment.
    fn simplify_section(&mut self, line_idx: usize, i: usize, j: usize) -> Option<usize> {
        let line = &self.lines[line_idx];
        let start = line.coords[i];
        let end = line.coords[j];

        if j == i + 1 {
            self.output_index.insert(IndexedSegment {
                line: line_idx,
                from: i,
                to: j,
                start,
                end,
            });
            return None;
        }

        let candidate = Line::new(start, end);
        let (split, distance) = furthest_vertex(&line.coords, i, j, &candidate);

        let removed = j - i - 1;
        let mut valid = line.result_size - removed >= line.min_size;
        valid = valid && distance <= self.tolerance;
        valid = valid && !self.has_bad_intersection(line_idx, i, j, &candidate);
        valid = valid && !self.has_jumped_component(line_idx, i, j);

        if !valid {
            return Some(split);
        }

        self.flatten(line_idx, i, j);
        None
    }

    fn flatten(&mut self, line_idx: usize, i: usize, j: usize) {
        let line = &mut self.lines[line_idx];
        for k in i + 1..j {
            line.kept[k] = false;
        }
        line.result_size -= j - i - 1;

        for k in i..j {
            let segment = IndexedSegment {
                line: line_idx,
                from: k,
                to: k + 1,
                start: line.coords[k],
                end: line.coords[k + 1],
            };
            self.input_index.remove(&segment);
        }

        self.output_index.insert(IndexedSegment {
            line: line_idx,
            from: i,
            to: j,
            start: line.coords[i],
            end: line.coords[j],
        });
    }

    fn has_bad_intersection(&self, line_idx: usize, i: usize, j: usize, candidate: &Line<f64>) -> bool {
        let envelope = AABB::from_corners(
            [candidate.start.x, candidate.start.y],
            [candidate.end.x, candidate.end.y],
        );

        let output_hit = self
            .output_index
            .locate_in_envelope_intersecting(&envelope)
            .any(|segment| has_interior_intersection(&segment.as_line(), candidate));
        if output_hit {
            return true;
        }

        self.input_index
            .locate_in_envelope_intersecting(&envelope)
            .filter(|segment| !(segment.line == line_idx && segment.from >= i && segment.from < j))
            .any(|segment| has_interior_intersection(&segment.as_line(), candidate))
    }

    // A ring or line lying wholly between the section and its shortcut crosses
    // nothing, but flattening would move it to the other side. Any of its
    // segments overlaps the section envelope, and every indexed segment
    // starts at a vertex that is still kept, so testing segment starts
    // against the section region is enough.
    fn has_jumped_component(&self, line_idx: usize, i: usize, j: usize) -> bool {
        let section = LineString::new(self.lines[line_idx].coords[i..=j].to_vec());
        let Some(bounds) = section.bounding_rect() else {
            return false;
        };
        let envelope = AABB::from_corners(
            [bounds.min().x, bounds.min().y],
            [bounds.max().x, bounds.max().y],
        );
        let region = Polygon::new(section, vec![]);

        self.input_index
            .locate_in_envelope_intersecting(&envelope)
            .chain(self.output_index.locate_in_envelope_intersecting(&envelope))
            .filter(|segment| segment.line != line_idx)
            .any(|segment| region.contains(&Point::from(segment.start)))
    }

    fn into_results(self) -> Vec<Vec<Coord<f64>>> {
        self.lines
            .into_iter()
            .map(|line| {
                line.coords
                    .into_iter()
                    .zip(line.kept)
                    .filter_map(|(coord, kept)| kept.then_some(coord))
                    .collect()
            })
            .collect()
    }
}

fn furthest_vertex(coords: &[Coord<f64>], i: usize, j: usize, segment: &Line<f64>) -> (usize, f64) {
    let mut split = i + 1;
    let mut max_distance = -1.0;
    for k in i + 1..j {
        let distance = Point::from(coords[k]).euclidean_distance(segment);
        if distance > max_distance {
            max_distance = distance;
            split = k;
        }
    }
    (split, max_distance)
}

// Touching at a shared endpoint is allowed; crossing, a vertex landing on
// the other segment's interior, or collinear overlap is not.
fn has_interior_intersection(a: &Line<f64>, b: &Line<f64>) -> bool {
    match line_intersection(*a, *b) {
        None => false,
        Some(LineIntersection::SinglePoint { intersection, .. }) => {
            !(is_endpoint(a, intersection) && is_endpoint(b, intersection))
        }
        Some(LineIntersection::Collinear { intersection }) => intersection.start != intersection.end,
    }
}

fn is_endpoint(line: &Line<f64>, coord: Coord<f64>) -> bool {
    line.start == coord || line.end == coord
}

// Linework is collected and rebuilt in the same traversal order.
fn collect_lines(geometry: &Geometry<f64>, lines: &mut Vec<TaggedLine>) {
    match geometry {
        Geometry::LineString(line) => lines.push(TaggedLine::new(line, false)),
        Geometry::MultiLineString(multi) => {
            for line in &multi.0 {
                lines.push(TaggedLine::new(line, false));
            }
        }
        Geometry::Polygon(polygon) => collect_polygon(polygon, lines),
        Geometry::MultiPolygon(multi) => {
            for polygon in &multi.0 {
                collect_polygon(polygon, lines);
            }
        }
        Geometry::GeometryCollection(collection) => {
            for member in &collection.0 {
                collect_lines(member, lines);
            }
        }
        Geometry::Point(_)
        | Geometry::MultiPoint(_)
        | Geometry::Line(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => {}
    }
}

fn collect_polygon(polygon: &Polygon<f64>, lines: &mut Vec<TaggedLine>) {
    lines.push(TaggedLine::new(polygon.exterior(), true));
    for hole in polygon.interiors() {
        lines.push(TaggedLine::new(hole, true));
    }
}

struct Rebuilder {
    lines: Vec<Vec<Coord<f64>>>,
    cursor: usize,
}

impl Rebuilder {
    fn next_line(&mut self) -> LineString<f64> {
        let coords = std::mem::take(&mut self.lines[self.cursor]);
        self.cursor += 1;
        LineString::new(coords)
    }

    fn rebuild_polygon(&mut self, polygon: &Polygon<f64>) -> Polygon<f64> {
        let exterior = self.next_line();
        let holes = polygon.interiors().iter().map(|_| self.next_line()).collect();
        Polygon::new(exterior, holes)
    }

    fn rebuild(&mut self, geometry: &Geometry<f64>) -> Geometry<f64> {
        match geometry {
            Geometry::LineString(_) => Geometry::LineString(self.next_line()),
            Geometry::MultiLineString(multi) => Geometry::MultiLineString(MultiLineString::new(
                multi.0.iter().map(|_| self.next_line()).collect(),
            )),
            Geometry::Polygon(polygon) => Geometry::Polygon(self.rebuild_polygon(polygon)),
            Geometry::MultiPolygon(multi) => Geometry::MultiPolygon(MultiPolygon::new(
                multi.0.iter().map(|p| self.rebuild_polygon(p)).collect(),
            )),
            Geometry::GeometryCollection(collection) => {
                Geometry::GeometryCollection(GeometryCollection::new_from(
                    collection.0.iter().map(|g| self.rebuild(g)).collect(),
                ))
            }
            other => other.clone(),
        }
    }
}

/// Total number of coordinates across all linework of a geometry.
pub fn vertex_count(geometry: &Geometry<f64>) -> usize {
    match geometry {
        Geometry::Point(_) => 1,
        Geometry::Line(_) => 2,
        Geometry::LineString(line) => line.0.len(),
        Geometry::Polygon(polygon) => polygon_vertex_count(polygon),
        Geometry::MultiPoint(multi) => multi.0.len(),
        Geometry::MultiLineString(multi) => multi.0.iter().map(|l| l.0.len()).sum(),
        Geometry::MultiPolygon(multi) => multi.0.iter().map(polygon_vertex_count).sum(),
        Geometry::GeometryCollection(collection) => collection.0.iter().map(vertex_count).sum(),
        Geometry::Rect(_) => 5,
        Geometry::Triangle(_) => 4,
    }
}

fn polygon_vertex_count(polygon: &Polygon<f64>) -> usize {
    polygon.exterior().0.len() + polygon.interiors().iter().map(|r| r.0.len()).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, EuclideanLength};
    use std::f64::consts::PI;

    fn ring(points: &[(f64, f64)]) -> LineString<f64> {
        LineString::from(points.to_vec())
    }

    fn noisy_circle(n: usize, radius: f64, noise: f64) -> Polygon<f64> {
        let mut points: Vec<(f64, f64)> = (0..n)
            .map(|k| {
                let theta = 2.0 * PI * k as f64 / n as f64;
                let r = radius + noise * (37.0 * theta).sin();
                (r * theta.cos(), r * theta.sin())
            })
            .collect();
        points.push(points[0]);
        Polygon::new(ring(&points), vec![])
    }

    fn rings_of(geometry: &Geometry<f64>) -> Vec<LineString<f64>> {
        match geometry {
            Geometry::Polygon(p) => std::iter::once(p.exterior().clone())
                .chain(p.interiors().iter().cloned())
                .collect(),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    // O(n^2) check that no two non-adjacent segments of a ring meet and
    // adjacent ones do not overlap.
    fn ring_is_simple(ring: &LineString<f64>) -> bool {
        let segments: Vec<Line<f64>> = ring.lines().collect();
        let n = segments.len();
        for a in 0..n {
            for b in a + 1..n {
                let adjacent = b == a + 1 || (a == 0 && b == n - 1);
                match line_intersection(segments[a], segments[b]) {
                    None => {}
                    Some(LineIntersection::Collinear { intersection }) => {
                        if intersection.start != intersection.end {
                            return false;
                        }
                    }
                    Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                    Some(LineIntersection::SinglePoint { .. }) => return false,
                }
            }
        }
        true
    }

    #[test]
    fn removes_vertex_within_tolerance() {
        let polygon = Polygon::new(
            ring(&[(0.0, 0.0), (5.0, -0.3), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        );
        let simplified = simplify_preserve_topology(&Geometry::Polygon(polygon), 0.5);

        let rings = rings_of(&simplified);
        assert_eq!(rings[0].0.len(), 5);
        assert!(!rings[0].0.contains(&Coord { x: 5.0, y: -0.3 }));
    }

    #[test]
    fn keeps_vertex_when_shortcut_would_cut_hole() {
        let polygon = Polygon::new(
            ring(&[(0.0, 0.0), (5.0, -0.3), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![ring(&[(4.9, -0.2), (5.1, -0.2), (5.0, 0.1), (4.9, -0.2)])],
        );
        let simplified = simplify_preserve_topology(&Geometry::Polygon(polygon), 0.5);

        let rings = rings_of(&simplified);
        assert!(rings[0].0.contains(&Coord { x: 5.0, y: -0.3 }));
        assert_eq!(rings[1].0.len(), 4);
    }

    #[test]
    fn keeps_vertex_when_hole_would_end_up_outside_shell() {
        let polygon = Polygon::new(
            ring(&[(0.0, 0.0), (5.0, -0.3), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![ring(&[(4.9, -0.2), (5.1, -0.2), (5.0, -0.1), (4.9, -0.2)])],
        );
        let simplified = simplify_preserve_topology(&Geometry::Polygon(polygon), 0.5);

        match simplified {
            Geometry::Polygon(result) => {
                assert!(result.exterior().0.contains(&Coord { x: 5.0, y: -0.3 }));
                let shell = Polygon::new(result.exterior().clone(), vec![]);
                for coord in &result.interiors()[0].0 {
                    assert!(shell.contains(&Point::from(*coord)), "hole vertex {:?} outside shell", coord);
                }
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn keeps_dent_when_neighbouring_island_would_be_swallowed() {
        let shell = Polygon::new(
            ring(&[(0.0, 0.0), (5.0, 0.3), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        );
        let island = Polygon::new(
            ring(&[(4.9, 0.1), (5.1, 0.1), (5.0, 0.2), (4.9, 0.1)]),
            vec![],
        );
        let multi = Geometry::MultiPolygon(MultiPolygon::new(vec![shell, island]));

        match simplify_preserve_topology(&multi, 0.5) {
            Geometry::MultiPolygon(result) => {
                assert!(result.0[0].exterior().0.contains(&Coord { x: 5.0, y: 0.3 }));
                assert!(!result.0[0].contains(&Point::new(5.0, 0.15)));
                assert_eq!(result.0[1].exterior().0.len(), 4);
            }
            other => panic!("expected multipolygon, got {:?}", other),
        }
    }

    #[test]
    fn distant_island_does_not_block_simplification() {
        let shell = Polygon::new(
            ring(&[(0.0, 0.0), (5.0, 0.3), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        );
        let island = Polygon::new(
            ring(&[(4.9, -1.0), (5.1, -1.0), (5.0, -0.8), (4.9, -1.0)]),
            vec![],
        );
        let multi = Geometry::MultiPolygon(MultiPolygon::new(vec![shell, island]));

        match simplify_preserve_topology(&multi, 0.5) {
            Geometry::MultiPolygon(result) => assert_eq!(result.0[0].exterior().0.len(), 5),
            other => panic!("expected multipolygon, got {:?}", other),
        }
    }

    #[test]
    fn rings_keep_minimum_size() {
        let triangle = Polygon::new(ring(&[(0.0, 0.0), (1.0, 0.0), (0.5, 0.01), (0.0, 0.0)]), vec![]);
        let simplified = simplify_preserve_topology(&Geometry::Polygon(triangle), 10.0);

        let rings = rings_of(&simplified);
        assert_eq!(rings[0].0.len(), 4);
        assert!(rings[0].is_closed());
    }

    #[test]
    fn open_line_collapses_to_endpoints() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 0.001), (2.0, 0.0)]));
        match simplify_preserve_topology(&line, 0.01) {
            Geometry::LineString(l) => assert_eq!(l.0, vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 0.0 }]),
            other => panic!("expected line string, got {:?}", other),
        }
    }

    #[test]
    fn non_positive_tolerance_is_identity() {
        let circle = Geometry::Polygon(noisy_circle(100, 1.0, 0.0001));
        assert_eq!(simplify_preserve_topology(&circle, 0.0), circle);
        assert_eq!(simplify_preserve_topology(&circle, f64::NAN), circle);
    }

    #[test]
    fn second_pass_does_not_grow_and_stays_simple() {
        let circle = Geometry::Polygon(noisy_circle(720, 1.0, 0.002));
        let first = simplify_preserve_topology(&circle, 0.01);
        let second = simplify_preserve_topology(&first, 0.01);

        assert!(vertex_count(&first) < vertex_count(&circle));
        assert!(vertex_count(&second) <= vertex_count(&first));
        for r in rings_of(&second) {
            assert!(r.is_closed());
            assert!(ring_is_simple(&r));
        }
    }

    #[test]
    fn area_change_is_bounded_by_tolerance_times_perimeter() {
        let polygon = noisy_circle(720, 1.0, 0.002);
        let perimeter = polygon.exterior().euclidean_length();
        let tolerance = 0.01;

        let original = Geometry::Polygon(polygon);
        let simplified = simplify_preserve_topology(&original, tolerance);

        let delta = (simplified.unsigned_area() - original.unsigned_area()).abs();
        assert!(delta <= tolerance * perimeter, "area moved by {}", delta);
    }

    #[test]
    fn multipolygon_members_are_simplified_together() {
        let a = noisy_circle(200, 1.0, 0.001);
        let b = Polygon::new(
            ring(&[(3.0, 0.0), (4.0, 0.0), (4.0, 1.0), (3.5, 1.0001), (3.0, 1.0), (3.0, 0.0)]),
            vec![],
        );
        let multi = Geometry::MultiPolygon(MultiPolygon::new(vec![a, b]));
        match simplify_preserve_topology(&multi, 0.01) {
            Geometry::MultiPolygon(result) => {
                assert_eq!(result.0.len(), 2);
                assert_eq!(result.0[1].exterior().0.len(), 5);
            }
            other => panic!("expected multipolygon, got {:?}", other),
        }
    }

    #[test]
    fn points_pass_through() {
        let point = Geometry::Point(Point::new(1.0, 2.0));
        assert_eq!(simplify_preserve_topology(&point, 1.0), point);
    }
}
