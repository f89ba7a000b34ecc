use std::path::PathBuf;

pub mod error;
pub mod extract;
pub mod loader;
pub mod selector;
pub mod simplify;
pub mod writer;

pub use error::{Result, SimplifyError};

pub const DEFAULT_INPUT: &str = "aklshp/akl_shape.geojson";
pub const DEFAULT_OUTPUT: &str = "aklshp/akl_mainland_only.geojson";
// Degrees, roughly 10 m on the ground at mid latitudes.
pub const DEFAULT_TOLERANCE: f64 = 0.0001;
pub const DEFAULT_TOP: usize = 5;
pub const DEFAULT_MAX_SIZE_MB: f64 = 5.0;

pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub tolerance: f64,
    pub explode: bool,
    pub name: Option<String>,
    pub top: usize,
    pub max_size_mb: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            tolerance: DEFAULT_TOLERANCE,
            explode: false,
            name: None,
            top: DEFAULT_TOP,
            max_size_mb: DEFAULT_MAX_SIZE_MB,
        }
    }
}

#[derive(Debug)]
pub struct Report {
    pub geometry_count: usize,
    pub selected_index: usize,
    pub selected_area: f64,
    pub geom_type: &'static str,
    pub vertices_before: Option<usize>,
    pub vertices_after: Option<usize>,
    pub total_vertices_before: usize,
    pub total_vertices_after: usize,
    pub bytes_written: u64,
}

fn describe(count: Option<usize>) -> String {
    count.map_or_else(|| "unknown".to_string(), |n| n.to_string())
}

// Load, pick the largest geometry, simplify it and save it as a single feature.
// Nothing is written unless every earlier stage succeeds.
pub fn run(config: &Config) -> Result<Report> {
    let document = loader::load_document(&config.input)?;

    let mut geometries = extract::extract_geometries(document)?;
    if config.explode {
        geometries = extract::explode_polygons(geometries);
    }
    let geometry_count = geometries.len();

    let ranked = selector::rank_by_area(&geometries, config.top);
    if !ranked.is_empty() {
        println!("\nTop {} largest geometries:", ranked.len());
        for (rank, (index, area)) in ranked.iter().enumerate() {
            println!("  {}. #{} Area: {:.8} sq degrees", rank + 1, index, area);
        }
    }

    let selection = selector::select_largest(geometries)?;
    let geom_type = selector::geom_type(&selection.geometry);
    println!(
        "\nSelected largest geometry: {} with area {:.6} sq degrees",
        geom_type, selection.area
    );

    println!("Simplifying with tolerance {}...", config.tolerance);
    let simplified = simplify::simplify_preserve_topology(&selection.geometry, config.tolerance);

    let vertices_before = selector::exterior_vertex_count(&selection.geometry);
    let vertices_after = selector::exterior_vertex_count(&simplified);
    println!("Original vertices: {}", describe(vertices_before));
    println!("Simplified vertices: {}", describe(vertices_after));
    let total_vertices_before = simplify::vertex_count(&selection.geometry);
    let total_vertices_after = simplify::vertex_count(&simplified);
    println!(
        "Total vertices (all rings and parts): {} -> {}",
        total_vertices_before, total_vertices_after
    );

    let feature = writer::output_feature(&simplified, config.name.as_deref());
    println!("\nSaving simplified geometry to {}...", config.output.display());
    let bytes_written = writer::write_feature(&config.output, &feature)?;

    let size_mb = bytes_written as f64 / (1024.0 * 1024.0);
    println!("File size: {:.2} MB", size_mb);
    if size_mb > config.max_size_mb {
        println!(
            "WARNING: File is still larger than {:.2} MB. Consider increasing tolerance to 0.0005 or 0.001",
            config.max_size_mb
        );
    }

    println!("\nDone! Saved to {}", config.output.display());

    Ok(Report {
        geometry_count,
        selected_index: selection.index,
        selected_area: selection.area,
        geom_type,
        vertices_before,
        vertices_after,
        total_vertices_before,
        total_vertices_after,
        bytes_written,
    })
}
