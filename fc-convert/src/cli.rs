//! Définition et implémentation de la commande CLI
//!
//! La surface paramètre de l'outil d'origine (couche source, sélection
//! de champs, répertoire et nom de sortie, cinq bascules) devient une
//! commande unique; la requête complète peut aussi être chargée depuis
//! un fichier JSON avec `--request`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use shp2open::{DatasetInfo, ShapefileRuntime, VectorRuntime};

use crate::config::{ConversionRequest, GEOMETRY_FIELD};
use crate::pipeline;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the source shapefile (.shp)
    #[arg(short, long, required_unless_present = "request")]
    input: Option<PathBuf>,

    /// Fields to keep, comma separated (the geometry field is added
    /// automatically)
    #[arg(short, long, value_delimiter = ',', required_unless_present = "request")]
    fields: Vec<String>,

    /// Output directory
    #[arg(short, long, required_unless_present = "request")]
    output: Option<PathBuf>,

    /// Output base filename
    #[arg(short, long, required_unless_present = "request")]
    name: Option<String>,

    /// Reproject to WGS84 (assumes the fixed source reference, see docs)
    #[arg(long)]
    wgs84: bool,

    /// Convert to GeoJSON
    #[arg(long)]
    geojson: bool,

    /// Convert to KMZ
    #[arg(long)]
    kmz: bool,

    /// Convert to CSV (Point and MultiPoint sources only)
    #[arg(long)]
    csv: bool,

    /// Write dataset metadata to README.md
    #[arg(long)]
    metadata: bool,

    /// Extra diagnostic messages
    #[arg(long)]
    debug: bool,

    /// Load the whole request from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["input", "fields", "output", "name"])]
    request: Option<PathBuf>,
}

/// Exécute la commande de conversion
pub fn cmd_convert(args: ConvertArgs) -> Result<()> {
    let mut request = build_request(args)?;
    request.validate()?;

    let runtime = ShapefileRuntime::new();
    let info = runtime
        .describe(&request.source)
        .context("Failed to describe the source dataset")?;

    // Affordance de l'interface: le CSV n'est proposé que pour les
    // géométries ponctuelles (il serait grisé dans la toolbox)
    if request.csv && !csv_supported(&info) {
        warn!(
            geometry = %info.geometry,
            "CSV export is only available for Point and MultiPoint sources, skipping"
        );
        request.csv = false;
    }

    println!("=== Convert {} ===", request.output_name);
    println!("Source: {}", request.source.display());
    println!("Geometry: {}", info.geometry);
    println!("Features: {}", info.feature_count);
    println!("Output: {}", request.output_dir.display());
    println!("Reproject to WGS84: {}", request.to_wgs84);

    let report = pipeline::run(&runtime, &request)?;
    report.print_summary();
    Ok(())
}

/// Vrai si la source est éligible à l'export CSV
pub fn csv_supported(info: &DatasetInfo) -> bool {
    info.geometry.is_point_like()
}

fn build_request(args: ConvertArgs) -> Result<ConversionRequest> {
    if let Some(path) = &args.request {
        return ConversionRequest::load(path);
    }

    let mut fields = args.fields;
    if !fields.iter().any(|f| f == GEOMETRY_FIELD) {
        fields.push(GEOMETRY_FIELD.to_string());
    }

    Ok(ConversionRequest {
        source: args.input.context("--input is required")?,
        fields,
        output_dir: args.output.context("--output is required")?,
        output_name: args.name.context("--name is required")?,
        to_wgs84: args.wgs84,
        geojson: args.geojson,
        kmz: args.kmz,
        csv: args.csv,
        metadata: args.metadata,
        debug: args.debug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shp2open::{GeometryKind, Shp2OpenError};
    use std::path::Path;

    /// Runtime factice dont le describe renvoie un type fixé
    struct StubSource(GeometryKind);

    impl VectorRuntime for StubSource {
        fn describe(&self, _dataset: &Path) -> Result<DatasetInfo, Shp2OpenError> {
            Ok(DatasetInfo {
                geometry: self.0,
                fields: vec![],
                feature_count: 0,
            })
        }

        fn make_layer(
            &self,
            _dataset: &Path,
            _name: &str,
            _fields: &[String],
        ) -> Result<(), Shp2OpenError> {
            unimplemented!("not used by these tests")
        }

        fn delete_layer(&self, name: &str) -> Result<(), Shp2OpenError> {
            Err(Shp2OpenError::NoSuchLayer(name.to_string()))
        }

        fn copy_features(&self, _layer: &str, _dest: &Path) -> Result<(), Shp2OpenError> {
            unimplemented!("not used by these tests")
        }

        fn project(
            &self,
            _src: &Path,
            _dest: &Path,
            _source_epsg: u32,
            _target_epsg: u32,
        ) -> Result<(), Shp2OpenError> {
            unimplemented!("not used by these tests")
        }

        fn export_to_dir(&self, _src: &Path, _dest_dir: &Path) -> Result<(), Shp2OpenError> {
            unimplemented!("not used by these tests")
        }
    }

    #[test]
    fn test_csv_disabled_for_polygon_sources() {
        let runtime = StubSource(GeometryKind::Polygon);
        let info = runtime.describe(Path::new("areas.shp")).unwrap();
        assert!(!csv_supported(&info));
    }

    #[test]
    fn test_csv_enabled_for_point_sources() {
        let runtime = StubSource(GeometryKind::Point);
        let info = runtime.describe(Path::new("wells.shp")).unwrap();
        assert!(csv_supported(&info));

        let runtime = StubSource(GeometryKind::MultiPoint);
        let info = runtime.describe(Path::new("trees.shp")).unwrap();
        assert!(csv_supported(&info));
    }
}
