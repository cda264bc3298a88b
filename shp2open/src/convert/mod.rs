//! Convertisseurs de formats ouverts (zip, GeoJSON, KMZ, CSV, Markdown)
//!
//! [`Export`] regroupe les conversions opérant sur le shapefile final
//! d'un run: archive zip du bundle, KMZ, CSV (géométries ponctuelles)
//! et fiche de métadonnées Markdown. L'export GeoJSON est une fonction
//! libre, [`geojson::to_open`].

pub mod archive;
pub mod csv;
pub mod geojson;
pub mod kml;
pub mod markdown;

use std::path::PathBuf;

use crate::error::Shp2OpenError;

/// Conversions de formats depuis le shapefile produit par un run
///
/// Construit depuis le répertoire de sortie et le nom de base; le
/// shapefile est attendu dans `<output_dir>/shapefile/<name>.shp`.
pub struct Export {
    output_dir: PathBuf,
    output_name: String,
    debug: bool,
}

impl Export {
    pub fn new(output_dir: impl Into<PathBuf>, output_name: impl Into<String>, debug: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            output_name: output_name.into(),
            debug,
        }
    }

    /// Chemin du shapefile final du run
    pub fn shapefile_path(&self) -> PathBuf {
        self.output_dir
            .join("shapefile")
            .join(format!("{}.shp", self.output_name))
    }

    fn output_path(&self, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.output_name, extension))
    }

    /// Compresse le bundle shapefile en `<name>.zip`
    pub fn zip(&self) -> Result<(), Shp2OpenError> {
        archive::zip_bundle(
            &self.shapefile_path(),
            &self.output_path("zip"),
            self.debug,
        )
    }

    /// Convertit en `<name>.kmz` (document KML zippé)
    pub fn kmz(&self) -> Result<(), Shp2OpenError> {
        kml::export_kmz(&self.shapefile_path(), &self.output_path("kmz"))
    }

    /// Convertit en `<name>.csv` (géométries ponctuelles uniquement)
    pub fn csv(&self) -> Result<(), Shp2OpenError> {
        self::csv::export_csv(&self.shapefile_path(), &self.output_path("csv"))
    }

    /// Écrit les métadonnées du jeu dans `README.md`
    pub fn md(&self) -> Result<(), Shp2OpenError> {
        markdown::export_markdown(
            &self.shapefile_path(),
            &self.output_name,
            &self.output_dir.join("README.md"),
        )
    }
}
