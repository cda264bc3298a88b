//! Configuration d'un run de conversion

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// Pseudo-champ géométrique, toujours présent dans la sélection
///
/// L'outil d'origine l'ajoutait systématiquement à la liste de champs;
/// le CLI fait de même.
pub const GEOMETRY_FIELD: &str = "SHAPE@XY";

/// Erreurs de validation d'une requête de conversion
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Field selection is empty")]
    EmptyFields,

    #[error("Field selection must include the geometry field {}", GEOMETRY_FIELD)]
    MissingGeometryField,

    #[error("Output name '{0}' must not be empty or contain path separators")]
    BadOutputName(String),

    #[error("Source dataset path is empty")]
    MissingSource,
}

/// Requête de conversion (surface paramètre de l'outil)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionRequest {
    /// Chemin du jeu de données source (.shp)
    pub source: PathBuf,

    /// Champs à conserver, dans l'ordre (doit contenir `SHAPE@XY`)
    pub fields: Vec<String>,

    /// Répertoire de sortie
    pub output_dir: PathBuf,

    /// Nom de base des fichiers produits
    pub output_name: String,

    /// Reprojeter vers WGS 84
    #[serde(default)]
    pub to_wgs84: bool,

    /// Produire un GeoJSON
    #[serde(default)]
    pub geojson: bool,

    /// Produire un KMZ
    #[serde(default)]
    pub kmz: bool,

    /// Produire un CSV (géométries ponctuelles uniquement)
    #[serde(default)]
    pub csv: bool,

    /// Produire un README.md de métadonnées
    #[serde(default)]
    pub metadata: bool,

    /// Messages de diagnostic supplémentaires
    #[serde(default)]
    pub debug: bool,
}

impl ConversionRequest {
    /// Charge une requête depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read request file: {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse request JSON")
    }

    /// Valide les invariants de la requête
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.source.as_os_str().is_empty() {
            return Err(RequestError::MissingSource);
        }
        if self.fields.is_empty() {
            return Err(RequestError::EmptyFields);
        }
        if !self.fields.iter().any(|f| f == GEOMETRY_FIELD) {
            return Err(RequestError::MissingGeometryField);
        }
        if self.output_name.is_empty()
            || self.output_name.contains('/')
            || self.output_name.contains('\\')
        {
            return Err(RequestError::BadOutputName(self.output_name.clone()));
        }
        Ok(())
    }

    /// Répertoire du bundle shapefile final
    pub fn shapefile_dir(&self) -> PathBuf {
        self.output_dir.join("shapefile")
    }

    /// Répertoire de travail temporaire
    pub fn temp_dir(&self) -> PathBuf {
        self.shapefile_dir().join("temp")
    }

    /// Shapefile temporaire (copie filtrée avant placement)
    pub fn temp_shapefile(&self) -> PathBuf {
        self.temp_dir().join(format!("{}.shp", self.output_name))
    }

    /// Shapefile final
    pub fn final_shapefile(&self) -> PathBuf {
        self.shapefile_dir()
            .join(format!("{}.shp", self.output_name))
    }

    /// Chemin d'un fichier de sortie (`<output_dir>/<name>.<ext>`)
    pub fn output_path(&self, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.output_name, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ConversionRequest {
        ConversionRequest {
            source: PathBuf::from("/data/parcels.shp"),
            fields: vec!["name".to_string(), GEOMETRY_FIELD.to_string()],
            output_dir: PathBuf::from("/data/out"),
            output_name: "parcels".to_string(),
            to_wgs84: false,
            geojson: false,
            kmz: false,
            csv: false,
            metadata: false,
            debug: false,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_empty_fields() {
        let mut req = request();
        req.fields.clear();
        assert_eq!(req.validate(), Err(RequestError::EmptyFields));
    }

    #[test]
    fn test_missing_geometry_field() {
        let mut req = request();
        req.fields = vec!["name".to_string()];
        assert_eq!(req.validate(), Err(RequestError::MissingGeometryField));
    }

    #[test]
    fn test_bad_output_name() {
        let mut req = request();
        req.output_name = "a/b".to_string();
        assert!(matches!(
            req.validate(),
            Err(RequestError::BadOutputName(_))
        ));
    }

    #[test]
    fn test_paths() {
        let req = request();
        assert_eq!(
            req.final_shapefile(),
            PathBuf::from("/data/out/shapefile/parcels.shp")
        );
        assert_eq!(
            req.temp_shapefile(),
            PathBuf::from("/data/out/shapefile/temp/parcels.shp")
        );
        assert_eq!(req.output_path("zip"), PathBuf::from("/data/out/parcels.zip"));
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(
            &path,
            r#"{
                "source": "/data/parcels.shp",
                "fields": ["name", "SHAPE@XY"],
                "output_dir": "/data/out",
                "output_name": "parcels",
                "geojson": true
            }"#,
        )
        .unwrap();

        let req = ConversionRequest::load(&path).unwrap();
        assert!(req.geojson);
        assert!(!req.kmz);
        assert!(req.validate().is_ok());
    }
}
