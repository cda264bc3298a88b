//! Types d'erreurs pour le crate shp2open

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture, l'écriture ou la
/// conversion d'un shapefile
#[derive(Debug, Error)]
pub enum Shp2OpenError {
    /// Erreur d'I/O sur un fichier du bundle
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur du lecteur/écrivain shapefile
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// Erreur de la table attributaire (.dbf)
    #[error("Attribute table error: {0}")]
    Dbase(#[from] shapefile::dbase::Error),

    /// Erreur d'écriture d'archive zip
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Erreur d'écriture CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Erreur d'encodage de géométrie (geozero)
    #[error("Geometry encoding error: {0}")]
    Geozero(#[from] geozero::error::GeozeroError),

    /// Type de géométrie non supporté par le runtime
    #[error("Unsupported geometry in {dataset}: {reason}")]
    UnsupportedGeometry { dataset: String, reason: String },

    /// Champ demandé absent de la table attributaire
    #[error("Unknown field '{field}' in {dataset}")]
    UnknownField { field: String, dataset: String },

    /// Nom de champ invalide pour une table dbf
    #[error("Invalid dbf field name: {0}")]
    InvalidFieldName(String),

    /// Couche transiente introuvable
    #[error("No in-memory layer named '{0}'")]
    NoSuchLayer(String),

    /// Fichier obligatoire absent du bundle shapefile
    #[error("Missing shapefile member: {0}")]
    MissingMember(String),

    /// Export CSV demandé sur une géométrie non ponctuelle
    #[error("CSV export requires Point or MultiPoint geometry, got {0}")]
    NotPointGeometry(String),

    /// Erreur de reprojection PROJ
    #[error("Reprojection failed: {0}")]
    Reprojection(String),

    /// Le crate a été compilé sans le feature `reproject`
    #[error("Reprojection support not compiled in (enable the `reproject` feature)")]
    ReprojectionUnavailable,
}

impl Shp2OpenError {
    /// Crée une erreur de géométrie non supportée avec contexte
    pub fn unsupported_geometry(dataset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedGeometry {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de champ inconnu
    pub fn unknown_field(field: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            dataset: dataset.into(),
        }
    }
}
