//! Runtime vectoriel (accès aux jeux de données et couches transientes)
//!
//! Le trait [`VectorRuntime`] est la couture entre le pipeline de
//! conversion et l'accès aux données: describe, couches filtrées en
//! mémoire, copie vers shapefile, reprojection et export simple.
//! [`ShapefileRuntime`] est l'implémentation par défaut, adossée au
//! crate `shapefile`.

pub mod shapefile;

#[cfg(feature = "reproject")]
pub mod reproject;

use std::path::Path;

use crate::error::Shp2OpenError;
use crate::types::DatasetInfo;

pub use self::shapefile::ShapefileRuntime;

/// Accès aux jeux de données vectoriels et aux couches transientes
///
/// Toutes les opérations sont synchrones et bloquantes. Les couches
/// créées par [`make_layer`](Self::make_layer) sont adressées par nom
/// et vivent jusqu'à [`delete_layer`](Self::delete_layer) (ou la fin
/// du processus).
pub trait VectorRuntime {
    /// Décrit un jeu de données (type de géométrie, champs, effectif)
    fn describe(&self, dataset: &Path) -> Result<DatasetInfo, Shp2OpenError>;

    /// Crée une couche transiente nommée, restreinte à `fields`
    ///
    /// Le pseudo-champ géométrique `SHAPE@XY` est accepté et ignoré
    /// (la géométrie est toujours portée par la couche).
    fn make_layer(
        &self,
        dataset: &Path,
        name: &str,
        fields: &[String],
    ) -> Result<(), Shp2OpenError>;

    /// Supprime une couche transiente
    fn delete_layer(&self, name: &str) -> Result<(), Shp2OpenError>;

    /// Copie les features d'une couche transiente vers un shapefile
    fn copy_features(&self, layer: &str, dest: &Path) -> Result<(), Shp2OpenError>;

    /// Reprojette un shapefile vers `dest` (EPSG source -> EPSG cible)
    fn project(
        &self,
        src: &Path,
        dest: &Path,
        source_epsg: u32,
        target_epsg: u32,
    ) -> Result<(), Shp2OpenError>;

    /// Exporte un shapefile tel quel dans un répertoire (sans reprojection)
    fn export_to_dir(&self, src: &Path, dest_dir: &Path) -> Result<(), Shp2OpenError>;
}
