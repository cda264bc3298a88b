//! Pipeline de conversion
//!
//! Procédure strictement séquentielle: pré-nettoyage, préparation des
//! répertoires, copie filtrée vers un shapefile temporaire, placement
//! (reprojection ou export simple), suppression de la couche
//! transiente, archive zip puis exports optionnels. Le répertoire
//! temporaire est tenu par une garde de ressource et supprimé sur
//! toutes les sorties, y compris fatales.
//!
//! Les échecs des étapes 3 à 5 interrompent le run; ceux des exports
//! (zip compris) sont consignés et le run continue (voir DESIGN.md).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use shp2open::convert::{geojson, Export};
use shp2open::{Shp2OpenError, VectorRuntime};

use crate::config::ConversionRequest;
use crate::report::{RunReport, StepName};

/// Référence spatiale présumée de la source: NAD83 StatePlane
/// Pennsylvania South (ft-US). Couple figé, non paramétrable.
pub const STANDARD_SOURCE_EPSG: u32 = 2272;

/// Référence cible de la reprojection: WGS 84
pub const TARGET_EPSG: u32 = 4326;

static LAYER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Nom de couche transiente unique par run
///
/// L'outil d'origine utilisait le nom fixe `temp_layer`, ce qui
/// interdisait deux runs simultanés dans le même processus.
fn unique_layer_name() -> String {
    format!(
        "temp_layer_{}_{}",
        std::process::id(),
        LAYER_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Garde du répertoire de travail temporaire
///
/// La suppression a lieu au drop, donc aussi quand une étape fatale
/// fait remonter une erreur.
struct TempWorkspace {
    path: PathBuf,
    armed: bool,
}

impl TempWorkspace {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Suppression explicite en fin de run normal
    fn close(mut self) {
        self.armed = false;
        self.remove();
    }

    fn remove(&self) {
        if !self.path.exists() {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(dir = %self.path.display(), "Removed the temp directory"),
            Err(e) => warn!(
                dir = %self.path.display(),
                "Unable to remove the temp directory: {}", e
            ),
        }
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if self.armed {
            self.remove();
        }
    }
}

/// Garde de la couche transiente en mémoire
///
/// Les noms de couche étant uniques par run, le pré-nettoyage d'un run
/// suivant ne peut pas réclamer une couche orpheline: elle doit être
/// libérée sur toutes les sorties, comme le répertoire temporaire.
struct TransientLayer<'a, R: VectorRuntime> {
    runtime: &'a R,
    name: &'a str,
    armed: bool,
}

impl<'a, R: VectorRuntime> TransientLayer<'a, R> {
    fn new(runtime: &'a R, name: &'a str) -> Self {
        Self {
            runtime,
            name,
            armed: true,
        }
    }

    /// Suppression explicite de l'étape 5, fatale en cas d'échec
    fn close(mut self) -> Result<(), Shp2OpenError> {
        self.armed = false;
        self.runtime.delete_layer(self.name)
    }
}

impl<R: VectorRuntime> Drop for TransientLayer<'_, R> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.runtime.delete_layer(self.name) {
                debug!("Best-effort cleanup skipped (transient layer): {}", e);
            }
        }
    }
}

/// Nettoyage "best effort": l'échec est consigné en debug et avalé
fn best_effort<F>(what: &str, op: F)
where
    F: FnOnce() -> Result<(), Shp2OpenError>,
{
    if let Err(e) = op() {
        debug!("Best-effort cleanup skipped ({}): {}", what, e);
    }
}

/// Exécute le pipeline de conversion
///
/// Retourne un rapport des étapes d'export; une erreur signifie que le
/// run a été interrompu avant la production du shapefile final (copie
/// filtrée, placement ou suppression de la couche transiente).
pub fn run<R: VectorRuntime>(runtime: &R, request: &ConversionRequest) -> Result<RunReport> {
    let started = Instant::now();
    request.validate().context("Invalid conversion request")?;

    if request.debug {
        info!(fields = ?request.fields, "Field selection");
    }

    let layer_name = unique_layer_name();

    // 1. Pré-nettoyage d'une éventuelle couche résiduelle
    best_effort("lingering transient layer", || {
        runtime.delete_layer(&layer_name)
    });

    // 2. Préparation des répertoires de sortie
    let shapefile_dir = request.shapefile_dir();
    if !shapefile_dir.exists() {
        fs::create_dir_all(&shapefile_dir)
            .with_context(|| format!("Failed to create {}", shapefile_dir.display()))?;
        if request.debug {
            info!(dir = %shapefile_dir.display(), "Created output directory");
        }
    }
    let temp_dir = request.temp_dir();
    if temp_dir.exists() {
        purge_temp_files(&temp_dir);
    } else {
        fs::create_dir_all(&temp_dir)
            .with_context(|| format!("Failed to create {}", temp_dir.display()))?;
    }

    // Le répertoire temp est supprimé sur toutes les sorties à partir d'ici
    let workspace = TempWorkspace::new(temp_dir);

    // 3. Copie filtrée via une couche transiente, elle aussi tenue par
    // une garde jusqu'à sa suppression explicite (étape 5)
    let temp_shp = request.temp_shapefile();
    runtime
        .make_layer(&request.source, &layer_name, &request.fields)
        .context("Failed to create the filtered layer")?;
    let layer = TransientLayer::new(runtime, &layer_name);
    runtime
        .copy_features(&layer_name, &temp_shp)
        .context("Failed to copy features to the temporary shapefile")?;

    // 4. Placement: reprojection ou export simple
    let final_shp = request.final_shapefile();
    if request.to_wgs84 {
        info!("Converting spatial reference to WGS84...");
        runtime
            .project(&temp_shp, &final_shp, STANDARD_SOURCE_EPSG, TARGET_EPSG)
            .context("Projection conversion failed")?;
        info!("Projection conversion completed");
    } else {
        info!("Exporting shapefile already in WGS84...");
        runtime
            .export_to_dir(&temp_shp, &shapefile_dir)
            .context("Failed to export the shapefile")?;
    }

    // 5. Suppression de la couche transiente, fatale en cas d'échec
    // (contrairement à l'étape 1: une couche qui survit ici fuit)
    layer
        .close()
        .context("Unable to delete the transient layer")?;

    // 6. Archive zip, toujours produite
    info!("Compressing the shapefile to a .zip file...");
    let export = Export::new(&request.output_dir, &request.output_name, request.debug);
    let mut report = RunReport::new();
    report.record(StepName::Zip, log_step("ZIP archive", export.zip()));

    // 7. Exports optionnels, indépendants les uns des autres
    if request.geojson {
        info!("Converting to GeoJSON...");
        let output = request.output_path("geojson");
        report.record(
            StepName::Geojson,
            log_step("GeoJSON", geojson::to_open(&final_shp, &output, true)),
        );
    }
    if request.kmz {
        info!("Converting to KML...");
        report.record(StepName::Kmz, log_step("KMZ", export.kmz()));
    }
    if request.csv {
        info!("Converting to CSV...");
        report.record(StepName::Csv, log_step("CSV", export.csv()));
    }
    if request.metadata {
        info!("Converting metadata to Markdown README.md file...");
        report.record(
            StepName::Metadata,
            log_step("metadata Markdown", export.md()),
        );
    }

    // 8. Nettoyage final du répertoire temporaire
    workspace.close();
    if request.debug {
        info!("Deleted the temp folder");
    }

    report.duration_secs = started.elapsed().as_secs_f64();
    Ok(report)
}

/// Purge les fichiers directement dans temp/ (pas les sous-répertoires)
///
/// Un fichier impossible à supprimer est signalé mais n'interrompt pas
/// le run.
fn purge_temp_files(dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), "Unable to list the temp directory: {}", e);
            return;
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), "Unable to read a temp directory entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() {
            if let Err(e) = fs::remove_file(&path) {
                warn!(
                    file = %path.display(),
                    "Unable to delete from the temp folder, this may become a problem later: {}",
                    e
                );
            }
        }
    }
}

fn log_step(what: &str, result: Result<(), Shp2OpenError>) -> bool {
    match result {
        Ok(()) => {
            info!("Finished creating {}", what);
            true
        }
        Err(e) => {
            error!("{} conversion failed: {}", what, e);
            false
        }
    }
}
