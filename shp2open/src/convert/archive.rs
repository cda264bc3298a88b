//! Compression du bundle shapefile en archive zip

use std::fs::File;
use std::io;
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Shp2OpenError;
use crate::runtime::shapefile::BUNDLE_EXTENSIONS;

/// Compresse les fichiers d'un bundle shapefile dans une archive zip
///
/// Seuls les membres présents sur disque sont archivés; le .shp
/// lui-même est obligatoire.
pub fn zip_bundle(shp: &Path, dest: &Path, debug: bool) -> Result<(), Shp2OpenError> {
    if !shp.exists() {
        return Err(Shp2OpenError::MissingMember(shp.display().to_string()));
    }

    let base = shp
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Shp2OpenError::MissingMember(shp.display().to_string()))?
        .to_string();

    let file = File::create(dest)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for ext in BUNDLE_EXTENSIONS {
        let member = shp.with_extension(ext);
        if !member.exists() {
            continue;
        }
        writer.start_file(format!("{}.{}", base, ext), options)?;
        let mut input = File::open(&member)?;
        io::copy(&mut input, &mut writer)?;
        if debug {
            debug!(member = %member.display(), "Added to zip archive");
        }
    }

    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::shapefile::write_features;
    use crate::types::{Feature, GeometryKind};
    use geo::Geometry;

    #[test]
    fn test_zip_bundle_contains_members() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("towns.shp");
        let features = vec![Feature {
            geometry: Geometry::Point(geo::Point::new(1.0, 2.0)),
            attributes: vec![],
        }];
        write_features(&shp, GeometryKind::Point, &[], &features).unwrap();

        let dest = dir.path().join("towns.zip");
        zip_bundle(&shp, &dest, false).unwrap();

        let archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let names: Vec<String> = archive.file_names().map(String::from).collect();
        assert!(names.contains(&"towns.shp".to_string()));
        assert!(names.contains(&"towns.dbf".to_string()));
    }

    #[test]
    fn test_zip_bundle_missing_shapefile() {
        let dir = tempfile::tempdir().unwrap();
        let err = zip_bundle(
            &dir.path().join("absent.shp"),
            &dir.path().join("absent.zip"),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Shp2OpenError::MissingMember(_)));
    }
}
