//! Export CSV pour les géométries ponctuelles
//!
//! Une ligne par point, attributs puis colonnes `x`/`y`. Les
//! MultiPoint produisent une ligne par point constitutif, attributs
//! répétés.

use std::path::Path;

use geo::Geometry;
use tracing::warn;

use crate::error::Shp2OpenError;
use crate::runtime::shapefile::read_dataset;
use crate::types::{DatasetInfo, Feature};

/// Convertit un shapefile ponctuel en CSV
pub fn export_csv(shapefile: &Path, dest: &Path) -> Result<(), Shp2OpenError> {
    let (info, features) = read_dataset(shapefile)?;

    if !info.geometry.is_point_like() {
        return Err(Shp2OpenError::NotPointGeometry(info.geometry.to_string()));
    }

    let mut writer = csv::Writer::from_path(dest)?;
    write_rows(&mut writer, &info, &features)?;
    writer.flush()?;
    Ok(())
}

fn write_rows<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    info: &DatasetInfo,
    features: &[Feature],
) -> Result<(), Shp2OpenError> {
    let mut header: Vec<String> = info.fields.iter().map(|f| f.name.clone()).collect();
    header.push("x".to_string());
    header.push("y".to_string());
    writer.write_record(&header)?;

    for feature in features {
        match &feature.geometry {
            Geometry::Point(p) => {
                writer.write_record(row(feature, p.x(), p.y()))?;
            }
            Geometry::MultiPoint(mp) => {
                for p in mp.iter() {
                    writer.write_record(row(feature, p.x(), p.y()))?;
                }
            }
            other => {
                // Le type du jeu est ponctuel, une géométrie isolée
                // d'un autre type est ignorée
                warn!("Skipping non-point geometry in CSV export: {:?}", other);
            }
        }
    }
    Ok(())
}

fn row(feature: &Feature, x: f64, y: f64) -> Vec<String> {
    let mut values: Vec<String> = feature
        .attributes
        .iter()
        .map(|(_, v)| v.to_display_string())
        .collect();
    values.push(format!("{}", x));
    values.push(format!("{}", y));
    values
}
