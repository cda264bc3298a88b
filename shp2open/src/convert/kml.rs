//! Export vers KMZ (document KML compressé)
//!
//! Le KML est écrit en streaming, comme l'export GeoJSON. Les
//! coordonnées sont reprises telles quelles: un KMZ n'a de sens que si
//! le shapefile est en WGS 84 (option de reprojection du pipeline).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use geo::{Geometry, LineString};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Shp2OpenError;
use crate::runtime::shapefile::read_dataset;
use crate::types::Feature;

const KML_NS: &str = "http://www.opengis.net/kml/2.2";

/// Convertit un shapefile en archive KMZ (`doc.kml` zippé)
pub fn export_kmz(shapefile: &Path, dest: &Path) -> Result<(), Shp2OpenError> {
    let (_, features) = read_dataset(shapefile)?;

    let document_name = dest
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");

    let mut kml = Vec::new();
    write_kml(&mut kml, document_name, &features)?;

    let file = File::create(dest)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file("doc.kml", options)?;
    writer.write_all(&kml)?;
    writer.finish()?;

    Ok(())
}

/// Écrit un document KML complet
fn write_kml<W: Write>(
    writer: &mut W,
    name: &str,
    features: &[Feature],
) -> Result<(), Shp2OpenError> {
    write!(
        writer,
        r#"<?xml version="1.0" encoding="UTF-8"?><kml xmlns="{}"><Document><name>{}</name>"#,
        KML_NS,
        escape_xml(name)
    )?;

    for feature in features {
        write_placemark(writer, feature)?;
    }

    write!(writer, "</Document></kml>")?;
    Ok(())
}

/// Écrit une feature comme Placemark
fn write_placemark<W: Write>(writer: &mut W, feature: &Feature) -> Result<(), Shp2OpenError> {
    write!(writer, "<Placemark>")?;

    if !feature.attributes.is_empty() {
        write!(writer, "<ExtendedData>")?;
        for (key, value) in &feature.attributes {
            write!(
                writer,
                "<Data name=\"{}\"><value>{}</value></Data>",
                escape_xml(key),
                escape_xml(&value.to_display_string())
            )?;
        }
        write!(writer, "</ExtendedData>")?;
    }

    write_geometry(writer, &feature.geometry)?;
    write!(writer, "</Placemark>")?;
    Ok(())
}

fn write_geometry<W: Write>(writer: &mut W, geometry: &Geometry) -> Result<(), Shp2OpenError> {
    match geometry {
        Geometry::Point(p) => {
            write!(
                writer,
                "<Point><coordinates>{},{}</coordinates></Point>",
                p.x(),
                p.y()
            )?;
        }
        Geometry::MultiPoint(mp) => {
            write!(writer, "<MultiGeometry>")?;
            for p in mp.iter() {
                write!(
                    writer,
                    "<Point><coordinates>{},{}</coordinates></Point>",
                    p.x(),
                    p.y()
                )?;
            }
            write!(writer, "</MultiGeometry>")?;
        }
        Geometry::LineString(ls) => {
            write!(
                writer,
                "<LineString><coordinates>{}</coordinates></LineString>",
                coordinates(ls)
            )?;
        }
        Geometry::MultiLineString(mls) => {
            write!(writer, "<MultiGeometry>")?;
            for ls in mls.iter() {
                write!(
                    writer,
                    "<LineString><coordinates>{}</coordinates></LineString>",
                    coordinates(ls)
                )?;
            }
            write!(writer, "</MultiGeometry>")?;
        }
        Geometry::Polygon(p) => write_polygon(writer, p)?,
        Geometry::MultiPolygon(mp) => {
            write!(writer, "<MultiGeometry>")?;
            for p in mp.iter() {
                write_polygon(writer, p)?;
            }
            write!(writer, "</MultiGeometry>")?;
        }
        other => {
            return Err(Shp2OpenError::unsupported_geometry(
                "kmz export",
                format!("{:?}", other),
            ))
        }
    }
    Ok(())
}

fn write_polygon<W: Write>(writer: &mut W, polygon: &geo::Polygon) -> Result<(), Shp2OpenError> {
    write!(
        writer,
        "<Polygon><outerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></outerBoundaryIs>",
        coordinates(polygon.exterior())
    )?;
    for interior in polygon.interiors() {
        write!(
            writer,
            "<innerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></innerBoundaryIs>",
            coordinates(interior)
        )?;
    }
    write!(writer, "</Polygon>")?;
    Ok(())
}

/// Liste de coordonnées KML ("x,y x,y ...")
fn coordinates(ls: &LineString) -> String {
    ls.coords()
        .map(|c| format!("{},{}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Échappe une chaîne pour XML
fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            c => result.push(c),
        }
    }
    result
}
