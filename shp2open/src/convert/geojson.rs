//! Export vers GeoJSON avec geozero (streaming)
//!
//! Équivalent du convertisseur `toOpen` de l'outil d'origine: lit le
//! shapefile final et écrit une FeatureCollection en une passe.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

use crate::error::Shp2OpenError;
use crate::runtime::shapefile::read_dataset;
use crate::types::{AttrValue, Feature};

/// Convertit un shapefile en GeoJSON
///
/// Avec `include_geometry` à faux, chaque feature est écrite avec une
/// géométrie `null` (export attributaire seul).
pub fn to_open(
    shapefile: &Path,
    output: &Path,
    include_geometry: bool,
) -> Result<(), Shp2OpenError> {
    let (_, features) = read_dataset(shapefile)?;

    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);

    write!(writer, r#"{{"type":"FeatureCollection","features":["#)?;

    for (i, feature) in features.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(&mut writer, feature, include_geometry)?;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(())
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(
    writer: &mut W,
    feature: &Feature,
    include_geometry: bool,
) -> Result<(), Shp2OpenError> {
    write!(writer, r#"{{"type":"Feature","geometry":"#)?;

    if include_geometry {
        // Géométrie via geozero
        let mut geom_buf = Vec::new();
        let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
        feature.geometry.process_geom(&mut geom_writer)?;
        writer.write_all(&geom_buf)?;
    } else {
        write!(writer, "null")?;
    }

    write!(writer, r#","properties":{{"#)?;
    for (i, (key, value)) in feature.attributes.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write!(writer, r#""{}":{}"#, escape_json(key), json_value(value))?;
    }
    write!(writer, "}}}}")?;

    Ok(())
}

/// Rend une valeur attributaire en littéral JSON
fn json_value(value: &AttrValue) -> String {
    match value {
        AttrValue::Character(Some(s)) => format!(r#""{}""#, escape_json(s)),
        AttrValue::Numeric(Some(n)) if n.is_finite() => format!("{}", n),
        AttrValue::Logical(Some(b)) => format!("{}", b),
        _ => "null".to_string(),
    }
}

/// Échappe une chaîne pour JSON
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Point};
    use std::io::Cursor;

    fn sample_feature() -> Feature {
        Feature {
            geometry: Geometry::Point(Point::new(1.0, 2.0)),
            attributes: vec![
                (
                    "name".to_string(),
                    AttrValue::Character(Some("Test".to_string())),
                ),
                ("value".to_string(), AttrValue::Numeric(Some(3.5))),
                ("flag".to_string(), AttrValue::Logical(None)),
            ],
        }
    }

    #[test]
    fn test_write_feature() {
        let mut buffer = Cursor::new(Vec::new());
        write_feature(&mut buffer, &sample_feature(), true).unwrap();

        let json = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(json.contains(r#""type":"Feature""#));
        assert!(json.contains(r#""name":"Test""#));
        assert!(json.contains(r#""value":3.5"#));
        assert!(json.contains(r#""flag":null"#));
        // geozero outputs "Point" directly
        assert!(json.contains("Point") || json.contains("coordinates"));
    }

    #[test]
    fn test_write_feature_without_geometry() {
        let mut buffer = Cursor::new(Vec::new());
        write_feature(&mut buffer, &sample_feature(), false).unwrap();

        let json = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(json.contains(r#""geometry":null"#));
    }

    #[test]
    fn test_escape_json() {
        assert_eq!(escape_json("hello"), "hello");
        assert_eq!(escape_json("hello\"world"), "hello\\\"world");
        assert_eq!(escape_json("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn test_to_open() {
        use crate::runtime::shapefile::write_features;
        use crate::types::{AttrKind, FieldDef, GeometryKind};

        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("sample.shp");
        let fields = vec![FieldDef {
            name: "name".to_string(),
            kind: AttrKind::Character,
        }];
        let features = vec![Feature {
            geometry: Geometry::Point(Point::new(5.0, 47.0)),
            attributes: vec![(
                "name".to_string(),
                AttrValue::Character(Some("Test".to_string())),
            )],
        }];
        write_features(&shp, GeometryKind::Point, &fields, &features).unwrap();

        let output = dir.path().join("sample.geojson");
        to_open(&shp, &output, true).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains(r#""type":"FeatureCollection""#));
        assert!(content.contains(r#""name":"Test""#));
        assert!(content.contains("coordinates"));
    }
}
