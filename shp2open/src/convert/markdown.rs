//! Fiche de métadonnées Markdown (README.md)

use std::fs;
use std::path::Path;

use crate::error::Shp2OpenError;
use crate::runtime::shapefile::read_dataset;
use crate::types::DatasetInfo;

/// Écrit les métadonnées du shapefile dans un fichier Markdown
pub fn export_markdown(shapefile: &Path, name: &str, dest: &Path) -> Result<(), Shp2OpenError> {
    let (info, _) = read_dataset(shapefile)?;
    let prj = fs::read_to_string(shapefile.with_extension("prj")).ok();
    fs::write(dest, render(name, &info, prj.as_deref()))?;
    Ok(())
}

fn render(name: &str, info: &DatasetInfo, prj: Option<&str>) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", name));
    out.push_str("## Dataset\n\n");
    out.push_str(&format!("- Geometry type: {}\n", info.geometry));
    out.push_str(&format!("- Features: {}\n", info.feature_count));
    match prj {
        Some(wkt) => {
            out.push_str("- Spatial reference:\n\n");
            out.push_str(&format!("```\n{}\n```\n", wkt.trim()));
        }
        None => out.push_str("- Spatial reference: unknown (no .prj file)\n"),
    }

    out.push_str("\n## Fields\n\n");
    out.push_str("| Name | Type |\n");
    out.push_str("| --- | --- |\n");
    for field in &info.fields {
        out.push_str(&format!("| {} | {} |\n", field.name, field.kind));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttrKind, FieldDef, GeometryKind};

    #[test]
    fn test_render() {
        let info = DatasetInfo {
            geometry: GeometryKind::Point,
            fields: vec![
                FieldDef {
                    name: "name".to_string(),
                    kind: AttrKind::Character,
                },
                FieldDef {
                    name: "value".to_string(),
                    kind: AttrKind::Numeric,
                },
            ],
            feature_count: 7,
        };

        let md = render("parcels", &info, Some("GEOGCS[\"GCS_WGS_1984\"]"));
        assert!(md.starts_with("# parcels\n"));
        assert!(md.contains("- Geometry type: Point"));
        assert!(md.contains("- Features: 7"));
        assert!(md.contains("| name | text |"));
        assert!(md.contains("| value | number |"));
        assert!(md.contains("GCS_WGS_1984"));
    }

    #[test]
    fn test_render_without_prj() {
        let info = DatasetInfo {
            geometry: GeometryKind::Polyline,
            fields: vec![],
            feature_count: 0,
        };
        let md = render("roads", &info, None);
        assert!(md.contains("unknown (no .prj file)"));
    }
}
