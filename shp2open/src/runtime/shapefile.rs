//! Runtime adossé au crate `shapefile`
//!
//! Lit et écrit des bundles shapefile (.shp/.shx/.dbf + sidecars .prj
//! et .cpg) et héberge les couches transientes en mémoire. Seuls les
//! types 2D Point, Multipoint, Polyline et Polygon sont gérés, comme
//! l'outil d'origine.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon};
use shapefile::dbase;
use shapefile::{Polygon, PolygonRing, Polyline, Shape, ShapeType};
use tracing::{debug, warn};

use crate::error::Shp2OpenError;
use crate::types::{AttrKind, AttrValue, DatasetInfo, Feature, FieldDef, GeometryKind};
use crate::runtime::VectorRuntime;

/// WKT ESRI écrit dans le .prj après reprojection vers WGS 84
pub const WGS84_PRJ_WKT: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]";

/// Extensions composant un bundle shapefile, la première obligatoire
pub(crate) const BUNDLE_EXTENSIONS: [&str; 5] = ["shp", "shx", "dbf", "prj", "cpg"];

/// Couche transiente en mémoire (vue filtrée d'un jeu source)
struct Layer {
    info: DatasetInfo,
    features: Vec<Feature>,
    /// Contenu du .prj source, recopié à côté des copies
    prj: Option<String>,
    /// Contenu du .cpg source
    cpg: Option<String>,
}

/// Runtime vectoriel par défaut, adossé aux fichiers shapefile
#[derive(Default)]
pub struct ShapefileRuntime {
    layers: Mutex<HashMap<String, Layer>>,
}

impl ShapefileRuntime {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorRuntime for ShapefileRuntime {
    fn describe(&self, dataset: &Path) -> Result<DatasetInfo, Shp2OpenError> {
        let (info, _) = read_dataset(dataset)?;
        Ok(info)
    }

    fn make_layer(
        &self,
        dataset: &Path,
        name: &str,
        fields: &[String],
    ) -> Result<(), Shp2OpenError> {
        let (info, features) = read_dataset(dataset)?;
        let selected = select_fields(dataset, &info.fields, fields)?;

        let features = features
            .into_iter()
            .map(|f| filter_attributes(f, &selected))
            .collect::<Vec<_>>();

        let layer = Layer {
            info: DatasetInfo {
                geometry: info.geometry,
                fields: selected,
                feature_count: features.len(),
            },
            features,
            prj: read_sidecar(dataset, "prj"),
            cpg: read_sidecar(dataset, "cpg"),
        };

        let mut layers = self.layers.lock().expect("layer registry poisoned");
        if layers.insert(name.to_string(), layer).is_some() {
            debug!(layer = name, "Replaced an existing in-memory layer");
        }
        Ok(())
    }

    fn delete_layer(&self, name: &str) -> Result<(), Shp2OpenError> {
        let mut layers = self.layers.lock().expect("layer registry poisoned");
        layers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Shp2OpenError::NoSuchLayer(name.to_string()))
    }

    fn copy_features(&self, layer: &str, dest: &Path) -> Result<(), Shp2OpenError> {
        let layers = self.layers.lock().expect("layer registry poisoned");
        let layer = layers
            .get(layer)
            .ok_or_else(|| Shp2OpenError::NoSuchLayer(layer.to_string()))?;

        write_features(dest, layer.info.geometry, &layer.info.fields, &layer.features)?;

        if let Some(prj) = &layer.prj {
            fs::write(dest.with_extension("prj"), prj)?;
        }
        if let Some(cpg) = &layer.cpg {
            fs::write(dest.with_extension("cpg"), cpg)?;
        }
        Ok(())
    }

    #[cfg(feature = "reproject")]
    fn project(
        &self,
        src: &Path,
        dest: &Path,
        source_epsg: u32,
        target_epsg: u32,
    ) -> Result<(), Shp2OpenError> {
        use crate::runtime::reproject::Reprojector;

        let (info, features) = read_dataset(src)?;
        let reprojector = Reprojector::new(source_epsg, target_epsg)?;

        let features = features
            .into_iter()
            .map(|mut f| {
                f.geometry = reprojector.transform_geometry(&f.geometry)?;
                Ok(f)
            })
            .collect::<Result<Vec<_>, Shp2OpenError>>()?;

        write_features(dest, info.geometry, &info.fields, &features)?;

        // Le .prj décrit la référence cible, plus celle de la source
        if target_epsg == 4326 {
            fs::write(dest.with_extension("prj"), WGS84_PRJ_WKT)?;
        }
        if let Some(cpg) = read_sidecar(src, "cpg") {
            fs::write(dest.with_extension("cpg"), cpg)?;
        }
        Ok(())
    }

    #[cfg(not(feature = "reproject"))]
    fn project(
        &self,
        _src: &Path,
        _dest: &Path,
        _source_epsg: u32,
        _target_epsg: u32,
    ) -> Result<(), Shp2OpenError> {
        Err(Shp2OpenError::ReprojectionUnavailable)
    }

    fn export_to_dir(&self, src: &Path, dest_dir: &Path) -> Result<(), Shp2OpenError> {
        let file_name = src
            .file_name()
            .ok_or_else(|| Shp2OpenError::MissingMember(src.display().to_string()))?;

        if !src.exists() {
            return Err(Shp2OpenError::MissingMember(src.display().to_string()));
        }

        for ext in BUNDLE_EXTENSIONS {
            let member = src.with_extension(ext);
            if member.exists() {
                let dest = dest_dir.join(file_name).with_extension(ext);
                fs::copy(&member, &dest)?;
            }
        }
        Ok(())
    }
}

/// Lit un bundle shapefile complet (géométries + table attributaire)
pub fn read_dataset(path: &Path) -> Result<(DatasetInfo, Vec<Feature>), Shp2OpenError> {
    let shape_reader = shapefile::ShapeReader::from_path(path)?;
    let geometry = kind_from_shape_type(shape_reader.header().shape_type, path)?;
    let shapes = shape_reader.read()?;

    let mut table = dbase::Reader::from_path(path.with_extension("dbf"))?;
    let fields: Vec<FieldDef> = table
        .fields()
        .iter()
        .filter(|f| f.name() != "DeletionFlag")
        .map(|f| FieldDef {
            name: f.name().to_string(),
            kind: attr_kind_from_field_type(f.field_type()),
        })
        .collect();
    let records = table.read()?;

    if shapes.len() != records.len() {
        warn!(
            dataset = %path.display(),
            shapes = shapes.len(),
            records = records.len(),
            "Shape and attribute record counts differ, extra entries are ignored"
        );
    }

    let mut features = Vec::with_capacity(shapes.len());
    for (shape, record) in shapes.into_iter().zip(records) {
        let geometry = geo_from_shape(shape, path)?;
        let attributes = fields
            .iter()
            .map(|field| {
                let value = record
                    .get(&field.name)
                    .map(attr_from_value)
                    .unwrap_or_else(|| empty_value(field.kind));
                (field.name.clone(), value)
            })
            .collect();
        features.push(Feature {
            geometry,
            attributes,
        });
    }

    let info = DatasetInfo {
        geometry,
        fields,
        feature_count: features.len(),
    };
    Ok((info, features))
}

/// Écrit un bundle shapefile (.shp/.shx/.dbf) depuis des features en mémoire
pub fn write_features(
    dest: &Path,
    kind: GeometryKind,
    fields: &[FieldDef],
    features: &[Feature],
) -> Result<(), Shp2OpenError> {
    let builder = table_builder(fields)?;

    match kind {
        GeometryKind::Point => {
            let mut writer = shapefile::Writer::from_path(dest, builder)?;
            for feature in features {
                writer.write_shape_and_record(&as_point(feature)?, &record_of(feature, fields))?;
            }
        }
        GeometryKind::MultiPoint => {
            let mut writer = shapefile::Writer::from_path(dest, builder)?;
            for feature in features {
                writer
                    .write_shape_and_record(&as_multipoint(feature)?, &record_of(feature, fields))?;
            }
        }
        GeometryKind::Polyline => {
            let mut writer = shapefile::Writer::from_path(dest, builder)?;
            for feature in features {
                writer
                    .write_shape_and_record(&as_polyline(feature)?, &record_of(feature, fields))?;
            }
        }
        GeometryKind::Polygon => {
            let mut writer = shapefile::Writer::from_path(dest, builder)?;
            for feature in features {
                writer.write_shape_and_record(&as_polygon(feature)?, &record_of(feature, fields))?;
            }
        }
    }
    Ok(())
}

/// Résout les champs demandés contre les champs du jeu source
///
/// Les pseudo-champs géométriques (`SHAPE@XY`, `SHAPE@`) sont ignorés:
/// la géométrie est toujours portée. La comparaison ignore la casse.
fn select_fields(
    dataset: &Path,
    available: &[FieldDef],
    requested: &[String],
) -> Result<Vec<FieldDef>, Shp2OpenError> {
    let mut selected = Vec::new();
    for name in requested {
        if name.starts_with("SHAPE@") {
            continue;
        }
        let field = available
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Shp2OpenError::unknown_field(name, dataset.display().to_string()))?;
        selected.push(field.clone());
    }
    Ok(selected)
}

fn filter_attributes(feature: Feature, selected: &[FieldDef]) -> Feature {
    let attributes = selected
        .iter()
        .map(|field| {
            let value = feature
                .attribute(&field.name)
                .cloned()
                .unwrap_or_else(|| empty_value(field.kind));
            (field.name.clone(), value)
        })
        .collect();
    Feature {
        geometry: feature.geometry,
        attributes,
    }
}

fn read_sidecar(path: &Path, ext: &str) -> Option<String> {
    fs::read_to_string(path.with_extension(ext)).ok()
}

fn kind_from_shape_type(
    shape_type: ShapeType,
    dataset: &Path,
) -> Result<GeometryKind, Shp2OpenError> {
    match shape_type {
        ShapeType::Point => Ok(GeometryKind::Point),
        ShapeType::Multipoint => Ok(GeometryKind::MultiPoint),
        ShapeType::Polyline => Ok(GeometryKind::Polyline),
        ShapeType::Polygon => Ok(GeometryKind::Polygon),
        other => Err(Shp2OpenError::unsupported_geometry(
            dataset.display().to_string(),
            format!("shape type {}", other),
        )),
    }
}

fn attr_kind_from_field_type(field_type: dbase::FieldType) -> AttrKind {
    use dbase::FieldType;
    match field_type {
        FieldType::Numeric | FieldType::Float | FieldType::Integer => AttrKind::Numeric,
        FieldType::Logical => AttrKind::Logical,
        // Character, Date, Memo et le reste sont ramenés à du texte
        _ => AttrKind::Character,
    }
}

fn attr_from_value(value: &dbase::FieldValue) -> AttrValue {
    use dbase::FieldValue;
    match value {
        FieldValue::Character(v) => AttrValue::Character(v.clone()),
        FieldValue::Numeric(v) => AttrValue::Numeric(*v),
        FieldValue::Float(v) => AttrValue::Numeric(v.map(f64::from)),
        FieldValue::Integer(v) => AttrValue::Numeric(Some(f64::from(*v))),
        FieldValue::Logical(v) => AttrValue::Logical(*v),
        FieldValue::Date(v) => AttrValue::Character(v.map(|d| {
            format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())
        })),
        FieldValue::Memo(v) => AttrValue::Character(Some(v.clone())),
        other => AttrValue::Character(Some(format!("{:?}", other))),
    }
}

fn empty_value(kind: AttrKind) -> AttrValue {
    match kind {
        AttrKind::Character => AttrValue::Character(None),
        AttrKind::Numeric => AttrValue::Numeric(None),
        AttrKind::Logical => AttrValue::Logical(None),
    }
}

fn table_builder(fields: &[FieldDef]) -> Result<dbase::TableWriterBuilder, Shp2OpenError> {
    let mut builder = dbase::TableWriterBuilder::new();
    for field in fields {
        let name = dbase::FieldName::try_from(field.name.as_str())
            .map_err(|_| Shp2OpenError::InvalidFieldName(field.name.clone()))?;
        builder = match field.kind {
            // Largeurs par défaut: les largeurs sources ne sont pas
            // préservées (voir DESIGN.md), aucun export n'en dépend
            AttrKind::Character => builder.add_character_field(name, 254),
            AttrKind::Numeric => builder.add_numeric_field(name, 20, 8),
            AttrKind::Logical => builder.add_logical_field(name),
        };
    }
    Ok(builder)
}

fn record_of(feature: &Feature, fields: &[FieldDef]) -> dbase::Record {
    let mut record = dbase::Record::default();
    for field in fields {
        let value = feature
            .attribute(&field.name)
            .cloned()
            .unwrap_or_else(|| empty_value(field.kind));
        record.insert(field.name.clone(), field_value_for(field.kind, value));
    }
    record
}

fn field_value_for(kind: AttrKind, value: AttrValue) -> dbase::FieldValue {
    use dbase::FieldValue;
    match (kind, value) {
        (AttrKind::Character, AttrValue::Character(v)) => FieldValue::Character(v),
        (AttrKind::Numeric, AttrValue::Numeric(v)) => FieldValue::Numeric(v),
        (AttrKind::Logical, AttrValue::Logical(v)) => FieldValue::Logical(v),
        // Désaccord type/valeur: retomber sur le rendu texte
        (AttrKind::Character, other) => FieldValue::Character(Some(other.to_display_string())),
        (AttrKind::Numeric, _) => FieldValue::Numeric(None),
        (AttrKind::Logical, _) => FieldValue::Logical(None),
    }
}

fn geo_from_shape(shape: Shape, dataset: &Path) -> Result<Geometry, Shp2OpenError> {
    match shape {
        Shape::Point(p) => Ok(Geometry::Point(geo::Point::new(p.x, p.y))),
        Shape::Multipoint(mp) => Ok(Geometry::MultiPoint(
            mp.points()
                .iter()
                .map(|p| geo::Point::new(p.x, p.y))
                .collect::<MultiPoint>(),
        )),
        Shape::Polyline(pl) => Ok(Geometry::MultiLineString(MultiLineString::new(
            pl.parts()
                .iter()
                .map(|part| {
                    LineString::from(
                        part.iter()
                            .map(|p| Coord { x: p.x, y: p.y })
                            .collect::<Vec<_>>(),
                    )
                })
                .collect(),
        ))),
        Shape::Polygon(pg) => Ok(Geometry::MultiPolygon(multipolygon_from_rings(pg))),
        other => Err(Shp2OpenError::unsupported_geometry(
            dataset.display().to_string(),
            format!("shape type {}", other.shapetype()),
        )),
    }
}

fn multipolygon_from_rings(polygon: Polygon) -> MultiPolygon {
    let mut polygons: Vec<geo::Polygon> = Vec::new();
    for ring in polygon.into_inner() {
        match ring {
            PolygonRing::Outer(points) => {
                polygons.push(geo::Polygon::new(ring_to_linestring(&points), Vec::new()));
            }
            PolygonRing::Inner(points) => match polygons.last_mut() {
                Some(last) => last.interiors_push(ring_to_linestring(&points)),
                // Anneau intérieur orphelin: toléré comme extérieur
                None => {
                    warn!("Inner ring without an outer ring, keeping it as an outer ring");
                    polygons.push(geo::Polygon::new(ring_to_linestring(&points), Vec::new()));
                }
            },
        }
    }
    MultiPolygon::new(polygons)
}

fn ring_to_linestring(points: &[shapefile::Point]) -> LineString {
    LineString::from(
        points
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect::<Vec<_>>(),
    )
}

fn as_point(feature: &Feature) -> Result<shapefile::Point, Shp2OpenError> {
    match &feature.geometry {
        Geometry::Point(p) => Ok(shapefile::Point::new(p.x(), p.y())),
        other => Err(geometry_mismatch("Point", other)),
    }
}

fn as_multipoint(feature: &Feature) -> Result<shapefile::Multipoint, Shp2OpenError> {
    match &feature.geometry {
        Geometry::MultiPoint(mp) => Ok(shapefile::Multipoint::new(
            mp.iter()
                .map(|p| shapefile::Point::new(p.x(), p.y()))
                .collect(),
        )),
        Geometry::Point(p) => Ok(shapefile::Multipoint::new(vec![shapefile::Point::new(
            p.x(),
            p.y(),
        )])),
        other => Err(geometry_mismatch("MultiPoint", other)),
    }
}

fn as_polyline(feature: &Feature) -> Result<Polyline, Shp2OpenError> {
    match &feature.geometry {
        Geometry::MultiLineString(mls) => Ok(Polyline::with_parts(
            mls.iter().map(linestring_to_points).collect(),
        )),
        Geometry::LineString(ls) => Ok(Polyline::new(linestring_to_points(ls))),
        other => Err(geometry_mismatch("Polyline", other)),
    }
}

fn as_polygon(feature: &Feature) -> Result<Polygon, Shp2OpenError> {
    let polygons: Vec<&geo::Polygon> = match &feature.geometry {
        Geometry::MultiPolygon(mp) => mp.iter().collect(),
        Geometry::Polygon(p) => vec![p],
        other => return Err(geometry_mismatch("Polygon", other)),
    };

    let mut rings = Vec::new();
    for polygon in polygons {
        rings.push(PolygonRing::Outer(linestring_to_points(polygon.exterior())));
        for interior in polygon.interiors() {
            rings.push(PolygonRing::Inner(linestring_to_points(interior)));
        }
    }
    Ok(Polygon::with_rings(rings))
}

fn linestring_to_points(ls: &LineString) -> Vec<shapefile::Point> {
    ls.coords()
        .map(|c| shapefile::Point::new(c.x, c.y))
        .collect()
}

fn geometry_mismatch(expected: &str, got: &Geometry) -> Shp2OpenError {
    let got = match got {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        _ => "unsupported geometry",
    };
    Shp2OpenError::unsupported_geometry(
        got.to_string(),
        format!("expected {} geometry", expected),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttrValue;

    fn point_features() -> (Vec<FieldDef>, Vec<Feature>) {
        let fields = vec![
            FieldDef {
                name: "name".to_string(),
                kind: AttrKind::Character,
            },
            FieldDef {
                name: "value".to_string(),
                kind: AttrKind::Numeric,
            },
        ];
        let features = vec![
            Feature {
                geometry: Geometry::Point(geo::Point::new(1.5, 2.5)),
                attributes: vec![
                    (
                        "name".to_string(),
                        AttrValue::Character(Some("first".to_string())),
                    ),
                    ("value".to_string(), AttrValue::Numeric(Some(10.0))),
                ],
            },
            Feature {
                geometry: Geometry::Point(geo::Point::new(-3.0, 4.0)),
                attributes: vec![
                    (
                        "name".to_string(),
                        AttrValue::Character(Some("second".to_string())),
                    ),
                    ("value".to_string(), AttrValue::Numeric(Some(20.5))),
                ],
            },
        ];
        (fields, features)
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("points.shp");
        let (fields, features) = point_features();

        write_features(&shp, GeometryKind::Point, &fields, &features).unwrap();

        let (info, read_back) = read_dataset(&shp).unwrap();
        assert_eq!(info.geometry, GeometryKind::Point);
        assert_eq!(info.feature_count, 2);
        assert_eq!(info.fields.len(), 2);

        match &read_back[0].geometry {
            Geometry::Point(p) => {
                assert!((p.x() - 1.5).abs() < 1e-9);
                assert!((p.y() - 2.5).abs() < 1e-9);
            }
            other => panic!("Expected a point, got {:?}", other),
        }
        match read_back[1].attribute("value") {
            Some(AttrValue::Numeric(Some(v))) => assert!((v - 20.5).abs() < 1e-6),
            other => panic!("Expected numeric attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_make_layer_filters_fields() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("source.shp");
        let (fields, features) = point_features();
        write_features(&shp, GeometryKind::Point, &fields, &features).unwrap();

        let runtime = ShapefileRuntime::new();
        runtime
            .make_layer(
                &shp,
                "layer_a",
                &["VALUE".to_string(), "SHAPE@XY".to_string()],
            )
            .unwrap();

        let copy = dir.path().join("copy.shp");
        runtime.copy_features("layer_a", &copy).unwrap();
        runtime.delete_layer("layer_a").unwrap();

        let (info, read_back) = read_dataset(&copy).unwrap();
        assert_eq!(info.fields.len(), 1);
        assert_eq!(info.fields[0].name, "value");
        assert_eq!(read_back.len(), 2);
        assert!(read_back[0].attribute("name").is_none());
    }

    #[test]
    fn test_make_layer_unknown_field() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("source.shp");
        let (fields, features) = point_features();
        write_features(&shp, GeometryKind::Point, &fields, &features).unwrap();

        let runtime = ShapefileRuntime::new();
        let err = runtime
            .make_layer(&shp, "layer_b", &["nope".to_string()])
            .unwrap_err();
        assert!(matches!(err, Shp2OpenError::UnknownField { .. }));
    }

    #[test]
    fn test_delete_missing_layer() {
        let runtime = ShapefileRuntime::new();
        let err = runtime.delete_layer("ghost").unwrap_err();
        assert!(matches!(err, Shp2OpenError::NoSuchLayer(_)));
    }

    #[test]
    fn test_export_to_dir_copies_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("source.shp");
        let (fields, features) = point_features();
        write_features(&shp, GeometryKind::Point, &fields, &features).unwrap();
        std::fs::write(dir.path().join("source.prj"), WGS84_PRJ_WKT).unwrap();

        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let runtime = ShapefileRuntime::new();
        runtime.export_to_dir(&shp, &out).unwrap();

        assert!(out.join("source.shp").exists());
        assert!(out.join("source.dbf").exists());
        assert!(out.join("source.prj").exists());
    }

    #[test]
    fn test_mismatched_record_count_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("points.shp");
        let (fields, mut features) = point_features();
        write_features(&shp, GeometryKind::Point, &fields, &features).unwrap();

        // Table attributaire d'un seul enregistrement recopiée sur le
        // bundle à deux formes (bundle corrompu)
        let short = dir.path().join("short.shp");
        features.truncate(1);
        write_features(&short, GeometryKind::Point, &fields, &features).unwrap();
        std::fs::copy(short.with_extension("dbf"), shp.with_extension("dbf")).unwrap();

        let (info, read_back) = read_dataset(&shp).unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(info.feature_count, 1);
    }

    #[test]
    fn test_polyline_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("lines.shp");
        let features = vec![Feature {
            geometry: Geometry::MultiLineString(MultiLineString::new(vec![LineString::from(
                vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 5.0 }],
            )])),
            attributes: vec![],
        }];

        write_features(&shp, GeometryKind::Polyline, &[], &features).unwrap();
        let (info, read_back) = read_dataset(&shp).unwrap();
        assert_eq!(info.geometry, GeometryKind::Polyline);
        assert!(matches!(
            read_back[0].geometry,
            Geometry::MultiLineString(_)
        ));
    }
}
