//! Reprojection de géométries avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use proj::Proj;

use crate::error::Shp2OpenError;

/// Reprojection de géométries entre deux systèmes de coordonnées
pub struct Reprojector {
    proj: Proj,
    source_epsg: u32,
    target_epsg: u32,
}

impl Reprojector {
    /// Crée un nouveau reprojector entre deux EPSG
    ///
    /// Le pipeline de transformation (changement de datum compris) est
    /// choisi par PROJ à partir du couple de codes.
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self, Shp2OpenError> {
        let source = format!("EPSG:{}", source_epsg);
        let target = format!("EPSG:{}", target_epsg);

        let proj = Proj::new_known_crs(&source, &target, None).map_err(|e| {
            Shp2OpenError::Reprojection(format!(
                "failed to create projection from {} to {}: {}",
                source, target, e
            ))
        })?;

        Ok(Self {
            proj,
            source_epsg,
            target_epsg,
        })
    }

    /// Retourne le SRID source
    pub fn source_epsg(&self) -> u32 {
        self.source_epsg
    }

    /// Retourne le SRID cible
    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry, Shp2OpenError> {
        if self.source_epsg == self.target_epsg {
            return Ok(geom.clone());
        }

        match geom {
            Geometry::Point(p) => {
                let (x, y) = self.transform_coord(p.0)?;
                Ok(Geometry::Point(Point::new(x, y)))
            }
            Geometry::MultiPoint(mp) => {
                let points: Result<Vec<Point>, Shp2OpenError> =
                    mp.0.iter()
                        .map(|p| {
                            let (x, y) = self.transform_coord(p.0)?;
                            Ok(Point::new(x, y))
                        })
                        .collect();
                Ok(Geometry::MultiPoint(MultiPoint::new(points?)))
            }
            Geometry::LineString(ls) => {
                Ok(Geometry::LineString(self.transform_linestring(ls)?))
            }
            Geometry::MultiLineString(mls) => {
                let lines: Result<Vec<LineString>, Shp2OpenError> = mls
                    .0
                    .iter()
                    .map(|ls| self.transform_linestring(ls))
                    .collect();
                Ok(Geometry::MultiLineString(MultiLineString::new(lines?)))
            }
            Geometry::Polygon(p) => Ok(Geometry::Polygon(self.transform_polygon(p)?)),
            Geometry::MultiPolygon(mp) => {
                let polys: Result<Vec<Polygon>, Shp2OpenError> =
                    mp.0.iter().map(|p| self.transform_polygon(p)).collect();
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polys?)))
            }
            other => Err(Shp2OpenError::Reprojection(format!(
                "unsupported geometry for reprojection: {:?}",
                other
            ))),
        }
    }

    fn transform_polygon(&self, polygon: &Polygon) -> Result<Polygon, Shp2OpenError> {
        let exterior = self.transform_linestring(polygon.exterior())?;
        let interiors: Result<Vec<LineString>, Shp2OpenError> = polygon
            .interiors()
            .iter()
            .map(|ls| self.transform_linestring(ls))
            .collect();
        Ok(Polygon::new(exterior, interiors?))
    }

    fn transform_linestring(&self, ls: &LineString) -> Result<LineString, Shp2OpenError> {
        let coords: Result<Vec<Coord>, Shp2OpenError> = ls
            .coords()
            .map(|c| {
                let (x, y) = self.transform_coord(*c)?;
                Ok(Coord { x, y })
            })
            .collect();
        Ok(LineString::new(coords?))
    }

    fn transform_coord(&self, coord: Coord) -> Result<(f64, f64), Shp2OpenError> {
        self.proj
            .convert((coord.x, coord.y))
            .map_err(|e| Shp2OpenError::Reprojection(e.to_string()))
    }
}
