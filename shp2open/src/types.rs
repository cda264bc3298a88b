//! Types de données pour le crate shp2open

use geo::Geometry;
use std::fmt;

/// Type de géométrie d'un jeu de données vectoriel
///
/// Correspond aux quatre types de feature class gérés par l'outil
/// (les variantes M/Z des shapefiles ne sont pas supportées).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    Polyline,
    Polygon,
}

impl GeometryKind {
    /// Vrai pour les géométries ponctuelles (seules éligibles au CSV)
    pub fn is_point_like(self) -> bool {
        matches!(self, Self::Point | Self::MultiPoint)
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::Polyline => "Polyline",
            Self::Polygon => "Polygon",
        };
        write!(f, "{}", name)
    }
}

/// Type d'un champ attributaire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// Texte (dbf Character, Memo, Date formatée)
    Character,
    /// Numérique (dbf Numeric, Float, Integer, Double, Currency)
    Numeric,
    /// Booléen (dbf Logical)
    Logical,
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Character => "text",
            Self::Numeric => "number",
            Self::Logical => "boolean",
        };
        write!(f, "{}", name)
    }
}

/// Valeur d'un champ attributaire
///
/// Les valeurs dbf sont ramenées à trois familles; `None` représente
/// une valeur absente dans la table source.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Character(Option<String>),
    Numeric(Option<f64>),
    Logical(Option<bool>),
}

impl AttrValue {
    /// Famille de la valeur
    pub fn kind(&self) -> AttrKind {
        match self {
            Self::Character(_) => AttrKind::Character,
            Self::Numeric(_) => AttrKind::Numeric,
            Self::Logical(_) => AttrKind::Logical,
        }
    }

    /// Rendu texte (chaîne vide pour une valeur absente)
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Character(Some(s)) => s.clone(),
            Self::Numeric(Some(n)) => format!("{}", n),
            Self::Logical(Some(b)) => format!("{}", b),
            _ => String::new(),
        }
    }
}

/// Définition d'un champ attributaire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Nom du champ (tel que stocké dans le .dbf)
    pub name: String,

    /// Famille de valeurs
    pub kind: AttrKind,
}

/// Description d'un jeu de données (résultat du describe)
#[derive(Debug, Clone)]
pub struct DatasetInfo {
    /// Type de géométrie du jeu
    pub geometry: GeometryKind,

    /// Champs attributaires, dans l'ordre de la table
    pub fields: Vec<FieldDef>,

    /// Nombre d'enregistrements
    pub feature_count: usize,
}

/// Une feature avec sa géométrie et ses attributs
///
/// Les attributs sont ordonnés comme les champs de la table source
/// (un Vec plutôt qu'une map, l'ordre des colonnes est significatif
/// pour les exports CSV et GeoJSON).
#[derive(Debug, Clone)]
pub struct Feature {
    /// Géométrie (Point, MultiPoint, MultiLineString ou MultiPolygon)
    pub geometry: Geometry,

    /// Attributs (nom -> valeur), dans l'ordre de la table
    pub attributes: Vec<(String, AttrValue)>,
}

impl Feature {
    /// Récupère un attribut par nom
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_like() {
        assert!(GeometryKind::Point.is_point_like());
        assert!(GeometryKind::MultiPoint.is_point_like());
        assert!(!GeometryKind::Polyline.is_point_like());
        assert!(!GeometryKind::Polygon.is_point_like());
    }

    #[test]
    fn test_geometry_kind_display() {
        assert_eq!(GeometryKind::Polygon.to_string(), "Polygon");
        assert_eq!(GeometryKind::MultiPoint.to_string(), "MultiPoint");
    }

    #[test]
    fn test_attr_display_string() {
        assert_eq!(
            AttrValue::Character(Some("abc".into())).to_display_string(),
            "abc"
        );
        assert_eq!(AttrValue::Numeric(Some(3.5)).to_display_string(), "3.5");
        assert_eq!(AttrValue::Numeric(Some(42.0)).to_display_string(), "42");
        assert_eq!(AttrValue::Logical(None).to_display_string(), "");
    }
}
