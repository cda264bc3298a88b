//! # shp2open
//!
//! Accès aux bundles shapefile et conversions vers les formats ouverts
//! (GeoJSON, KMZ, CSV, métadonnées Markdown, archive zip).
//!
//! ## Features
//!
//! - Runtime vectoriel [`ShapefileRuntime`] (describe, couches
//!   transientes filtrées, copie, reprojection, export)
//! - Reprojection PROJ derrière le feature `reproject` (activé par
//!   défaut)
//! - Convertisseurs [`Export`] et [`convert::geojson::to_open`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shp2open::{Export, ShapefileRuntime, VectorRuntime};
//! use std::path::Path;
//!
//! let runtime = ShapefileRuntime::new();
//! let info = runtime.describe(Path::new("parcels.shp"))?;
//! println!("{} features ({})", info.feature_count, info.geometry);
//!
//! let export = Export::new("/data/out", "parcels", false);
//! export.zip()?;
//! ```

pub mod convert;
pub mod error;
pub mod runtime;
pub mod types;

pub use convert::Export;
pub use error::Shp2OpenError;
pub use runtime::{ShapefileRuntime, VectorRuntime};
pub use types::{AttrKind, AttrValue, DatasetInfo, Feature, FieldDef, GeometryKind};
