//! # fc-convert
//!
//! Convertit une feature class (shapefile source) en bundle shapefile
//! de publication, avec reprojection WGS 84 optionnelle, archive zip et
//! exports GeoJSON, KMZ, CSV et métadonnées Markdown.
//!
//! ## Usage CLI
//!
//! ```bash
//! # Export complet, reprojeté en WGS 84
//! fc-convert -i parcels.shp -f owner,address -o ./out -n parcels \
//!     --wgs84 --geojson --kmz --metadata
//!
//! # Requête sauvegardée
//! fc-convert --request ./request.json
//! ```

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod report;

pub use config::ConversionRequest;
pub use report::{RunReport, RunStatus};
