//! Sheet geometry: from detected markers to a normalized sheet frame, and from
//! normalized question boxes to cropped images.
//!
//! ```
//! use bubblesheet_core::{GrayImage, NormRect};
//! use bubblesheet_geometry::{crop_region, SheetGeometry};
//!
//! let sheet = GrayImage::filled(100, 50, 255);
//! let geometry = SheetGeometry::identity(100, 50);
//! let region = crop_region(&sheet.view(), &geometry, 0, &NormRect::new(0.0, 0.0, 0.5, 1.0)).unwrap();
//! assert_eq!((region.image.width, region.image.height), (50, 50));
//! ```

mod crop;
mod error;
mod geometry;
mod layout;
mod quad;
mod resolve;

pub use crop::{crop_region, QuestionRegion};
pub use error::GeometryError;
pub use geometry::SheetGeometry;
pub use layout::MarkerLayout;
pub use quad::SheetQuad;
pub use resolve::{order_clockwise, resolve_geometry, select_outer_markers, ResolveParams};
