use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Admin surface that owns a list of image bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageSurface {
    Products,
    Collections,
    Pages,
    Gallery,
}

impl ImageSurface {
    pub const ALL: [ImageSurface; 4] = [
        ImageSurface::Products,
        ImageSurface::Collections,
        ImageSurface::Pages,
        ImageSurface::Gallery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSurface::Products => "products",
            ImageSurface::Collections => "collections",
            ImageSurface::Pages => "pages",
            ImageSurface::Gallery => "gallery",
        }
    }

    /// Storage folder under which this surface's bundles are written.
    pub fn base_path(&self) -> &'static str {
        match self {
            ImageSurface::Products => "product-images",
            ImageSurface::Collections => "collections/hero",
            ImageSurface::Pages => "pages/hero",
            ImageSurface::Gallery => "media-library",
        }
    }
}

impl FromStr for ImageSurface {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "products" | "product" => Ok(ImageSurface::Products),
            "collections" | "collection" => Ok(ImageSurface::Collections),
            "pages" | "page" => Ok(ImageSurface::Pages),
            "gallery" => Ok(ImageSurface::Gallery),
            _ => Err(anyhow::anyhow!("Unknown image surface: {}", s)),
        }
    }
}

impl Display for ImageSurface {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// The entity (product, collection, page, gallery) a bundle list belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub surface: ImageSurface,
    pub owner_id: String,
}

impl OwnerRef {
    pub fn new(surface: ImageSurface, owner_id: impl Into<String>) -> Self {
        Self {
            surface,
            owner_id: owner_id.into(),
        }
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.surface, self.owner_id)
    }
}
