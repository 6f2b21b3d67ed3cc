use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use super::ImageSurface;

/// How a variant is fitted to its target dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Fit within `max_dimension` on the longest side, preserving aspect ratio.
    #[default]
    Inside,
    /// Fill a `max_dimension` square box, cropping the overflow around the center.
    Cover,
}

/// One rendition to produce from a source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariantSpec {
    pub name: String,
    pub max_dimension: u32,
    /// JPEG quality, 1-100
    pub quality: u8,
    #[serde(default)]
    pub resize_mode: ResizeMode,
}

impl VariantSpec {
    pub fn inside(name: impl Into<String>, max_dimension: u32, quality: u8) -> Self {
        Self {
            name: name.into(),
            max_dimension,
            quality,
            resize_mode: ResizeMode::Inside,
        }
    }

    pub fn cover(name: impl Into<String>, max_dimension: u32, quality: u8) -> Self {
        Self {
            name: name.into(),
            max_dimension,
            quality,
            resize_mode: ResizeMode::Cover,
        }
    }
}

/// Ordered list of variant specs used for one kind of surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VariantProfile {
    pub specs: Vec<VariantSpec>,
}

impl VariantProfile {
    pub fn new(specs: Vec<VariantSpec>) -> Self {
        Self { specs }
    }

    /// thumb/small/big, used for product galleries
    pub fn product() -> Self {
        Self::new(vec![
            VariantSpec::inside("thumb", 200, 80),
            VariantSpec::inside("small", 300, 80),
            VariantSpec::inside("big", 900, 85),
        ])
    }

    /// thumb/middle/full, used for page and collection heroes
    pub fn hero() -> Self {
        Self::new(vec![
            VariantSpec::inside("thumb", 300, 80),
            VariantSpec::inside("middle", 1000, 85),
            VariantSpec::inside("full", 1900, 90),
        ])
    }

    pub fn gallery() -> Self {
        Self::new(vec![
            VariantSpec::cover("thumb", 300, 80),
            VariantSpec::inside("medium", 1000, 85),
            VariantSpec::inside("full", 1900, 90),
        ])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    /// Check that the profile can be handed to the variant builder.
    pub fn validate(&self) -> Result<(), String> {
        if self.specs.is_empty() {
            return Err("profile has no variants".to_string());
        }

        let mut seen = HashSet::new();
        for spec in &self.specs {
            if spec.name.trim().is_empty() {
                return Err("variant name must not be empty".to_string());
            }
            if !spec
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(format!("variant name '{}' contains invalid characters", spec.name));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(format!("duplicate variant name '{}'", spec.name));
            }
            if spec.max_dimension == 0 {
                return Err(format!("variant '{}' has a zero max dimension", spec.name));
            }
            if !(1..=100).contains(&spec.quality) {
                return Err(format!(
                    "variant '{}' quality {} is outside 1-100",
                    spec.name, spec.quality
                ));
            }
        }

        Ok(())
    }
}

/// Variant profiles for every surface, loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantProfiles {
    pub product: VariantProfile,
    pub hero: VariantProfile,
    pub gallery: VariantProfile,
}

impl Default for VariantProfiles {
    fn default() -> Self {
        Self {
            product: VariantProfile::product(),
            hero: VariantProfile::hero(),
            gallery: VariantProfile::gallery(),
        }
    }
}

impl VariantProfiles {
    pub fn for_surface(&self, surface: ImageSurface) -> &VariantProfile {
        match surface {
            ImageSurface::Products => &self.product,
            ImageSurface::Collections | ImageSurface::Pages => &self.hero,
            ImageSurface::Gallery => &self.gallery,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.product
            .validate()
            .map_err(|e| format!("product: {}", e))?;
        self.hero.validate().map_err(|e| format!("hero: {}", e))?;
        self.gallery
            .validate()
            .map_err(|e| format!("gallery: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_are_valid() {
        assert!(VariantProfiles::default().validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let profile = VariantProfile::new(vec![
            VariantSpec::inside("thumb", 200, 80),
            VariantSpec::inside("thumb", 400, 80),
        ]);
        assert!(profile.validate().unwrap_err().contains("duplicate"));
    }

    #[test]
    fn test_quality_bounds() {
        let profile = VariantProfile::new(vec![VariantSpec::inside("thumb", 200, 0)]);
        assert!(profile.validate().is_err());

        let profile = VariantProfile::new(vec![VariantSpec::inside("thumb", 200, 101)]);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_surface_profile_selection() {
        let profiles = VariantProfiles::default();
        let names: Vec<&str> = profiles.for_surface(ImageSurface::Pages).names().collect();
        assert_eq!(names, vec!["thumb", "middle", "full"]);
        let names: Vec<&str> = profiles
            .for_surface(ImageSurface::Products)
            .names()
            .collect();
        assert_eq!(names, vec!["thumb", "small", "big"]);
    }

    #[test]
    fn test_spec_json_defaults_to_inside() {
        let spec: VariantSpec =
            serde_json::from_str(r#"{"name":"thumb","maxDimension":300,"quality":80}"#).unwrap();
        assert_eq!(spec.resize_mode, ResizeMode::Inside);
        assert_eq!(spec.max_dimension, 300);
    }
}
