use storefront_core::models::{ImageSurface, OwnerRef};
use storefront_core::AppError;

/// Resolve the `{surface}` path segment; unknown surfaces are 404.
pub fn parse_surface(segment: &str) -> Result<ImageSurface, AppError> {
    segment
        .parse::<ImageSurface>()
        .map_err(|_| AppError::NotFound(format!("Unknown image surface '{}'", segment)))
}

pub fn owner_ref(surface: ImageSurface, owner_entity_id: &str) -> Result<OwnerRef, AppError> {
    let owner_id = owner_entity_id.trim();
    if owner_id.is_empty() {
        return Err(AppError::InvalidInput("ownerEntityId is required".to_string()));
    }
    if owner_id.len() > 128 {
        return Err(AppError::InvalidInput(
            "ownerEntityId must be at most 128 characters".to_string(),
        ));
    }
    Ok(OwnerRef::new(surface, owner_id))
}
