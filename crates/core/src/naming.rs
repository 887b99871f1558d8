//! Object naming for images written to storage.

/// Default extension for stored images.
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// Generate a collision-free object name: 32 hex chars plus extension.
pub fn generate_object_name(extension: &str) -> String {
    format!("{}.{extension}", uuid::Uuid::new_v4().simple())
}

/// File extension for an image MIME type, falling back to
/// [`DEFAULT_IMAGE_EXTENSION`].
pub fn extension_for_mime_type(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        _ => DEFAULT_IMAGE_EXTENSION,
    }
}
