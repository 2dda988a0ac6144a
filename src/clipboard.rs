// ============================================================================
// CLIPBOARD — system clipboard copy via arboard
// ============================================================================

use image::RgbaImage;

use crate::log_info;

/// Read an RGBA image from the system clipboard, if one is present.
pub fn paste_from_system_clipboard() -> Result<RgbaImage, String> {
    let mut clip =
        arboard::Clipboard::new().map_err(|e| format!("Clipboard unavailable: {}", e))?;
    let data = clip
        .get_image()
        .map_err(|e| format!("No image on the clipboard: {}", e))?;
    RgbaImage::from_raw(
        data.width as u32,
        data.height as u32,
        data.bytes.into_owned(),
    )
    .ok_or_else(|| "Clipboard image has an unexpected pixel layout".to_string())
}

/// Write an RGBA image to the system clipboard.
/// arboard wants ImageData { width, height, bytes: Cow<[u8]> } in RGBA order.
pub fn copy_to_system_clipboard(img: &RgbaImage) -> Result<(), String> {
    let mut clip =
        arboard::Clipboard::new().map_err(|e| format!("Clipboard unavailable: {}", e))?;
    let data = arboard::ImageData {
        width: img.width() as usize,
        height: img.height() as usize,
        bytes: std::borrow::Cow::Borrowed(img.as_raw()),
    };
    clip.set_image(data)
        .map_err(|e| format!("Clipboard write failed: {}", e))?;
    log_info!(
        "Copied {}x{} selection to clipboard",
        img.width(),
        img.height()
    );
    Ok(())
}
