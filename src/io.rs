use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbaImage};
use rfd::FileDialog;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::session::{CropBox, Drawing, EditAction, EditSession};
use crate::surface::Surface;

/// Maximum supported image dimension in pixels (per axis).
/// Prevents memory exhaustion from crafted session files.
const MAX_IMAGE_DIM: u32 = 32_768;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tiff", "tif"];

/// Extension of the native session format.
pub const SESSION_EXTENSION: &str = "json";

// ============================================================================
// EXPORT FORMATS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Jpeg,
    Webp,
    Bmp,
}

impl SaveFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "webp" => Some(SaveFormat::Webp),
            "bmp" => Some(SaveFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

// ============================================================================
// SESSION FILE FORMAT
// ============================================================================

/// Serializable session file. Pixels are stored as a flat RGBA byte array so
/// the file stays a plain JSON document a human can inspect.
#[derive(Serialize, Deserialize)]
struct SessionFile {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    crop_box: CropBox,
    drawings: Vec<Drawing>,
    undo_stack: Vec<EditAction>,
    redo_stack: Vec<EditAction>,
}

/// Write the whole session, original pixels and both history stacks
/// included, as JSON.
pub fn save_session(session: &EditSession, path: &Path) -> Result<(), String> {
    let original = session
        .original()
        .ok_or_else(|| "session has no image to save".to_string())?;
    let file = SessionFile {
        width: original.width(),
        height: original.height(),
        pixels: original.as_raw().clone(),
        crop_box: session.crop_box,
        drawings: session.drawings.clone(),
        undo_stack: session.undo_stack.clone(),
        redo_stack: session.redo_stack.clone(),
    };
    let out = File::create(path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    serde_json::to_writer(BufWriter::new(out), &file)
        .map_err(|e| format!("Failed to write session: {}", e))
}

/// Load a session saved by [`save_session`]. History stacks come back
/// intact, so undo works across restarts.
pub fn load_session(path: &Path) -> Result<EditSession, String> {
    let raw = std::fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let file: SessionFile =
        serde_json::from_slice(&raw).map_err(|e| format!("Invalid session file: {}", e))?;

    if file.width == 0 || file.height == 0 {
        return Err("Session image dimensions cannot be zero".into());
    }
    if file.width > MAX_IMAGE_DIM || file.height > MAX_IMAGE_DIM {
        return Err(format!(
            "Session image size {}x{} exceeds maximum allowed {}x{}",
            file.width, file.height, MAX_IMAGE_DIM, MAX_IMAGE_DIM
        ));
    }
    let expected = file.width as usize * file.height as usize * 4;
    if file.pixels.len() != expected {
        return Err(format!(
            "Session pixel buffer has {} bytes, expected {} ({}x{}x4)",
            file.pixels.len(),
            expected,
            file.width,
            file.height
        ));
    }

    let image = RgbaImage::from_raw(file.width, file.height, file.pixels)
        .ok_or_else(|| "Failed to reconstruct session pixels".to_string())?;

    let mut session = EditSession::default();
    session.init(image)?;
    session.crop_box = file.crop_box.clamped(file.width as f64, file.height as f64);
    session.drawings = file.drawings;
    session.undo_stack = file.undo_stack;
    session.redo_stack = file.redo_stack;
    Ok(session)
}

// ============================================================================
// IMAGE LOADING
// ============================================================================

/// Load any supported input into a fresh session. `.json` files are treated
/// as native session files; everything else goes through the `image` crate.
pub fn load_session_or_image(path: &Path) -> Result<EditSession, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if ext == SESSION_EXTENSION {
        return load_session(path);
    }

    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?
        .to_rgba8();
    let mut session = EditSession::default();
    session.init(img)?;
    Ok(session)
}

// ============================================================================
// FLATTEN & EXPORT
// ============================================================================

/// Flatten a session to its final pixels: replay every drawing over the
/// original, then cut out the crop box at 1:1 scale.
pub fn flatten(session: &EditSession) -> RgbaImage {
    let mut composite = Surface::new(1, 1);
    session.draw_to_canvas(&mut composite);
    let mut cropped = Surface::new(1, 1);
    session.crop_to_canvas(&composite, &mut cropped);
    cropped.to_image()
}

/// Encode and write an image. The format comes from the path's extension;
/// alpha is composited over white for JPEG since it carries no alpha channel.
pub fn export_image(image: &RgbaImage, path: &Path) -> Result<(), String> {
    let format = SaveFormat::from_path(path)
        .ok_or_else(|| format!("Unsupported export format: {}", path.display()))?;
    let file = File::create(path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(|e| format!("PNG encode error: {}", e))?;
        }
        SaveFormat::Jpeg => {
            let rgb = alpha_over_white(image);
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, 90);
            encoder
                .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
                .map_err(|e| format!("JPEG encode error: {}", e))?;
        }
        SaveFormat::Webp => {
            DynamicImage::ImageRgba8(image.clone())
                .save(path)
                .map_err(|e| format!("WebP encode error: {}", e))?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(|e| format!("BMP encode error: {}", e))?;
        }
    }

    Ok(())
}

fn alpha_over_white(image: &RgbaImage) -> image::RgbImage {
    let mut out = image::RgbImage::new(image.width(), image.height());
    for (x, y, p) in image.enumerate_pixels() {
        let a = p[3] as u32;
        let over = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        out.put_pixel(x, y, image::Rgb([over(p[0]), over(p[1]), over(p[2])]));
    }
    out
}

// ============================================================================
// FILE DIALOGS
// ============================================================================

pub fn pick_open_path() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter(
            "All Supported",
            &["json", "png", "jpg", "jpeg", "webp", "bmp", "tiff", "tif"],
        )
        .add_filter("Inkmark Session", &[SESSION_EXTENSION])
        .add_filter("Images", IMAGE_EXTENSIONS)
        .add_filter("All Files", &["*"])
        .pick_file()
}

pub fn pick_export_path(suggested: &str) -> Option<PathBuf> {
    FileDialog::new()
        .set_file_name(suggested)
        .add_filter("PNG", &["png"])
        .add_filter("JPEG", &["jpg", "jpeg"])
        .add_filter("WebP", &["webp"])
        .add_filter("BMP", &["bmp"])
        .save_file()
}

pub fn pick_session_path(suggested: &str) -> Option<PathBuf> {
    FileDialog::new()
        .set_file_name(suggested)
        .add_filter("Inkmark Session", &[SESSION_EXTENSION])
        .save_file()
}
