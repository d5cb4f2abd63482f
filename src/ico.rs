//! Single-frame ICO container writing, plus header inspection for existing icons.
//!
//! Frames are stored as 32-bit PNG payloads. The directory entry can only hold
//! edges up to 255; larger edges are written as 0 and the real size lives in the
//! PNG header, which is what Windows and most readers expect.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use serde::Serialize;
use std::path::Path;

use crate::error::{ConvertError, Result};

const ICONDIR_LEN: usize = 6;
const ICONDIRENTRY_LEN: usize = 16;
const RESOURCE_TYPE_ICON: u16 = 1;
const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const BITMAPINFOHEADER_LEN: u32 = 40;

/// How a frame's pixels are stored inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Png,
    Bmp,
}

/// One directory entry of an ICO file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    /// Width from the directory entry (a stored 0 reads as 256).
    pub declared_width: u32,
    pub declared_height: u32,
    /// Width from the payload header.
    pub width: u32,
    pub height: u32,
    pub bit_count: u16,
    pub payload: PayloadKind,
    pub size: u32,
    pub offset: u32,
}

/// Summary of an ICO file's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconInfo {
    pub frames: Vec<FrameInfo>,
}

/// Encode `image` as an ICO container holding exactly one PNG frame.
pub fn write_ico(image: &RgbaImage) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
        .map_err(|e| ConvertError::Encode(e.to_string()))?;

    let size = u32::try_from(png.len())
        .map_err(|_| ConvertError::Encode(format!("frame of {} bytes is too large", png.len())))?;
    let offset = (ICONDIR_LEN + ICONDIRENTRY_LEN) as u32;

    let mut out = Vec::with_capacity(ICONDIR_LEN + ICONDIRENTRY_LEN + png.len());
    // ICONDIR
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&RESOURCE_TYPE_ICON.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    // ICONDIRENTRY
    out.push(entry_dimension(width));
    out.push(entry_dimension(height));
    out.push(0); // palette size
    out.push(0); // reserved
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&32u16.to_le_bytes()); // bits per pixel
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());

    out.extend_from_slice(&png);
    Ok(out)
}

fn entry_dimension(edge: u32) -> u8 {
    if edge >= 256 { 0 } else { edge as u8 }
}

/// Parse the directory of an in-memory ICO file.
pub fn read_ico_info(bytes: &[u8]) -> Result<IconInfo> {
    parse(bytes, Path::new("<memory>"))
}

/// Read and parse the directory of the ICO file at `path`.
pub fn inspect(path: &Path) -> Result<IconInfo> {
    let bytes = read_file(path)?;
    parse(&bytes, path)
}

/// Decode the pixels of the first frame of an in-memory ICO file.
pub fn decode_frame(bytes: &[u8]) -> Result<RgbaImage> {
    let origin = Path::new("<memory>");
    let info = parse(bytes, origin)?;
    let first = &info.frames[0];
    let decode_err = |source| ConvertError::Decode {
        path: origin.to_path_buf(),
        source,
    };

    match first.payload {
        PayloadKind::Png => {
            let start = first.offset as usize;
            let payload = &bytes[start..start + first.size as usize];
            image::load_from_memory_with_format(payload, ImageFormat::Png)
                .map(|img| img.to_rgba8())
                .map_err(decode_err)
        }
        // BMP payloads carry no file header, so let the ICO decoder handle them.
        PayloadKind::Bmp => image::load_from_memory_with_format(bytes, ImageFormat::Ico)
            .map(|img| img.to_rgba8())
            .map_err(decode_err),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| ConvertError::Decode {
        path: path.to_path_buf(),
        source: image::ImageError::IoError(e),
    })
}

fn parse(bytes: &[u8], origin: &Path) -> Result<IconInfo> {
    if bytes.len() < ICONDIR_LEN {
        return Err(ConvertError::malformed(origin, "truncated header"));
    }
    if le_u16(bytes, 0) != 0 || le_u16(bytes, 2) != RESOURCE_TYPE_ICON {
        return Err(ConvertError::malformed(origin, "not an icon resource"));
    }
    let count = le_u16(bytes, 4) as usize;
    if count == 0 {
        return Err(ConvertError::malformed(origin, "icon has no frames"));
    }
    if bytes.len() < ICONDIR_LEN + count * ICONDIRENTRY_LEN {
        return Err(ConvertError::malformed(origin, "truncated directory"));
    }

    let mut frames = Vec::with_capacity(count);
    for i in 0..count {
        let at = ICONDIR_LEN + i * ICONDIRENTRY_LEN;
        let entry = &bytes[at..at + ICONDIRENTRY_LEN];
        let size = le_u32(entry, 8);
        let offset = le_u32(entry, 12);

        let end = (offset as usize)
            .checked_add(size as usize)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                ConvertError::malformed(origin, format!("frame {i} points past end of file"))
            })?;
        let payload = &bytes[offset as usize..end];
        let (kind, width, height) = payload_dimensions(payload)
            .ok_or_else(|| ConvertError::malformed(origin, format!("frame {i} has no image header")))?;

        frames.push(FrameInfo {
            declared_width: declared(entry[0]),
            declared_height: declared(entry[1]),
            width,
            height,
            bit_count: le_u16(entry, 6),
            payload: kind,
            size,
            offset,
        });
    }

    Ok(IconInfo { frames })
}

fn declared(byte: u8) -> u32 {
    if byte == 0 { 256 } else { byte as u32 }
}

fn payload_dimensions(payload: &[u8]) -> Option<(PayloadKind, u32, u32)> {
    if payload.starts_with(PNG_SIGNATURE) {
        // Signature, then the IHDR chunk: length, type, width, height (big endian).
        if payload.len() < 24 || &payload[12..16] != b"IHDR" {
            return None;
        }
        let width = u32::from_be_bytes(payload[16..20].try_into().ok()?);
        let height = u32::from_be_bytes(payload[20..24].try_into().ok()?);
        return Some((PayloadKind::Png, width, height));
    }

    if payload.len() < BITMAPINFOHEADER_LEN as usize || le_u32(payload, 0) < BITMAPINFOHEADER_LEN {
        return None;
    }
    let width = i32::from_le_bytes(payload[4..8].try_into().ok()?);
    // The stored height covers both the colour and the AND mask.
    let height = i32::from_le_bytes(payload[8..12].try_into().ok()?) / 2;
    Some((PayloadKind::Bmp, width.unsigned_abs(), height.unsigned_abs()))
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
