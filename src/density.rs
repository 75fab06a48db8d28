//! Minimal physical-density metadata reader/writer for JPEG and PNG.
//!
//! For JPEG: reads and rewrites the JFIF APP0 density fields (units,
//! Xdensity, Ydensity). For PNG: reads and rewrites the `pHYs` chunk
//! (pixels per metre).
//!
//! Only *physical* density counts. A JFIF header with units 0 carries an
//! aspect ratio, not a density, and a `pHYs` chunk with an unspecified unit
//! carries a ratio too; both read back as `None`.

use crate::engine::Resolution;
use image::ImageFormat;

const METERS_PER_INCH: f64 = 0.0254;
const CENTIMETERS_PER_INCH: f64 = 2.54;

const JFIF_IDENTIFIER: &[u8] = b"JFIF\0";
const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Read the declared physical density of an encoded image, in DPI.
pub(crate) fn read(bytes: &[u8], format: ImageFormat) -> Option<Resolution> {
    match format {
        ImageFormat::Jpeg => read_jpeg(bytes),
        ImageFormat::Png => read_png(bytes),
        _ => None,
    }
}

/// Stamp `density` (DPI) into an encoded image, returning the new bytes.
///
/// Existing density metadata is rewritten in place; absent metadata is
/// inserted (APP0 after SOI, `pHYs` after IHDR). Bytes that do not parse as
/// the expected container are returned unchanged.
pub(crate) fn stamp(bytes: Vec<u8>, format: ImageFormat, density: Resolution) -> Vec<u8> {
    match format {
        ImageFormat::Jpeg => stamp_jpeg(bytes, density),
        ImageFormat::Png => stamp_png(bytes, density),
        _ => bytes,
    }
}

// ---------------------------------------------------------------------------
// JPEG: JFIF APP0 density fields
// ---------------------------------------------------------------------------

/// Offsets of the density fields inside the APP0 segment data:
/// identifier (5) + version (2), then units (1), Xdensity (2), Ydensity (2).
const JFIF_UNITS_OFFSET: usize = 7;
const JFIF_DATA_MIN_LEN: usize = 12;

/// Walk the JPEG segment stream and return the start offset and data length
/// of the first JFIF APP0 segment. Scanning stops at SOS, where entropy-coded
/// data begins.
fn find_jfif_app0(data: &[u8]) -> Option<(usize, usize)> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        match marker {
            // Standalone markers carry no length field.
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // SOS or EOI: no APP0 ahead of the image data.
            0xD9 | 0xDA => return None,
            _ => {}
        }

        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > data.len() {
            return None;
        }
        let seg_start = pos + 4;
        let seg_data = &data[seg_start..pos + 2 + seg_len];

        if marker == 0xE0 && seg_data.starts_with(JFIF_IDENTIFIER) {
            return Some((seg_start, seg_data.len()));
        }
        pos += 2 + seg_len;
    }
    None
}

fn read_jpeg(data: &[u8]) -> Option<Resolution> {
    let (start, len) = find_jfif_app0(data)?;
    if len < JFIF_DATA_MIN_LEN {
        return None;
    }

    let units = data[start + JFIF_UNITS_OFFSET];
    let x = u16::from_be_bytes([data[start + 8], data[start + 9]]) as f64;
    let y = u16::from_be_bytes([data[start + 10], data[start + 11]]) as f64;

    match units {
        1 => Some(Resolution { x, y }),
        2 => Some(Resolution {
            x: x * CENTIMETERS_PER_INCH,
            y: y * CENTIMETERS_PER_INCH,
        }),
        // Units 0: pixel aspect ratio only, no physical density.
        _ => None,
    }
}

fn density_u16(value: f64) -> u16 {
    value.round().clamp(0.0, f64::from(u16::MAX)) as u16
}

fn stamp_jpeg(mut bytes: Vec<u8>, density: Resolution) -> Vec<u8> {
    let x = density_u16(density.x).to_be_bytes();
    let y = density_u16(density.y).to_be_bytes();

    if let Some((start, len)) = find_jfif_app0(&bytes) {
        if len >= JFIF_DATA_MIN_LEN {
            bytes[start + JFIF_UNITS_OFFSET] = 1;
            bytes[start + 8..start + 10].copy_from_slice(&x);
            bytes[start + 10..start + 12].copy_from_slice(&y);
        }
        return bytes;
    }

    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return bytes;
    }

    // No JFIF header present: insert a fresh APP0 right after SOI.
    let mut segment = Vec::with_capacity(18);
    segment.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    segment.extend_from_slice(JFIF_IDENTIFIER);
    segment.extend_from_slice(&[0x01, 0x01, 0x01]); // version 1.1, units = dpi
    segment.extend_from_slice(&x);
    segment.extend_from_slice(&y);
    segment.extend_from_slice(&[0x00, 0x00]); // no thumbnail
    bytes.splice(2..2, segment);
    bytes
}

// ---------------------------------------------------------------------------
// PNG: pHYs chunk
// ---------------------------------------------------------------------------

/// Locate a chunk by type. Returns the offset of the chunk's length field
/// and its data length. Scanning stops after IDAT; `pHYs` must precede it.
fn find_png_chunk(data: &[u8], kind: &[u8; 4]) -> Option<(usize, usize)> {
    if !data.starts_with(PNG_SIGNATURE) {
        return None;
    }

    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let chunk_type = &data[pos + 4..pos + 8];
        if pos + 12 + len > data.len() {
            return None;
        }
        if chunk_type == kind {
            return Some((pos, len));
        }
        if chunk_type == b"IDAT" || chunk_type == b"IEND" {
            return None;
        }
        pos += 12 + len;
    }
    None
}

fn read_png(data: &[u8]) -> Option<Resolution> {
    let (pos, len) = find_png_chunk(data, b"pHYs")?;
    if len != 9 {
        return None;
    }

    let body = &data[pos + 8..pos + 17];
    let x = u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as f64;
    let y = u32::from_be_bytes([body[4], body[5], body[6], body[7]]) as f64;
    match body[8] {
        // Unit 1: pixels per metre.
        1 => Some(Resolution {
            x: x * METERS_PER_INCH,
            y: y * METERS_PER_INCH,
        }),
        // Unit 0: aspect ratio only.
        _ => None,
    }
}

/// Assemble a full chunk: length, type, data, CRC over type + data.
fn png_chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(12 + data.len());
    chunk.extend_from_slice(&(data.len() as u32).to_be_bytes());
    chunk.extend_from_slice(kind);
    chunk.extend_from_slice(data);

    let crc = crc32fast::hash(&chunk[4..]);
    chunk.extend_from_slice(&crc.to_be_bytes());
    chunk
}

fn stamp_png(mut bytes: Vec<u8>, density: Resolution) -> Vec<u8> {
    let to_ppm = |dpi: f64| (dpi.max(0.0) / METERS_PER_INCH).round() as u32;

    let mut body = Vec::with_capacity(9);
    body.extend_from_slice(&to_ppm(density.x).to_be_bytes());
    body.extend_from_slice(&to_ppm(density.y).to_be_bytes());
    body.push(1); // pixels per metre
    let chunk = png_chunk(b"pHYs", &body);

    if let Some((pos, len)) = find_png_chunk(&bytes, b"pHYs") {
        bytes.splice(pos..pos + 12 + len, chunk);
        return bytes;
    }

    // Insert after IHDR, which is always the first chunk.
    if let Some((pos, len)) = find_png_chunk(&bytes, b"IHDR") {
        let insert_at = pos + 12 + len;
        bytes.splice(insert_at..insert_at, chunk);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 0.05
    }

    /// SOI + JFIF APP0 with the given units and densities + EOI.
    fn jfif_bytes(units: u8, x: u16, y: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        bytes.extend_from_slice(JFIF_IDENTIFIER);
        bytes.extend_from_slice(&[0x01, 0x01, units]);
        bytes.extend_from_slice(&x.to_be_bytes());
        bytes.extend_from_slice(&y.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x00]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    fn png_bytes(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        for chunk in chunks {
            bytes.extend_from_slice(chunk);
        }
        bytes
    }

    fn ihdr() -> Vec<u8> {
        // 1x1, 8-bit grayscale. The parser does not validate IHDR content.
        png_chunk(b"IHDR", &[0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0])
    }

    // =========================================================================
    // JPEG
    // =========================================================================

    #[test]
    fn jfif_dpi_units_read_as_declared() {
        let res = read(&jfif_bytes(1, 300, 240), ImageFormat::Jpeg).unwrap();
        assert_eq!((res.x, res.y), (300.0, 240.0));
    }

    #[test]
    fn jfif_dots_per_cm_convert_to_dpi() {
        let res = read(&jfif_bytes(2, 28, 28), ImageFormat::Jpeg).unwrap();
        assert!(approx(res.x, 71.12));
        assert!(approx(res.y, 71.12));
    }

    #[test]
    fn jfif_aspect_ratio_is_not_a_density() {
        assert_eq!(read(&jfif_bytes(0, 1, 1), ImageFormat::Jpeg), None);
    }

    #[test]
    fn jpeg_without_app0_has_no_density() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xD9];
        assert_eq!(read(&bytes, ImageFormat::Jpeg), None);
    }

    #[test]
    fn jpeg_zero_density_reads_back_as_zero() {
        // Zero is reported, not repaired; callers reject it.
        let res = read(&jfif_bytes(1, 0, 0), ImageFormat::Jpeg).unwrap();
        assert_eq!((res.x, res.y), (0.0, 0.0));
    }

    #[test]
    fn stamp_jpeg_rewrites_existing_header() {
        let bytes = stamp(
            jfif_bytes(0, 1, 1),
            ImageFormat::Jpeg,
            Resolution { x: 72.0, y: 72.0 },
        );
        let res = read(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((res.x, res.y), (72.0, 72.0));
    }

    #[test]
    fn stamp_jpeg_inserts_header_when_absent() {
        let bytes = stamp(
            vec![0xFF, 0xD8, 0xFF, 0xD9],
            ImageFormat::Jpeg,
            Resolution { x: 96.0, y: 96.0 },
        );
        let res = read(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((res.x, res.y), (96.0, 96.0));
        // Still terminated by EOI.
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn stamp_jpeg_leaves_non_jpeg_bytes_alone() {
        let garbage = vec![0x00, 0x01, 0x02];
        let stamped = stamp(
            garbage.clone(),
            ImageFormat::Jpeg,
            Resolution { x: 72.0, y: 72.0 },
        );
        assert_eq!(stamped, garbage);
    }

    // =========================================================================
    // PNG
    // =========================================================================

    #[test]
    fn phys_metre_units_convert_to_dpi() {
        let phys = png_chunk(b"pHYs", &{
            let mut body = Vec::new();
            body.extend_from_slice(&2835u32.to_be_bytes());
            body.extend_from_slice(&2835u32.to_be_bytes());
            body.push(1);
            body
        });
        let bytes = png_bytes(&[ihdr(), phys, png_chunk(b"IEND", &[])]);
        let res = read(&bytes, ImageFormat::Png).unwrap();
        assert!(approx(res.x, 72.0));
        assert!(approx(res.y, 72.0));
    }

    #[test]
    fn phys_unknown_unit_is_not_a_density() {
        let phys = png_chunk(b"pHYs", &{
            let mut body = Vec::new();
            body.extend_from_slice(&2835u32.to_be_bytes());
            body.extend_from_slice(&2835u32.to_be_bytes());
            body.push(0);
            body
        });
        let bytes = png_bytes(&[ihdr(), phys, png_chunk(b"IEND", &[])]);
        assert_eq!(read(&bytes, ImageFormat::Png), None);
    }

    #[test]
    fn png_without_phys_has_no_density() {
        let bytes = png_bytes(&[ihdr(), png_chunk(b"IEND", &[])]);
        assert_eq!(read(&bytes, ImageFormat::Png), None);
    }

    #[test]
    fn stamp_png_inserts_after_ihdr() {
        let bytes = png_bytes(&[ihdr(), png_chunk(b"IEND", &[])]);
        let stamped = stamp(bytes, ImageFormat::Png, Resolution { x: 72.0, y: 72.0 });
        let res = read(&stamped, ImageFormat::Png).unwrap();
        assert!(approx(res.x, 72.0));

        // The inserted chunk sits between IHDR and IEND.
        let (phys_pos, _) = find_png_chunk(&stamped, b"pHYs").unwrap();
        let (ihdr_pos, ihdr_len) = find_png_chunk(&stamped, b"IHDR").unwrap();
        assert_eq!(phys_pos, ihdr_pos + 12 + ihdr_len);
    }

    #[test]
    fn stamp_png_replaces_existing_chunk() {
        let bytes = png_bytes(&[ihdr(), png_chunk(b"IEND", &[])]);
        let once = stamp(bytes, ImageFormat::Png, Resolution { x: 300.0, y: 300.0 });
        let twice = stamp(
            once.clone(),
            ImageFormat::Png,
            Resolution { x: 72.0, y: 72.0 },
        );
        assert_eq!(once.len(), twice.len());
        let res = read(&twice, ImageFormat::Png).unwrap();
        assert!(approx(res.x, 72.0));
    }
}
