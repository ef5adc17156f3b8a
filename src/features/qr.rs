use rxing::common::HybridBinarizer;
use rxing::Exceptions;
use rxing::{
    BarcodeFormat, BinaryBitmap, DecodeHintValue, DecodeHints, Luma8LuminanceSource,
    MultiFormatReader, Reader,
};
use std::collections::HashSet;
use std::path::Path;

/// Reads a QR code out of an image file. `Ok(None)` means the image was
/// readable but held no code.
pub trait QrDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Option<String>, String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RxingDecoder;

impl QrDecoder for RxingDecoder {
    fn decode(&self, path: &Path) -> Result<Option<String>, String> {
        let img = image::open(path).map_err(|e| format!("open_failed:{e}"))?;
        let luma = img.to_luma8();
        let (width, height) = luma.dimensions();
        decode_luma(luma.into_raw(), width, height)
    }
}

/// Decodes a tightly packed luminance plane.
pub fn decode_luma(luma: Vec<u8>, width: u32, height: u32) -> Result<Option<String>, String> {
    let hints = DecodeHints::default()
        .with(DecodeHintValue::TryHarder(true))
        .with(DecodeHintValue::PossibleFormats(HashSet::from([BarcodeFormat::QR_CODE])));

    let source = Luma8LuminanceSource::new(luma, width, height);
    let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
    let mut reader = MultiFormatReader::default();

    match reader.decode_with_hints(&mut bitmap, &hints) {
        Ok(result) => Ok(Some(result.getText().to_string())),
        Err(Exceptions::NotFoundException(_)) => Ok(None),
        Err(e) => Err(format!("qr_decode_failed:{e:?}")),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};
    use qrcode::{Color, QrCode};
    use tempfile::tempdir;

    const MODULE_PX: u32 = 8;
    const QUIET_ZONE: u32 = 4;

    /// Writes a clean QR code for `text` as a PNG.
    pub(crate) fn write_qr_png(path: &Path, text: &str) {
        let code = QrCode::new(text.as_bytes()).unwrap();
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side = (modules + QUIET_ZONE * 2) * MODULE_PX;
        let img = ImageBuffer::from_fn(side, side, |x, y| {
            let mx = (x / MODULE_PX) as i64 - QUIET_ZONE as i64;
            let my = (y / MODULE_PX) as i64 - QUIET_ZONE as i64;
            let inside = mx >= 0 && my >= 0 && mx < modules as i64 && my < modules as i64;
            let dark = inside
                && matches!(
                    colors.get((my as u32 * modules + mx as u32) as usize),
                    Some(Color::Dark)
                );
            if dark {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        });
        img.save(path).unwrap();
    }

    #[test]
    fn decodes_generated_code() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("code.png");
        write_qr_png(&path, "nostr:npub1example");
        assert_eq!(
            RxingDecoder.decode(&path).unwrap(),
            Some("nostr:npub1example".to_string())
        );
    }

    #[test]
    fn blank_image_has_no_code() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.png");
        ImageBuffer::from_pixel(64, 64, Luma([255u8]))
            .save(&path)
            .unwrap();
        assert_eq!(RxingDecoder.decode(&path).unwrap(), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = RxingDecoder.decode(&dir.path().join("nope.png")).unwrap_err();
        assert!(err.starts_with("open_failed:"));
    }
}
