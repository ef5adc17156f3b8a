use image::codecs::jpeg::JpegEncoder;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;

pub const DEFAULT_QUALITY: u8 = 100;

/// Re-encodes `source` as a JPEG at `quality` inside `out_dir` and returns
/// the new file.
pub fn compress_image(source: &Path, out_dir: &Path, quality: u8) -> Result<PathBuf, String> {
    if !source.is_file() {
        return Err("compress_source_missing".into());
    }
    let img = image::open(source).map_err(|e| format!("open_failed:{e}"))?;
    let rgb = img.to_rgb8();

    fs::create_dir_all(out_dir).map_err(|e| format!("output_dir_create_failed:{e}"))?;
    let tmp = Builder::new()
        .prefix("ox_")
        .suffix(".jpg")
        .tempfile_in(out_dir)
        .map_err(|e| format!("tempfile_failed:{e}"))?;
    let (file, path) = tmp.keep().map_err(|e| format!("persist_failed:{e}"))?;

    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| format!("jpeg_encode_failed:{e}"))?;
    writer.flush().map_err(|e| format!("write_failed:{e}"))?;
    Ok(path)
}

pub fn clamp_quality(raw: Option<i64>) -> u8 {
    raw.map(|q| q.clamp(1, 100) as u8).unwrap_or(DEFAULT_QUALITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn writes_a_jpeg_into_out_dir() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.png");
        RgbImage::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]))
            .save(&source)
            .unwrap();

        let out_dir = dir.path().join("out");
        let out = compress_image(&source, &out_dir, 60).unwrap();
        assert!(out.starts_with(&out_dir));
        assert_eq!(out.extension().and_then(|e| e.to_str()), Some("jpg"));
        let reread = image::open(&out).unwrap();
        assert_eq!((reread.width(), reread.height()), (32, 32));
    }

    #[test]
    fn missing_source_fails() {
        let dir = tempdir().unwrap();
        let err = compress_image(&dir.path().join("nope.png"), dir.path(), 80).unwrap_err();
        assert_eq!(err, "compress_source_missing");
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(clamp_quality(None), 100);
        assert_eq!(clamp_quality(Some(0)), 1);
        assert_eq!(clamp_quality(Some(250)), 100);
        assert_eq!(clamp_quality(Some(42)), 42);
    }
}
