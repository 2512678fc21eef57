//! Image container classification
//!
//! Decodes an asset far enough to learn its real container format and turns
//! every outcome, including failures, into a [`Verdict`].

use image::{ImageError, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use super::cancel::{CancelToken, CancellableReader, Cancelled};
use super::verdict::Verdict;

/// The container every atlas asset is expected to be in.
pub const EXPECTED_FORMAT: ImageFormat = ImageFormat::Png;

const TGA_HEADER_LEN: usize = 18;

/// Human-readable container name, as shown in report lines.
pub fn format_name(format: ImageFormat) -> String {
    let name = match format {
        ImageFormat::Png => "PNG",
        ImageFormat::Jpeg => "JPEG",
        ImageFormat::Gif => "GIF",
        ImageFormat::WebP => "WEBP",
        ImageFormat::Bmp => "BMP",
        ImageFormat::Tga => "TGA",
        ImageFormat::Tiff => "TIFF",
        ImageFormat::Qoi => "QOI",
        ImageFormat::Ico => "ICO",
        ImageFormat::Pnm => "PNM",
        ImageFormat::Dds => "DDS",
        ImageFormat::Hdr => "HDR",
        ImageFormat::OpenExr => "EXR",
        ImageFormat::Farbfeld => "FARBFELD",
        ImageFormat::Avif => "AVIF",
        other => return format!("{other:?}").to_uppercase(),
    };
    name.to_string()
}

/// Classify a seekable byte stream.
///
/// Returns `Err(Cancelled)` when the run was cancelled while decoding; no
/// verdict exists for the asset in that case.
pub fn classify_stream<R: Read + Seek>(source: R, cancel: &CancelToken) -> Result<Verdict, Cancelled> {
    cancel.check()?;
    let reader = BufReader::new(CancellableReader::new(source, cancel.clone()));

    let verdict = match detect_format(reader) {
        Ok(None) => Verdict::Corrupt {
            detail: "unrecognized image format".to_string(),
        },
        Ok(Some((detected, reader))) => match reader.decode() {
            Ok(_) if detected == EXPECTED_FORMAT => Verdict::Ok,
            Ok(_) => Verdict::FormatMismatch {
                expected: format_name(EXPECTED_FORMAT),
                actual: format_name(detected),
            },
            Err(e) => image_error_verdict(e),
        },
        Err(e) => io_error_verdict(&e),
    };

    // A failure caused by the cancellable reader is not a real verdict.
    if cancel.is_cancelled() && verdict != Verdict::Ok {
        return Err(Cancelled);
    }
    Ok(verdict)
}

/// Sniff the container from magic bytes, falling back to a TGA header check
/// since TGA has no signature. The stream is rewound for decoding.
fn detect_format<R: BufRead + Seek>(reader: R) -> io::Result<Option<(ImageFormat, ImageReader<R>)>> {
    let guessed = ImageReader::new(reader).with_guessed_format()?;
    if let Some(format) = guessed.format() {
        return Ok(Some((format, guessed)));
    }

    let mut reader = guessed.into_inner();
    let start = reader.stream_position()?;
    let mut header = [0u8; TGA_HEADER_LEN];
    let complete = match reader.read_exact(&mut header) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e),
    };
    reader.seek(SeekFrom::Start(start))?;

    if complete && looks_like_tga(&header) {
        Ok(Some((ImageFormat::Tga, ImageReader::with_format(reader, ImageFormat::Tga))))
    } else {
        Ok(None)
    }
}

/// Plausibility check of an 18-byte TGA header.
pub fn looks_like_tga(header: &[u8]) -> bool {
    if header.len() < TGA_HEADER_LEN {
        return false;
    }
    let color_map_type = header[1];
    let image_type = header[2];
    let pixel_depth = header[16];

    matches!(color_map_type, 0 | 1)
        && matches!(image_type, 1 | 2 | 3 | 9 | 10 | 11)
        && matches!(pixel_depth, 8 | 15 | 16 | 24 | 32)
}

/// Classify a file on disk.
pub fn classify_file(path: &Path, cancel: &CancelToken) -> Result<Verdict, Cancelled> {
    match File::open(path) {
        Ok(file) => classify_stream(file, cancel),
        Err(e) => {
            cancel.check()?;
            Ok(io_error_verdict(&e))
        }
    }
}

/// Classify a forward-only stream, such as a decompressing archive entry.
///
/// The stream is drained into memory first; it is not used after this call.
pub fn classify_entry<R: Read>(entry: R, cancel: &CancelToken) -> Result<Verdict, Cancelled> {
    let mut bytes = Vec::new();
    if let Err(e) = CancellableReader::new(entry, cancel.clone()).read_to_end(&mut bytes) {
        cancel.check()?;
        return Ok(io_error_verdict(&e));
    }
    classify_stream(Cursor::new(bytes), cancel)
}

/// Truncated input counts as corrupt; anything else is an unreadable asset.
pub fn io_error_verdict(err: &io::Error) -> Verdict {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Verdict::Corrupt {
            detail: format!("truncated image data: {err}"),
        }
    } else {
        Verdict::Unreadable {
            kind: format!("{:?}", err.kind()),
            message: err.to_string(),
        }
    }
}

fn image_error_verdict(err: ImageError) -> Verdict {
    match err {
        ImageError::Decoding(e) => Verdict::Corrupt { detail: e.to_string() },
        ImageError::Unsupported(e) => Verdict::Corrupt { detail: e.to_string() },
        ImageError::IoError(e) => io_error_verdict(&e),
        other => Verdict::Unreadable {
            kind: image_error_kind(&other).to_string(),
            message: other.to_string(),
        },
    }
}

fn image_error_kind(err: &ImageError) -> &'static str {
    match err {
        ImageError::Limits(_) => "Limits",
        ImageError::Parameter(_) => "Parameter",
        ImageError::Encoding(_) => "Encoding",
        _ => "Image",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cancel::TrippingReader;
    use image::DynamicImage;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn encode(format: ImageFormat) -> Vec<u8> {
        encode_sized(format, 8)
    }

    fn encode_sized(format: ImageFormat, side: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(side, side)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn test_real_png_is_ok() {
        let verdict = classify_stream(Cursor::new(encode(ImageFormat::Png)), &CancelToken::new());
        assert_eq!(verdict, Ok(Verdict::Ok));
    }

    #[test]
    fn test_jpeg_is_mismatch() {
        let verdict = classify_stream(Cursor::new(encode(ImageFormat::Jpeg)), &CancelToken::new());
        assert_eq!(
            verdict,
            Ok(Verdict::FormatMismatch {
                expected: "PNG".to_string(),
                actual: "JPEG".to_string(),
            })
        );
    }

    #[test]
    fn test_tga_is_mismatch() {
        let bytes = encode(ImageFormat::Tga);
        assert!(looks_like_tga(&bytes));

        let verdict = classify_stream(Cursor::new(bytes), &CancelToken::new());
        assert_eq!(
            verdict,
            Ok(Verdict::FormatMismatch {
                expected: "PNG".to_string(),
                actual: "TGA".to_string(),
            })
        );
    }

    #[test]
    fn test_ppm_is_mismatch() {
        let mut bytes = b"P6\n2 2\n255\n".to_vec();
        bytes.extend_from_slice(&[255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255]);

        let verdict = classify_stream(Cursor::new(bytes), &CancelToken::new());
        assert_eq!(
            verdict,
            Ok(Verdict::FormatMismatch {
                expected: "PNG".to_string(),
                actual: "PNM".to_string(),
            })
        );
    }

    #[test]
    fn test_tga_header_check() {
        let mut header = [0u8; 18];
        header[2] = 2;
        header[16] = 32;
        assert!(looks_like_tga(&header));

        header[1] = 7;
        assert!(!looks_like_tga(&header));
        header[1] = 0;
        header[2] = 4;
        assert!(!looks_like_tga(&header));
        header[2] = 10;
        header[16] = 12;
        assert!(!looks_like_tga(&header));
        assert!(!looks_like_tga(&header[..10]));
    }

    #[test]
    fn test_cancel_during_decode_yields_no_verdict() {
        let cancel = CancelToken::new();
        let source = TrippingReader::new(encode_sized(ImageFormat::Jpeg, 64), cancel.clone());

        let verdict = classify_stream(source, &cancel);
        assert_eq!(verdict, Err(Cancelled));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let verdict = classify_stream(
            Cursor::new(b"definitely not an image".to_vec()),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(matches!(verdict, Verdict::Corrupt { .. }), "got {verdict:?}");
    }

    #[test]
    fn test_empty_input_is_corrupt() {
        let verdict = classify_stream(Cursor::new(Vec::new()), &CancelToken::new()).unwrap();
        assert!(matches!(verdict, Verdict::Corrupt { .. }), "got {verdict:?}");
    }

    #[test]
    fn test_truncated_png_is_not_ok() {
        let mut bytes = encode(ImageFormat::Png);
        bytes.truncate(bytes.len() / 2);

        let verdict = classify_stream(Cursor::new(bytes), &CancelToken::new()).unwrap();
        assert!(verdict.is_problem(), "got {verdict:?}");
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = tempfile::TempDir::new().unwrap();
        let verdict = classify_file(&dir.path().join("gone.png"), &CancelToken::new()).unwrap();
        assert!(
            matches!(verdict, Verdict::Unreadable { ref kind, .. } if kind == "NotFound"),
            "got {verdict:?}"
        );
    }

    #[test]
    fn test_classify_file_reads_from_disk() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&encode(ImageFormat::Bmp)).unwrap();
        temp_file.flush().unwrap();

        let verdict = classify_file(temp_file.path(), &CancelToken::new()).unwrap();
        assert_eq!(
            verdict,
            Verdict::FormatMismatch {
                expected: "PNG".to_string(),
                actual: "BMP".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_entry_buffers_stream() {
        let bytes = encode(ImageFormat::Png);
        let verdict = classify_entry(&bytes[..], &CancelToken::new());
        assert_eq!(verdict, Ok(Verdict::Ok));
    }

    #[test]
    fn test_cancelled_run_yields_no_verdict() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let verdict = classify_stream(Cursor::new(encode(ImageFormat::Png)), &cancel);
        assert_eq!(verdict, Err(Cancelled));
        let verdict = classify_entry(&b"garbage"[..], &cancel);
        assert_eq!(verdict, Err(Cancelled));
    }
}
