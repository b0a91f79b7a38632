//! End-to-end tests through the public API with the real codec backend.
//!
//! Sources are generated in memory; nothing touches the filesystem except
//! the zip round trip, which stays in a buffer.

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbImage};
use pixel_squeeze::export;
use pixel_squeeze::imaging::{ImageBackend, OutputFormat, RequestedFormat, RustBackend};
use pixel_squeeze::process::process_batch;
use pixel_squeeze::search::{CompressionSettings, ResultFormat, SearchOptions};
use pixel_squeeze::session::{BatchSession, IncomingFile};
use std::io::{Cursor, Read};

fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 4 % 256) as u8, (y * 4 % 256) as u8, 96])
    });
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

const LOGO_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
    <!-- exported by hand -->
    <rect x = "0" y = "0" width = "10" height = "10" fill = "red" />
</svg>
"#;

fn batch(settings: &CompressionSettings) -> BatchSession {
    let mut session = BatchSession::default();
    let report = session.add([
        IncomingFile::new("gradient.png", "image/png", gradient_png(64, 64)),
        IncomingFile::new("logo.svg", "image/svg+xml", LOGO_SVG.as_bytes().to_vec()),
    ]);
    assert!(report.rejected.is_empty());
    let summary = process_batch(
        &mut session,
        &RustBackend::new(),
        settings,
        &SearchOptions::default(),
        None,
    );
    assert_eq!(summary.failed, 0, "{:?}", session.entries());
    session
}

#[test]
fn auto_search_produces_consistent_results() {
    let session = batch(&CompressionSettings::default());
    let backend = RustBackend::new();

    let png = session.get("gradient.png").unwrap().result().unwrap();
    assert_eq!(
        png.byte_size_delta,
        png.original_size as i64 - png.size() as i64
    );
    let decoded = backend.decode(&png.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 64));
    match png.format {
        ResultFormat::Original => assert!(png.diff_overlay.is_none()),
        ResultFormat::Encoded(_) => {
            let overlay = png.diff_overlay.as_ref().expect("diff overlay");
            assert_eq!(overlay.dimensions(), (64, 64));
        }
        ResultFormat::Svg => panic!("raster source produced SVG"),
    }

    let svg = session.get("logo.svg").unwrap().result().unwrap();
    assert_eq!(svg.format, ResultFormat::Svg);
    assert_eq!(svg.file_name, "logo.min.svg");
    assert!(svg.byte_size_delta > 0);
    let text = std::str::from_utf8(&svg.bytes).unwrap();
    assert!(!text.contains("<!--"));
    assert!(text.contains(r#"<rect x="0" y="0" width="10" height="10" fill="red"/>"#));
}

#[test]
fn pinned_jpeg_is_honoured() {
    let settings =
        CompressionSettings::new(RequestedFormat::Pinned(OutputFormat::Jpeg), 75, true);
    let mut session = BatchSession::default();
    session.add([IncomingFile::new(
        "gradient.png",
        "image/png",
        gradient_png(48, 32),
    )]);

    process_batch(
        &mut session,
        &RustBackend::new(),
        &settings,
        &SearchOptions::default(),
        None,
    );

    let result = session.entries()[0].result().unwrap();
    assert_eq!(result.format, ResultFormat::Encoded(OutputFormat::Jpeg));
    assert_eq!(result.file_name, "gradient_optimized.jpg");
    assert_eq!(result.mime_type, "image/jpeg");
    assert!(result.quality.is_some());
    let decoded = RustBackend::new().decode(&result.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (48, 32));
}

#[test]
fn svg_source_with_pinned_raster_fails_only_that_file() {
    let settings = CompressionSettings::new(RequestedFormat::Pinned(OutputFormat::Png), 80, true);
    let mut session = BatchSession::default();
    session.add([
        IncomingFile::new("logo.svg", "image/svg+xml", LOGO_SVG.as_bytes().to_vec()),
        IncomingFile::new("gradient.png", "image/png", gradient_png(16, 16)),
    ]);

    let summary = process_batch(
        &mut session,
        &RustBackend::new(),
        &settings,
        &SearchOptions::default(),
        None,
    );

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 1);
    assert!(session.get("logo.svg").unwrap().error().is_some());
    let png = session.get("gradient.png").unwrap().result().unwrap();
    assert_eq!(png.format, ResultFormat::Encoded(OutputFormat::Png));
}

#[test]
fn results_are_deterministic() {
    let settings = CompressionSettings::default();
    let first = batch(&settings);
    let second = batch(&settings);
    let sizes = |session: &BatchSession| {
        session
            .completed()
            .map(|(_, r)| (r.file_name.clone(), r.format, r.bytes.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(sizes(&first), sizes(&second));
}

#[test]
fn archive_contains_every_result() {
    let session = batch(&CompressionSettings::default());
    let mut buf = Cursor::new(Vec::new());

    let summary = export::write_archive(&session, &mut buf).unwrap();
    assert_eq!(summary.file_names.len(), 2);

    let mut archive = zip::ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
    assert_eq!(archive.len(), 2);
    for (entry, result) in session.completed() {
        let mut file = archive.by_name(&result.file_name).unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        assert_eq!(content, result.bytes, "{}", entry.source.name());
    }
}
