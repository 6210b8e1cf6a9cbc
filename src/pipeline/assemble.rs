//! PDF assembly: gather captured images into merged or per-page PDFs.
//!
//! Images are embedded as PDF XObjects, one image per page, with the page's
//! media box sized from the image's pixel dimensions at the capture density
//! (96 px/inch). Because filenames embed zero-padded page numbers, a plain
//! lexicographic sort yields correct page order.
//!
//! The assembler runs only after all captures and transforms are complete,
//! so it always sees a stable, fully-populated image directory.

use crate::error::SnapError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Pixel density captures are assumed to have, for page sizing.
const PX_PER_INCH: f32 = 96.0;
const PT_PER_INCH: f32 = 72.0;

/// Assemble PDFs from the images in `image_dir`.
///
/// * `extension` — eligible file extension, e.g. `"png"` or `"jpg"`.
/// * `merge` — true: one PDF holding every image in filename order at
///   `pdf_dir/output_name`; false: one `{stem}.pdf` per image in `pdf_dir`.
///
/// Returns the number of PDF files written. Fails with
/// [`SnapError::NoEligibleImages`] when the directory holds no matching
/// file, and with [`SnapError::PdfEncodeFailed`] when embedding or saving
/// raises. In per-page mode, files written before a failure remain on disk.
pub fn assemble(
    image_dir: &Path,
    pdf_dir: &Path,
    extension: &str,
    merge: bool,
    output_name: &str,
) -> Result<usize, SnapError> {
    fs::create_dir_all(pdf_dir).map_err(|e| SnapError::OutputIo {
        path: pdf_dir.to_path_buf(),
        source: e,
    })?;

    let images = eligible_images(image_dir, extension)?;

    if merge {
        let out_path = pdf_dir.join(output_name);
        write_pdf(&images, &out_path)?;
        info!(pages = images.len(), pdf = %out_path.display(), "wrote merged PDF");
        Ok(1)
    } else {
        let mut written = 0;
        for image in &images {
            let stem = image
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "page".to_string());
            let out_path = pdf_dir.join(format!("{stem}.pdf"));
            write_pdf(std::slice::from_ref(image), &out_path)?;
            debug!(pdf = %out_path.display(), "wrote per-page PDF");
            written += 1;
        }
        info!(count = written, dir = %pdf_dir.display(), "wrote per-page PDFs");
        Ok(written)
    }
}

/// Files in `dir` with the given extension (case-insensitive), sorted
/// lexicographically by filename.
fn eligible_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, SnapError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "image directory unreadable");
            return Err(SnapError::NoEligibleImages {
                dir: dir.to_path_buf(),
            });
        }
    };

    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        })
        .collect();

    if images.is_empty() {
        return Err(SnapError::NoEligibleImages {
            dir: dir.to_path_buf(),
        });
    }

    images.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(images)
}

/// Write one PDF containing every image as a full-bleed page, in order.
fn write_pdf(images: &[PathBuf], out_path: &Path) -> Result<(), SnapError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(images.len());
    for image in images {
        let page_id = append_image_page(&mut doc, pages_id, image)?;
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(out_path).map_err(|e| SnapError::OutputIo {
        path: out_path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;
    Ok(())
}

/// Embed one image as a new page under `pages_id` and return the page id.
fn append_image_page(
    doc: &mut Document,
    pages_id: (u32, u16),
    image_path: &Path,
) -> Result<(u32, u16), SnapError> {
    let (px_width, px_height) =
        image::image_dimensions(image_path).map_err(|e| SnapError::PdfEncodeFailed {
            detail: format!("read {}: {e}", image_path.display()),
        })?;
    let bytes = fs::read(image_path).map_err(|e| SnapError::PdfEncodeFailed {
        detail: format!("read {}: {e}", image_path.display()),
    })?;

    let xobject = lopdf::xobject::image_from(bytes).map_err(|e| SnapError::PdfEncodeFailed {
        detail: format!("embed {}: {e}", image_path.display()),
    })?;
    let image_id = doc.add_object(xobject);

    let pt_width = px_width as f32 * PT_PER_INCH / PX_PER_INCH;
    let pt_height = px_height as f32 * PT_PER_INCH / PX_PER_INCH;

    // q / cm / Do / Q: scale the unit-square image to fill the media box.
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    pt_width.into(),
                    0.into(),
                    0.into(),
                    pt_height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content.encode().map_err(|e| SnapError::PdfEncodeFailed {
        detail: format!("content stream: {e}"),
    })?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), pt_width.into(), pt_height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });
    Ok(page_id)
}
