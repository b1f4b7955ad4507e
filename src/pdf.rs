use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::{self, Write};

// Pixels are laid out at 96 dpi on a 72 dpi page
const POINTS_PER_PIXEL: f64 = 0.75;

/// Wraps a packed RGB raster into a single-page PDF document
///
/// The page is sized to the image. Pixel data is stored as a
/// FlateDecode image XObject.
///
/// # Arguments
/// * `rgb` - Packed 8-bit RGB pixels, row-major
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Errors
/// * `InvalidInput` if the buffer length does not match the dimensions
pub fn wrap_rgb_image(rgb: &[u8], width: u32, height: u32) -> io::Result<Vec<u8>> {
    if rgb.len() != (width as usize) * (height as usize) * 3 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "RGB buffer does not match the image dimensions",
        ));
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(rgb)?;
    let pixels = encoder.finish()?;

    let page_width = width as f64 * POINTS_PER_PIXEL;
    let page_height = height as f64 * POINTS_PER_PIXEL;
    let content = format!(
        "q\n{:.2} 0 0 {:.2} 0 0 cm\n/Im0 Do\nQ\n",
        page_width, page_height
    );

    let mut doc = PdfWriter::new();
    doc.object(b"<< /Type /Catalog /Pages 2 0 R >>");
    doc.object(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    doc.object(
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /XObject << /Im0 5 0 R >> >> /Contents 4 0 R >>",
            page_width, page_height
        )
        .as_bytes(),
    );
    doc.stream("", content.as_bytes());
    doc.stream(
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode",
            width, height
        ),
        &pixels,
    );
    Ok(doc.finish())
}

/// Sequentially numbered objects plus the cross-reference table
struct PdfWriter {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        PdfWriter {
            bytes: b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec(),
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.offsets.push(self.bytes.len());
        let header = format!("{} 0 obj\n", self.offsets.len());
        self.bytes.extend_from_slice(header.as_bytes());
    }

    fn object(&mut self, body: &[u8]) {
        self.begin();
        self.bytes.extend_from_slice(body);
        self.bytes.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, dictionary: &str, data: &[u8]) {
        self.begin();
        let header = format!("<< {} /Length {} >>\nstream\n", dictionary, data.len());
        self.bytes.extend_from_slice(header.as_bytes());
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_at = self.bytes.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            xref_at
        ));
        self.bytes.extend_from_slice(xref.as_bytes());
        self.bytes
    }
}
