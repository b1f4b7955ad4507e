#![cfg(not(tarpaulin_include))]

use crate::flatten::FlattenedTree;
use std::error::Error;
use std::str::FromStr;

/// Download formats offered for a rendered tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Pdf,
    Svg,
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn filename(&self) -> &'static str {
        match self {
            ExportFormat::Png => "family_sunburst.png",
            ExportFormat::Pdf => "family_sunburst.pdf",
            ExportFormat::Svg => "family_sunburst.svg",
            ExportFormat::Csv => "family_tree.csv",
            ExportFormat::Xlsx => "family_tree.xlsx",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "pdf" => Ok(ExportFormat::Pdf),
            "svg" => Ok(ExportFormat::Svg),
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(format!("Unsupported export format: {}", other)),
        }
    }
}

/// A downloadable buffer with its fixed name and MIME type
#[derive(Clone, Debug, PartialEq)]
pub struct ExportFile {
    pub filename: &'static str,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    pub fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        ExportFile {
            filename: format.filename(),
            mime: format.mime(),
            bytes,
        }
    }
}

/// Renders or serializes `tree` in the requested format
///
/// # Arguments
/// * `tree` - Flattened tree to export
/// * `colors` - Fill colour per sex, used by the chart formats
/// * `context` - Session render state (zoom)
/// * `format` - Target format
///
/// # Returns
/// * `Result<ExportFile, Box<dyn Error>>` - The file bytes or an error
#[cfg(feature = "web")]
pub fn export_tree(
    tree: &FlattenedTree,
    colors: &crate::sunburst::SexColors,
    context: &crate::session::RenderContext,
    format: ExportFormat,
) -> Result<ExportFile, Box<dyn Error>> {
    use crate::sunburst::{render_png, render_rgb, render_svg};

    let bytes = match format {
        ExportFormat::Png => render_png(tree, colors, context)?,
        ExportFormat::Svg => render_svg(tree, colors, context)?.into_bytes(),
        ExportFormat::Pdf => {
            let (rgb, size) = render_rgb(tree, colors, context)?;
            crate::pdf::wrap_rgb_image(&rgb, size, size)?
        }
        ExportFormat::Csv => to_csv(tree).into_bytes(),
        ExportFormat::Xlsx => to_xlsx(tree)?,
    };
    Ok(ExportFile::new(format, bytes))
}

const TABLE_HEADERS: [&str; 5] = ["id", "label", "parent", "sex", "hover"];

fn table_rows(tree: &FlattenedTree) -> impl Iterator<Item = [String; 5]> + '_ {
    tree.nodes().map(|node| {
        [
            node.id.to_string(),
            node.label.to_string(),
            node.parent.unwrap_or("").to_string(),
            node.sex.code().to_string(),
            node.hover.to_string(),
        ]
    })
}

/// Convert the flattened tree to CSV format
///
/// Fields containing commas, quotes or newlines are quoted with inner
/// quotes doubled.
pub fn to_csv(tree: &FlattenedTree) -> String {
    let mut csv_content = TABLE_HEADERS.join(",");
    csv_content.push('\n');

    for row in table_rows(tree) {
        let escaped: Vec<String> = row.iter().map(|value| escape_csv(value)).collect();
        csv_content.push_str(&escaped.join(","));
        csv_content.push('\n');
    }

    csv_content
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert the flattened tree to XLSX format using rust_xlsxwriter
#[cfg(feature = "web")]
pub fn to_xlsx(tree: &FlattenedTree) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Format, Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Family tree")?;

    let bold = Format::new().set_bold();
    for (col, header) in TABLE_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (r, row) in table_rows(tree).enumerate() {
        for (c, value) in row.iter().enumerate() {
            worksheet.write_string((r + 1) as u32, c as u16, value.as_str())?;
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}
