#![cfg(feature = "web")]
use crate::stats::{self, FamilyStatistics};
use plotters::prelude::*;
use std::error::Error;
use std::io::Cursor;
use std::str::FromStr;

/// Charts on the statistics page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatChart {
    /// Male and female head counts, titled with the ratio
    Gender,

    /// Head count per 10-year age bucket
    Age,

    /// Births per decade
    BirthDecade,

    /// Living against deceased
    Living,
}

impl StatChart {
    pub const ALL: [StatChart; 4] = [
        StatChart::Gender,
        StatChart::Age,
        StatChart::BirthDecade,
        StatChart::Living,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            StatChart::Gender => "gender",
            StatChart::Age => "age",
            StatChart::BirthDecade => "births",
            StatChart::Living => "living",
        }
    }

    /// Bars for this chart as (category label, count)
    pub fn data(&self, statistics: &FamilyStatistics) -> Vec<(String, u32)> {
        match self {
            StatChart::Gender => vec![
                ("M".to_string(), statistics.gender.male as u32),
                ("F".to_string(), statistics.gender.female as u32),
            ],
            StatChart::Age => statistics
                .age_buckets
                .iter()
                .map(|(lower, count)| (stats::age_bucket_label(*lower), *count as u32))
                .collect(),
            StatChart::BirthDecade => statistics
                .births_per_decade
                .iter()
                .map(|(decade, count)| (stats::decade_label(*decade), *count as u32))
                .collect(),
            StatChart::Living => vec![
                ("Living".to_string(), statistics.living as u32),
                ("Deceased".to_string(), statistics.deceased as u32),
            ],
        }
    }

    pub fn options(&self, statistics: &FamilyStatistics) -> GraphOptions {
        let (title, x_label) = match self {
            StatChart::Gender => (
                format!(
                    "Gender distribution (male to female ratio: {})",
                    statistics.gender.ratio_label()
                ),
                "Sex",
            ),
            StatChart::Age => ("Age distribution".to_string(), "Age"),
            StatChart::BirthDecade => ("Births per decade".to_string(), "Decade"),
            StatChart::Living => ("Living and deceased".to_string(), "Status"),
        };
        GraphOptions {
            title,
            x_label: x_label.to_string(),
            y_label: "People".to_string(),
            ..GraphOptions::default()
        }
    }
}

impl FromStr for StatChart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatChart::ALL
            .iter()
            .copied()
            .find(|chart| chart.slug() == s)
            .ok_or_else(|| format!("Unknown chart: {}", s))
    }
}

/// Configuration options for graph generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the graph
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,

    /// Bar fill
    pub color: RGBColor,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Graph".to_string(),
            x_label: "X Axis".to_string(),
            y_label: "Y Axis".to_string(),
            width: 800,
            height: 480,
            color: RGBColor(70, 130, 180),
        }
    }
}

/// Renders one statistics chart to PNG bytes
pub fn render_stat_chart(
    statistics: &FamilyStatistics,
    chart: StatChart,
) -> Result<Vec<u8>, Box<dyn Error>> {
    create_bar_graph(&chart.data(statistics), &chart.options(statistics))
}

/// Creates a bar graph over labelled categories
///
/// # Arguments
/// * `data` - (category label, count) pairs in display order
/// * `options` - Graph styling options
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
pub fn create_bar_graph(
    data: &[(String, u32)],
    options: &GraphOptions,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut buffer = vec![0u8; (options.width * options.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let categories = data.len().max(1) as u32;
        let max_y = data.iter().map(|(_, count)| *count).max().unwrap_or(0);

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..categories).into_segmented(), 0u32..max_y + 1)?;

        let label_of = |value: &SegmentValue<u32>| match value {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => data
                .get(*i as usize)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(data.len().max(1))
            .x_label_formatter(&label_of)
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(options.color.filled())
                .margin(12)
                .data(
                    data.iter()
                        .enumerate()
                        .map(|(i, (_, count))| (i as u32, *count)),
                ),
        )?;

        root.present()?;
    }

    encode_png(buffer, options.width, options.height)
}

/// Encodes a packed RGB buffer as PNG
pub fn encode_png(rgb: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, Box<dyn Error>> {
    let image = image::RgbImage::from_raw(width, height, rgb)
        .ok_or("RGB buffer does not match the image dimensions")?;

    let mut png = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image).write_to(&mut png, image::ImageOutputFormat::Png)?;
    Ok(png.into_inner())
}
