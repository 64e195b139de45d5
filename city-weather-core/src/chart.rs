//! Bar chart rendering of one weather column across cities.

use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};
use plotters::prelude::*;

use crate::{
    error::{ServiceError, ServiceResult},
    model::DataField,
    process::ProcessedReading,
};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;

// Endpoints of the cool-to-warm ramp.
const COOL: (u8, u8, u8) = (59, 76, 192);
const WARM: (u8, u8, u8) = (180, 4, 38);

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    field: DataField,
    bars: Vec<(String, f64)>,
}

impl BarChart {
    /// One bar per row that has a value for `field`, in row order.
    pub fn from_records(rows: &[ProcessedReading], field: DataField) -> ServiceResult<Self> {
        let bars: Vec<(String, f64)> = rows
            .iter()
            .filter_map(|row| row.value(field).map(|v| (row.city.clone(), v)))
            .collect();

        if bars.is_empty() {
            return Err(ServiceError::invalid_request(format!(
                "'{field}' is not a valid column in the weather data"
            )));
        }

        Ok(Self { field, bars })
    }

    pub fn field(&self) -> DataField {
        self.field
    }

    pub fn bars(&self) -> &[(String, f64)] {
        &self.bars
    }

    /// Y range covering every bar and the zero baseline, with some headroom.
    pub fn y_range(&self) -> (f64, f64) {
        let (min, max) = self
            .bars
            .iter()
            .fold((0.0_f64, 0.0_f64), |(lo, hi), (_, v)| (lo.min(*v), hi.max(*v)));

        let padding = if (max - min).abs() > f64::EPSILON { (max - min) * 0.1 } else { 1.0 };
        let lo = if min < 0.0 { min - padding } else { 0.0 };
        (lo, max + padding)
    }

    pub fn render_png(&self) -> ServiceResult<Vec<u8>> {
        let mut pixels = vec![0u8; (WIDTH * HEIGHT * 3) as usize];

        // Text needs a system font; without one, still draw the bars.
        if let Err(e) = self.draw(&mut pixels, true) {
            tracing::warn!(error = %e, "Chart text unavailable, rendering bars only");
            self.draw(&mut pixels, false)
                .map_err(|e| ServiceError::Render(format!("Failed to draw chart: {e}")))?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&pixels, WIDTH, HEIGHT, ExtendedColorType::Rgb8)
            .map_err(|e| ServiceError::Render(format!("Failed to encode PNG: {e}")))?;

        Ok(png)
    }

    fn draw(&self, pixels: &mut [u8], with_text: bool) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::with_buffer(pixels, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;

        let (y_min, y_max) = self.y_range();
        let (v_min, v_max) = self.value_bounds();
        let names: Vec<&str> = self.bars.iter().map(|(name, _)| name.as_str()).collect();
        let label = self.field.as_str();

        let mut builder = ChartBuilder::on(&root);
        builder.margin(20);
        if with_text {
            builder
                .caption(format!("{label} by City"), ("sans-serif", 28))
                .x_label_area_size(50)
                .y_label_area_size(70);
        }
        let mut chart =
            builder.build_cartesian_2d((0..self.bars.len()).into_segmented(), y_min..y_max)?;

        if with_text {
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_desc("City")
                .y_desc(label)
                .x_labels(self.bars.len())
                .x_label_formatter(&|pos| match pos {
                    SegmentValue::CenterOf(i) => {
                        names.get(*i).map(|n| n.to_string()).unwrap_or_default()
                    }
                    _ => String::new(),
                })
                .draw()?;
        }

        chart.draw_series(
            Histogram::vertical(&chart)
                .margin(12)
                .style_func(|_, value: &f64| ramp_color(*value, v_min, v_max).filled())
                .data(self.bars.iter().enumerate().map(|(i, (_, v))| (i, *v))),
        )?;

        root.present()?;
        Ok(())
    }

    fn value_bounds(&self) -> (f64, f64) {
        self.bars.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        })
    }
}

/// Linear blend from `COOL` at `min` to `WARM` at `max`.
fn ramp_color(value: f64, min: f64, max: f64) -> RGBColor {
    let t = if max > min { ((value - min) / (max - min)).clamp(0.0, 1.0) } else { 0.5 };
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(mix(COOL.0, WARM.0), mix(COOL.1, WARM.1), mix(COOL.2, WARM.2))
}
