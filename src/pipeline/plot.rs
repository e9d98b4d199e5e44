//! Loss-curve chart rendered as standalone SVG.

use crate::Result;
use std::fs;
use std::path::Path;

const WIDTH: f32 = 640.0;
const HEIGHT: f32 = 480.0;
const LEFT: f32 = 60.0;
const RIGHT: f32 = 620.0;
const TOP: f32 = 20.0;
const BOTTOM: f32 = 430.0;

const TRAIN_COLOR: &str = "#4682b4";
const VAL_COLOR: &str = "#ff8c00";

/// Render train/validation loss curves over epochs.
///
/// Both series are per-epoch values starting at epoch 1; the validation
/// series may be empty or shorter than the train series.
pub fn render_loss_plot(train: &[f32], val: &[f32]) -> String {
    let y_max = train
        .iter()
        .chain(val.iter())
        .fold(1e-6f32, |acc, &v| acc.max(v));
    let epochs = train.len().max(val.len());

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" viewBox=\"0 0 {WIDTH} {HEIGHT}\">\n"
    ));
    svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");

    // horizontal gridlines with y-axis labels
    for i in 0..=4 {
        let frac = i as f32 / 4.0;
        let y = BOTTOM - frac * (BOTTOM - TOP);
        svg.push_str(&format!(
            "<line x1=\"{LEFT}\" y1=\"{y:.1}\" x2=\"{RIGHT}\" y2=\"{y:.1}\" stroke=\"#dddddd\"/>\n"
        ));
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"11\" text-anchor=\"end\">{:.3}</text>\n",
            LEFT - 6.0,
            y + 4.0,
            frac * y_max
        ));
    }

    // axes
    svg.push_str(&format!(
        "<line x1=\"{LEFT}\" y1=\"{TOP}\" x2=\"{LEFT}\" y2=\"{BOTTOM}\" stroke=\"black\"/>\n"
    ));
    svg.push_str(&format!(
        "<line x1=\"{LEFT}\" y1=\"{BOTTOM}\" x2=\"{RIGHT}\" y2=\"{BOTTOM}\" stroke=\"black\"/>\n"
    ));

    // x-axis epoch ticks
    if epochs > 0 {
        let step = epochs.div_ceil(6).max(1);
        for epoch in (1..=epochs).step_by(step) {
            let x = scale_x(epoch - 1, epochs);
            svg.push_str(&format!(
                "<line x1=\"{x:.1}\" y1=\"{BOTTOM}\" x2=\"{x:.1}\" y2=\"{:.1}\" stroke=\"black\"/>\n",
                BOTTOM + 5.0
            ));
            svg.push_str(&format!(
                "<text x=\"{x:.1}\" y=\"{:.1}\" font-size=\"11\" text-anchor=\"middle\">{epoch}</text>\n",
                BOTTOM + 18.0
            ));
        }
    }

    // axis titles
    svg.push_str(&format!(
        "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"middle\">epoch</text>\n",
        (LEFT + RIGHT) / 2.0,
        HEIGHT - 12.0
    ));
    svg.push_str(&format!(
        "<text x=\"16\" y=\"{:.1}\" font-size=\"12\" text-anchor=\"middle\" transform=\"rotate(-90 16 {:.1})\">loss</text>\n",
        (TOP + BOTTOM) / 2.0,
        (TOP + BOTTOM) / 2.0
    ));

    draw_series(&mut svg, train, y_max, TRAIN_COLOR);
    draw_series(&mut svg, val, y_max, VAL_COLOR);

    // legend, top right
    let mut legend_y = TOP + 14.0;
    for (label, color, present) in [
        ("train loss", TRAIN_COLOR, !train.is_empty()),
        ("validation loss", VAL_COLOR, !val.is_empty()),
    ] {
        if !present {
            continue;
        }
        svg.push_str(&format!(
            "<line x1=\"{:.1}\" y1=\"{legend_y:.1}\" x2=\"{:.1}\" y2=\"{legend_y:.1}\" stroke=\"{color}\" stroke-width=\"2\"/>\n",
            RIGHT - 140.0,
            RIGHT - 116.0
        ));
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"12\">{label}</text>\n",
            RIGHT - 110.0,
            legend_y + 4.0
        ));
        legend_y += 18.0;
    }

    svg.push_str("</svg>\n");
    svg
}

/// Render and write the chart next to the run's other log files.
pub fn write_loss_plot(path: impl AsRef<Path>, train: &[f32], val: &[f32]) -> Result<()> {
    fs::write(path, render_loss_plot(train, val))?;
    Ok(())
}

fn scale_x(index: usize, epochs: usize) -> f32 {
    let denom = epochs.saturating_sub(1).max(1) as f32;
    LEFT + (index as f32 / denom) * (RIGHT - LEFT)
}

fn scale_y(value: f32, y_max: f32) -> f32 {
    BOTTOM - (value / y_max).clamp(0.0, 1.0) * (BOTTOM - TOP)
}

fn draw_series(svg: &mut String, series: &[f32], y_max: f32, color: &str) {
    if series.is_empty() {
        return;
    }

    if series.len() >= 2 {
        let points: Vec<String> = series
            .iter()
            .enumerate()
            .map(|(i, &v)| format!("{:.1},{:.1}", scale_x(i, series.len()), scale_y(v, y_max)))
            .collect();
        svg.push_str(&format!(
            "<polyline points=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"2\"/>\n",
            points.join(" ")
        ));
    }

    for (i, &v) in series.iter().enumerate() {
        svg.push_str(&format!(
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"3\" fill=\"{color}\"/>\n",
            scale_x(i, series.len()),
            scale_y(v, y_max)
        ));
    }
}
