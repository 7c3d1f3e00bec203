//! Bar charts of the most significant enriched terms
use std::fs;
use std::path::Path;

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use tracing::{debug, info};

use crate::enrichment::EnrichmentTable;
use crate::{EnrichError, EnrichResult, TOP_TERMS};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;
/// Term names are shortened to this many characters
const MAX_LABEL_LEN: usize = 60;

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for EnrichError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        EnrichError::Plot(err.to_string())
    }
}

/// Renders a horizontal bar chart of the top terms of `table`
///
/// The [`TOP_TERMS`] rows with the lowest p-values are shown with their
/// `-log10(p_value)`, the most significant term at the top. The image format
/// depends on the extension of `path`: `.svg` files are rendered as SVG,
/// everything else as bitmap (PNG by default).
///
/// Nothing is written if the table is empty or none of its rows has a term
/// name. Returns `true` if the chart was written.
///
/// # Errors
///
/// Returns [`EnrichError::Plot`] if rendering fails and
/// [`EnrichError::Io`] if the output directory cannot be created
pub fn plot_enrichment_results<P: AsRef<Path>>(
    table: &EnrichmentTable,
    title: &str,
    path: P,
) -> EnrichResult<bool> {
    let path = path.as_ref();
    if table.is_empty() || !table.has_term_names() {
        debug!("Nothing to plot for {}", path.display());
        return Ok(false);
    }

    let bars = chart_bars(table);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let is_svg = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if is_svg {
        let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
        draw_bars(&root, title, &bars)?;
    } else {
        let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
        draw_bars(&root, title, &bars)?;
    }
    info!("Wrote {}", path.display());
    Ok(true)
}

/// Label and `-log10(p_value)` of the [`TOP_TERMS`] most significant rows,
/// in drawing order from top to bottom
fn chart_bars(table: &EnrichmentTable) -> Vec<(String, f64)> {
    table
        .top(TOP_TERMS)
        .into_iter()
        .map(|row| {
            let name = row.term_name.as_deref().unwrap_or(&row.term_id);
            (shorten(name), row.neg_log10_p())
        })
        .collect()
}

fn shorten(name: &str) -> String {
    if name.chars().count() <= MAX_LABEL_LEN {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(MAX_LABEL_LEN - 3).collect();
        short.push_str("...");
        short
    }
}

/// Draws one bar per entry, the first entry at the top
fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    bars: &[(String, f64)],
) -> EnrichResult<()> {
    root.fill(&WHITE)?;

    let n = bars.len();
    let x_max = bars
        .iter()
        .map(|(_, score)| *score)
        .fold(1.0_f64, f64::max)
        * 1.05;
    let longest = bars
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or_default();
    let label_area = u32::try_from(longest).unwrap_or(u32::MAX).saturating_mul(7) + 20;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(label_area)
        .build_cartesian_2d(0.0..x_max, (0..n).into_segmented())?;

    // bars are drawn bottom-up, so the first entry has the highest position
    let label = |value: &SegmentValue<usize>| match value {
        SegmentValue::CenterOf(pos) if *pos < n => bars[n - 1 - pos].0.clone(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&label)
        .x_desc("-log10(p_value)")
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(rank, (_, score))| {
        let pos = n - 1 - rank;
        let mut bar = Rectangle::new(
            [
                (0.0, SegmentValue::Exact(pos)),
                (*score, SegmentValue::Exact(pos + 1)),
            ],
            BLUE.mix(0.8).filled(),
        );
        bar.set_margin(4, 4, 0, 0);
        bar
    }))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::enrichment::{EnrichmentRow, Intersection};

    #[test]
    fn empty_table_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        let written = plot_enrichment_results(&EnrichmentTable::new(), "empty", &path).unwrap();
        assert!(!written);
        assert!(!path.exists());
    }

    #[test]
    fn table_without_names_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unnamed.png");
        let genes = Intersection::Delimited("A".to_string());
        let mut row = EnrichmentRow::new("GO:1", "x", 0.01, genes);
        row.term_name = None;
        let table: EnrichmentTable = std::iter::once(row).collect();
        assert!(!plot_enrichment_results(&table, "unnamed", &path).unwrap());
        assert!(!path.exists());
    }

    fn ranked_table(count: i32) -> EnrichmentTable {
        (1..=count)
            .map(|i| {
                EnrichmentRow::new(
                    &format!("GO:{i}"),
                    &format!("term {i}"),
                    10f64.powi(-i),
                    Intersection::Delimited("A".to_string()),
                )
            })
            .collect()
    }

    #[test]
    fn bars_of_top_terms() {
        let bars = chart_bars(&ranked_table(12));
        assert_eq!(bars.len(), TOP_TERMS);
        // most significant first
        assert_eq!(bars[0].0, "term 12");
        assert!((bars[0].1 - 12.0).abs() < 1e-9);
        assert_eq!(bars[9].0, "term 3");
        assert!(bars.windows(2).all(|pair| pair[0].1 >= pair[1].1));
        assert!(bars.iter().all(|(label, _)| label != "term 1" && label != "term 2"));
    }

    #[test]
    fn bars_fall_back_to_term_id() {
        let mut table = ranked_table(2);
        if let Some(row) = table.iter_mut().next() {
            row.term_name = None;
        }
        let labels: Vec<String> = chart_bars(&table).into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["term 2", "GO:1"]);
    }

    #[test]
    fn shorten_long_names() {
        assert_eq!(shorten("cell cycle"), "cell cycle");
        let long = "x".repeat(100);
        let short = shorten(&long);
        assert_eq!(short.chars().count(), MAX_LABEL_LEN);
        assert!(short.ends_with("..."));
    }

    #[test]
    #[ignore = "requires system fonts"]
    fn renders_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots").join("terms.svg");
        let table = ranked_table(12);
        assert!(plot_enrichment_results(&table, "Top terms", &path).unwrap());
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("term 12"));
        assert!(!svg.contains("term 2<"));
    }
}
