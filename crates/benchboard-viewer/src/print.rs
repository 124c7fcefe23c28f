//! Plain-text leaderboard output for `benchboard print`.

use std::fmt;

use benchboard_protocol::DisplayMode;
use benchboard_state::{ChartKind, ChartSpec};

use crate::detail::DetailPanel;
use crate::leaderboard::{LeaderboardController, LeaderboardView};

const BAR_WIDTH: usize = 40;

/// Expand the given ranks (fetching their details inline), then format the
/// whole page.
pub async fn print_board(controller: &mut LeaderboardController, expand: &[usize]) -> String {
    for &rank in expand {
        if controller.view().row(rank).is_none() {
            tracing::warn!(rank, "No leaderboard row with this rank");
            continue;
        }
        controller.toggle_row_now(rank).await;
    }
    format_board(controller)
}

pub fn format_board(controller: &LeaderboardController) -> String {
    BoardText(controller).to_string()
}

struct BoardText<'a>(&'a LeaderboardController);

impl fmt::Display for BoardText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_board(f, self.0)
    }
}

fn write_board(out: &mut impl fmt::Write, controller: &LeaderboardController) -> fmt::Result {
    let view = controller.view();
    let mode = controller.mode();
    let version = controller.version_label().unwrap_or("-");

    let (name, owner) = match mode {
        DisplayMode::Model => ("Model", "Vendor"),
        DisplayMode::Community => ("Strategy", "Author"),
    };
    writeln!(out, "Benchboard {mode} leaderboard, version {version}")?;
    writeln!(out)?;

    if let Some(notice) = &view.notice {
        return writeln!(out, "  {notice}");
    }

    writeln!(
        out,
        "{:>4}  {:<28} {:<14} {:<12} {:>5} {:>5} {:>5}  {:<14} {:<14} {:<14} {:<14}",
        "#", name, owner, "Round", "OK%", "Fail%", "Err%", "In tok", "Out tok", "Time s", "Cost m$"
    )?;
    writeln!(out, "{}", "-".repeat(144))?;

    for row in &view.rows {
        writeln!(
            out,
            "{:>4}  {:<28} {:<14} {:<12} {:>5} {:>5} {:>5}  {:<14} {:<14} {:<14} {:<14}",
            row.rank,
            row.identity.primary(),
            row.identity.secondary(),
            row.round.to_string(),
            row.shares.successful,
            row.shares.failed,
            row.shares.error,
            row.metrics.input_tokens.to_string(),
            row.metrics.output_tokens.to_string(),
            row.metrics.time.to_string(),
            row.metrics.cost.to_string(),
        )?;
        if let Some(panel) = controller.panels().panel(&row.key) {
            write_panel(out, panel)?;
        }
    }

    if let Some(summary) = &view.summary {
        writeln!(out)?;
        writeln!(out, "Average final round ({})", LeaderboardView::summary_surface())?;
        write_chart(out, summary)?;
    }
    Ok(())
}

fn write_panel(out: &mut impl fmt::Write, panel: &DetailPanel) -> fmt::Result {
    writeln!(out)?;
    if let Some(err) = &panel.load_error {
        writeln!(out, "      details unavailable: {err}")?;
    }
    writeln!(
        out,
        "      {:<10} {:>5} {:>5} {:>5} {:>5}  {:<14} {:<14} {:<14} {:<14}",
        "Seed", "Round", "OK%", "Fail%", "Err%", "In tok", "Out tok", "Time s", "Cost m$"
    )?;
    for run in &panel.runs {
        let marker = if run.run_index.is_some() { "*" } else { " " };
        writeln!(
            out,
            "    {marker} {:<10} {:>5} {:>5} {:>5} {:>5}  {:<14} {:<14} {:<14} {:<14}",
            run.seed,
            run.final_round,
            run.shares.successful,
            run.shares.failed,
            run.shares.error,
            run.metrics.input_tokens.to_string(),
            run.metrics.output_tokens.to_string(),
            run.metrics.time.to_string(),
            run.metrics.cost.to_string(),
        )?;
    }

    let t = &panel.totals;
    writeln!(
        out,
        "      totals: tokens {}M in / {}M out, cost ${} in / ${} out / ${} total, time {}s",
        t.input_tokens_m, t.output_tokens_m, t.input_cost, t.output_cost, t.total_cost, t.time_s
    )?;
    writeln!(out, "      final rounds ({})", panel.histogram_surface)?;
    write_chart(out, &panel.histogram)?;
    writeln!(out, "      providers ({})", panel.providers_surface)?;
    write_chart(out, &panel.providers)?;
    writeln!(out)
}

/// Horizontal text bars, one line per category.
fn write_chart(out: &mut impl fmt::Write, spec: &ChartSpec) -> fmt::Result {
    if spec.is_empty() || spec.categories.is_empty() {
        return writeln!(out, "        (no data)");
    }
    let totals: Vec<f64> = (0..spec.categories.len())
        .map(|i| spec.series.iter().filter_map(|s| s.values.get(i)).sum())
        .collect();
    let max = spec
        .y_max
        .unwrap_or_else(|| totals.iter().copied().fold(0.0, f64::max))
        .max(f64::EPSILON);
    let grand: f64 = totals.iter().sum();

    for (i, (category, total)) in spec.categories.iter().zip(&totals).enumerate() {
        let len = ((total / max) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64) as usize;
        let value = match spec.kind {
            ChartKind::Doughnut if grand > 0.0 => format!("{total} ({:.0}%)", total / grand * 100.0),
            _ => match spec.series.first().and_then(|s| s.error_bars.as_ref()) {
                Some(errors) => format!("{total:.1} ± {:.1}", errors.get(i).copied().unwrap_or(0.0)),
                None => format!("{total}"),
            },
        };
        writeln!(out, "        {:<20} {:<width$} {value}", category, "#".repeat(len), width = BAR_WIDTH)?;
    }
    Ok(())
}
