//! Reporting sinks for the metrics history (text-based, for terminal output).
//!
//! Two consumers: a CSV export for downstream tooling, and a pair of stacked
//! line charts (cost and accuracy vs. recorded step) rendered with plain
//! ASCII so a training run can be eyeballed without leaving the terminal.

use std::path::Path;

use crate::{Error, History, Result};

const CHART_WIDTH: usize = 60;
const CHART_HEIGHT: usize = 10;

/// Write the history as CSV: `step,train_cost,val_cost,train_acc,val_acc`.
pub fn write_history_csv<P: AsRef<Path>>(history: &History, path: P) -> Result<()> {
    let p = path.as_ref();
    let mut writer = csv::Writer::from_path(p)
        .map_err(|e| Error::InvalidData(format!("failed to create {}: {e}", p.display())))?;

    writer
        .write_record(["step", "train_cost", "val_cost", "train_acc", "val_acc"])
        .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", p.display())))?;

    for i in 0..history.len() {
        writer
            .write_record([
                history.steps[i].to_string(),
                history.train_costs[i].to_string(),
                history.val_costs[i].to_string(),
                history.train_accs[i].to_string(),
                history.val_accs[i].to_string(),
            ])
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", p.display())))?;
    }

    writer
        .flush()
        .map_err(|e| Error::InvalidData(format!("failed to flush {}: {e}", p.display())))?;
    Ok(())
}

/// Render the two stacked charts as a string ready for printing.
pub fn render_history(history: &History) -> String {
    if history.is_empty() {
        return "no metrics recorded\n".to_owned();
    }

    let mut out = String::new();
    render_panel(
        &mut out,
        "cost",
        &history.train_costs,
        &history.val_costs,
        history,
    );
    out.push('\n');
    render_panel(
        &mut out,
        "accuracy",
        &history.train_accs,
        &history.val_accs,
        history,
    );
    out
}

fn render_panel(out: &mut String, title: &str, train: &[f32], val: &[f32], history: &History) {
    let len = train.len();
    let width = len.min(CHART_WIDTH);

    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in train.iter().chain(val) {
        min = min.min(v);
        max = max.max(v);
    }
    let range = if max > min { max - min } else { 1.0 };

    let mut grid = vec![vec![' '; width]; CHART_HEIGHT];
    for (series, mark) in [(train, '*'), (val, 'o')] {
        for col in 0..width {
            let idx = if width > 1 {
                col * (len - 1) / (width - 1)
            } else {
                0
            };
            let frac = (series[idx] - min) / range;
            let row = ((1.0 - frac) * (CHART_HEIGHT - 1) as f32).round() as usize;
            let cell = &mut grid[row.min(CHART_HEIGHT - 1)][col];
            *cell = if *cell == ' ' { mark } else { '#' };
        }
    }

    out.push_str(title);
    out.push('\n');
    for (row, line) in grid.iter().enumerate() {
        let label = if row == 0 {
            format!("{max:>9.3}")
        } else if row == CHART_HEIGHT - 1 {
            format!("{min:>9.3}")
        } else {
            " ".repeat(9)
        };
        out.push_str(&label);
        out.push_str(" |");
        out.extend(line.iter());
        out.push('\n');
    }
    out.push_str(&" ".repeat(9));
    out.push_str(" +");
    out.push_str(&"-".repeat(width));
    out.push('\n');
    out.push_str(&format!(
        "{} steps {}..{}  (* train, o val)\n",
        " ".repeat(10),
        history.steps.first().unwrap(),
        history.steps.last().unwrap()
    ));
}
