//! Calibration progress display.
//!
//! Two layers:
//! - **Status lines**: one line every `progress_interval` iterations while a
//!   restart anneals, safe to call from parallel restarts
//! - **Run history**: per-restart scores rendered as unicode sparklines at
//!   the end, plus an optional PNG via plotters (feature-gated)

#[cfg(feature = "plotters")]
use plotters::prelude::*;

use owo_colors::OwoColorize;

use super::scoring::Scores;
use super::search::RestartResult;

/// Prints periodic status lines during annealing.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    enabled: bool,
    interval: usize,
}

impl ProgressReporter {
    pub fn new(enabled: bool, interval: usize) -> Self {
        Self {
            enabled,
            interval: interval.max(1),
        }
    }

    pub fn silent() -> Self {
        Self::new(false, 1)
    }

    pub fn is_due(&self, iteration: usize) -> bool {
        self.enabled && iteration % self.interval == 0
    }

    /// Status line for one annealing iteration, printed when due.
    pub fn iteration(&self, restart: usize, iteration: usize, current: Scores, best_local: f64) {
        if !self.is_due(iteration) {
            return;
        }
        println!(
            "restart {} iter {}  train {:.2}  val {:.2}  best {:.2}",
            restart, iteration, current.train, current.val, best_local
        );
    }

    /// Summary line once a restart has been polished and gated.
    pub fn restart_finished(&self, result: &RestartResult, accepted: bool) {
        if !self.enabled {
            return;
        }
        let verdict = if accepted {
            "new best".green().to_string()
        } else {
            "kept previous".dimmed().to_string()
        };
        println!(
            "{} {}  train {:.2}  val {:.2}  ({} iters, {} polish moves)  {}",
            "restart".bold(),
            result.restart,
            result.scores.train,
            result.scores.val,
            result.iterations,
            result.polish_moves,
            verdict
        );
    }
}

/// Scores recorded once per restart.
#[derive(Debug, Clone, Default)]
pub struct RunHistory {
    train_history: Vec<f64>,
    val_history: Vec<f64>,
    exact_history: Vec<usize>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, scores: Scores, exact: usize) {
        self.train_history.push(scores.train);
        self.val_history.push(scores.val);
        self.exact_history.push(exact);
    }

    pub fn len(&self) -> usize {
        self.train_history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train_history.is_empty()
    }

    /// Render sparkline from values.
    pub fn sparkline(values: &[f64], width: usize) -> String {
        if values.is_empty() {
            return " ".repeat(width);
        }

        let chars = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
        let finite = values.iter().copied().filter(|v| v.is_finite());
        let min = finite.clone().fold(f64::INFINITY, f64::min);
        let max = finite.fold(f64::NEG_INFINITY, f64::max);
        let range = (max - min).max(0.001);

        let mut result = String::new();
        for i in 0..width {
            let idx = if values.len() <= width {
                if i < values.len() { Some(i) } else { None }
            } else {
                Some(i * values.len() / width)
            };

            match idx.map(|idx| values[idx]) {
                Some(v) if v.is_finite() => {
                    let normalized = (v - min) / range;
                    let char_idx = ((normalized * 7.0).round() as usize).min(7);
                    result.push(chars[char_idx]);
                }
                Some(_) => result.push('█'),
                None => result.push(' '),
            }
        }
        result
    }

    /// Print the per-restart history with sparklines.
    pub fn final_summary(&self, success: bool) {
        println!();
        if success {
            println!("{}", " CALIBRATION COMPLETE ".bold().on_green());
        } else {
            println!("{}", " CALIBRATION FAILED ".bold().on_red());
        }
        println!();

        if let (Some(first), Some(last)) = (self.train_history.first(), self.train_history.last()) {
            let best = self.train_history.iter().copied().fold(f64::INFINITY, f64::min);
            println!(
                "  {}: {:.2} → {:.2}  (best {})",
                "Train".bold(),
                first,
                last,
                format!("{:.2}", best).green()
            );
            println!("         [{}]", Self::sparkline(&self.train_history, 40).cyan());
        }

        if !self.val_history.is_empty() {
            println!("  {}:   [{}]", "Val".bold(), Self::sparkline(&self.val_history, 40).cyan());
        }

        if let Some(best_exact) = self.exact_history.iter().max() {
            println!("  {}: up to {} exact matches", "Exact".bold(), best_exact);
        }
        println!();
    }
}

/// Chart per-restart train and validation scores to a PNG.
#[cfg(feature = "plotters")]
pub fn plot_history(history: &RunHistory, output_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let n = history.len();
    if n == 0 {
        return Ok(());
    }

    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let finite = |v: &&f64| v.is_finite();
    let max_score = history
        .train_history
        .iter()
        .chain(history.val_history.iter())
        .filter(finite)
        .fold(0.0_f64, |acc, v| acc.max(*v));

    let mut chart = ChartBuilder::on(&root)
        .caption("Score per Restart (lower = better)", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..(n as f64), 0.0..max_score.max(1.0) * 1.05)?;

    chart.configure_mesh().x_desc("restart").y_desc("score").draw()?;

    let series = |values: &[f64]| -> Vec<(f64, f64)> {
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| (i as f64, *v))
            .collect()
    };
    let train = series(&history.train_history);
    let val = series(&history.val_history);

    chart
        .draw_series(LineSeries::new(train.clone(), &BLUE))?
        .label("Train")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart.draw_series(train.iter().map(|(x, y)| Circle::new((*x, *y), 4, BLUE.filled())))?;

    chart
        .draw_series(LineSeries::new(val.clone(), &MAGENTA))?
        .label("Validation")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &MAGENTA));

    chart.configure_series_labels().draw()?;

    root.present()?;
    println!("Saved calibration chart to {}", output_path);

    Ok(())
}

/// Stub when plotters feature is disabled.
#[cfg(not(feature = "plotters"))]
pub fn plot_history(_history: &RunHistory, _output_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Plotting requires --features plotters");
    Ok(())
}
