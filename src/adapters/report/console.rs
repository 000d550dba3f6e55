//! Console summary of a finished run.

use crate::application::BacktestRun;

/// Render the end-of-run block for a pair labelled e.g. `"OP/ARB"`
pub fn format_summary(run: &BacktestRun, label: &str) -> String {
    let report = &run.report;
    let regression = &run.regression;

    let avg_holding = match report.avg_holding_days.value() {
        Some(days) => format!("{:.2}", days),
        None => "no trades".to_string(),
    };

    let lines = [
        format!("\n=== {} Pairs Trading Performance ===", label),
        format!(
            "Period: {} .. {} ({} observations)",
            run.series.first().timestamp.date_naive(),
            run.series.last().timestamp.date_naive(),
            report.total_observations
        ),
        format!("Daily returns correlation: {:.4}", run.correlation.overall),
        format!("Final cumulative return: {:.4}", report.final_cumulative_return),
        format!("Total trades: {}", report.total_trades),
        format!("Average holding days per trade: {}", avg_holding),
        format!(
            "OLS alpha: {:.4}, beta: {:.4} (R² {:.4}, fitted on {} rows)",
            regression.intercept, regression.slope, regression.r_squared, regression.observations
        ),
        format!("p-value for alpha: {:.2e}", regression.p_value_intercept),
        format!("p-value for beta : {:.2e}", regression.p_value_slope),
        format!("Annualized Sharpe Ratio: {:.4}", report.sharpe_ratio),
        format!("Maximum Drawdown: {:.2}%", report.max_drawdown * 100.0),
        format!("Total transaction cost: {:.6}", report.total_cost),
    ];

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn print_summary(run: &BacktestRun, label: &str) {
    print!("{}", format_summary(run, label));
}

/// Overall and latest rolling return correlation
pub fn format_correlation(run: &BacktestRun, label: &str) -> String {
    format!(
        "{} daily returns correlation: {:.4} (latest {}-day rolling: {:.4})\n",
        label,
        run.correlation.overall,
        run.correlation.window,
        run.correlation.latest()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::BacktestEngine;
    use crate::domain::series::{AlignedRow, AlignedSeries};
    use crate::strategy::BacktestConfig;
    use chrono::{Duration, TimeZone, Utc};

    fn run_with_noise(noise: f64) -> BacktestRun {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = (0..60)
            .map(|i| {
                let t = i as f64;
                let b = 20.0 + (t * 0.1).sin();
                AlignedRow {
                    timestamp: t0 + Duration::days(i),
                    price_a: 5.0 + 2.0 * b + noise * (t * 0.9).sin(),
                    price_b: b,
                }
            })
            .collect();
        let engine = BacktestEngine::new(BacktestConfig::default().with_window(10)).unwrap();
        engine.run_aligned(AlignedSeries::from_rows(rows).unwrap()).unwrap()
    }

    fn run() -> BacktestRun {
        run_with_noise(0.5)
    }

    #[test]
    fn test_summary_lines() {
        let text = format_summary(&run(), "OP/ARB");
        assert!(text.contains("=== OP/ARB Pairs Trading Performance ==="));
        assert!(text.contains("Period: 2024-01-01 .. 2024-02-29 (60 observations)"));
        assert!(text.contains("Final cumulative return:"));
        assert!(text.contains("Annualized Sharpe Ratio:"));
        assert!(text.contains("p-value for beta"));
        assert!(text.contains("Maximum Drawdown:"));
        assert!(text.ends_with('\n'));
        assert_eq!(text.lines().filter(|l| !l.is_empty()).count(), 12);
    }

    #[test]
    fn test_summary_without_trades() {
        let run = run_with_noise(0.0);
        assert_eq!(run.report.total_trades, 0);

        let text = format_summary(&run, "OP/ARB");
        assert!(text.contains("Total trades: 0"));
        assert!(text.contains("Average holding days per trade: no trades"));
        assert!(text.contains("Annualized Sharpe Ratio: undefined"));
    }

    #[test]
    fn test_correlation_line() {
        let text = format_correlation(&run(), "OP & ARB");
        assert!(text.starts_with("OP & ARB daily returns correlation:"));
        assert!(text.contains("30-day rolling"));
    }
}
