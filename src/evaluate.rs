//! Evaluation: classification metrics and diagnostic figures
//!
//! Metrics tolerate degenerate inputs instead of raising: zero-denominator
//! precision/recall score 0.0, and ROC-AUC falls back to 0.5 when the ground
//! truth carries a single class. Figures are rendered eagerly into in-memory
//! SVG values so callers own plain data, not a drawing context.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array1;

use crate::error::Result;

/// A rendered diagnostic figure, keyed by name for the tracking store.
#[derive(Debug, Clone)]
pub struct Figure {
    pub name: String,
    pub svg: String,
}

impl Figure {
    /// Write the figure to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.svg)?;
        Ok(())
    }
}

/// Accuracy, precision, recall, and ROC-AUC of binary predictions.
pub fn compute_classification_metrics(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
    y_proba: &Array1<f64>,
) -> BTreeMap<String, f64> {
    let n = y_true.len();
    let (tn, fp, fn_, tp) = confusion_counts(y_true, y_pred);

    let mut metrics = BTreeMap::new();
    metrics.insert(
        "accuracy".to_string(),
        if n > 0 { (tp + tn) as f64 / n as f64 } else { 0.0 },
    );
    metrics.insert(
        "precision".to_string(),
        if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 },
    );
    metrics.insert(
        "recall".to_string(),
        if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 },
    );
    metrics.insert("roc_auc".to_string(), roc_auc_score(y_true, y_proba));
    metrics
}

/// Rank-statistic ROC-AUC with tie handling.
///
/// Undefined when the ground truth has a single class; returns the neutral
/// 0.5 in that case rather than erroring.
pub fn roc_auc_score(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&v| v > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        y_proba[a]
            .partial_cmp(&y_proba[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average ranks over tied scores, then the Mann-Whitney statistic.
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && y_proba[order[j + 1]] == y_proba[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j + 2) as f64 / 2.0; // 1-based
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t > 0.5)
        .map(|(_, &r)| r)
        .sum();

    (rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64
}

/// Confusion counts as (tn, fp, fn, tp).
fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tn = 0;
    let mut fp = 0;
    let mut fn_ = 0;
    let mut tp = 0;
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (false, false) => tn += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (true, true) => tp += 1,
        }
    }
    (tn, fp, fn_, tp)
}

/// ROC curve points as (fpr, tpr), thresholds descending.
pub fn roc_curve(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> (Vec<f64>, Vec<f64>) {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&v| v > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return (vec![0.0, 1.0], vec![0.0, 1.0]);
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        y_proba[b]
            .partial_cmp(&y_proba[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut tp = 0usize;
    let mut fp = 0usize;

    let mut i = 0;
    while i < n {
        // Consume all samples sharing this threshold before emitting a point.
        let threshold = y_proba[order[i]];
        while i < n && y_proba[order[i]] == threshold {
            if y_true[order[i]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        fpr.push(fp as f64 / n_neg as f64);
        tpr.push(tp as f64 / n_pos as f64);
    }

    (fpr, tpr)
}

/// Render the confusion matrix as a heatmap figure.
pub fn plot_confusion_matrix(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Figure {
    let (tn, fp, fn_, tp) = confusion_counts(y_true, y_pred);
    let cells = [[tn, fp], [fn_, tp]];
    let max = cells.iter().flatten().copied().max().unwrap_or(0).max(1);

    let mut svg = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="320" height="300" viewBox="0 0 320 300">"#,
    );
    svg.push_str(r#"<text x="160" y="24" text-anchor="middle" font-size="16">Confusion Matrix</text>"#);

    let (x0, y0, cell) = (90.0, 50.0, 90.0);
    for (row, row_cells) in cells.iter().enumerate() {
        for (col, &count) in row_cells.iter().enumerate() {
            let intensity = count as f64 / max as f64;
            // Light-to-dark blue ramp
            let r = (239.0 - 181.0 * intensity) as u8;
            let g = (243.0 - 130.0 * intensity) as u8;
            let b = 255u8;
            let x = x0 + col as f64 * cell;
            let y = y0 + row as f64 * cell;
            svg.push_str(&format!(
                r#"<rect x="{x}" y="{y}" width="{cell}" height="{cell}" fill="rgb({r},{g},{b})" stroke="white"/>"#
            ));
            let text_fill = if intensity > 0.6 { "white" } else { "black" };
            svg.push_str(&format!(
                r#"<text x="{:.0}" y="{:.0}" text-anchor="middle" font-size="18" fill="{text_fill}">{count}</text>"#,
                x + cell / 2.0,
                y + cell / 2.0 + 6.0,
            ));
        }
    }

    for (i, label) in ["0", "1"].iter().enumerate() {
        let center = x0 + cell * (i as f64 + 0.5);
        svg.push_str(&format!(
            r#"<text x="{center:.0}" y="252" text-anchor="middle" font-size="12">{label}</text>"#
        ));
        let middle = y0 + cell * (i as f64 + 0.5);
        svg.push_str(&format!(
            r#"<text x="74" y="{:.0}" text-anchor="middle" font-size="12">{label}</text>"#,
            middle + 4.0
        ));
    }
    svg.push_str(r#"<text x="160" y="280" text-anchor="middle" font-size="13">Predicted</text>"#);
    svg.push_str(
        r#"<text x="40" y="140" text-anchor="middle" font-size="13" transform="rotate(-90 40 140)">Actual</text>"#,
    );
    svg.push_str("</svg>");

    Figure {
        name: "confusion_matrix".to_string(),
        svg,
    }
}

/// Render the ROC curve (with the chance diagonal) as a figure.
pub fn plot_roc_curve(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> Figure {
    let (fpr, tpr) = roc_curve(y_true, y_proba);

    let (x0, y0, width, height) = (50.0, 30.0, 240.0, 200.0);
    let to_px = |fx: f64, fy: f64| (x0 + fx * width, y0 + (1.0 - fy) * height);

    let mut svg = String::from(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="340" height="290" viewBox="0 0 340 290">"#,
    );
    svg.push_str(r#"<text x="170" y="20" text-anchor="middle" font-size="16">ROC Curve</text>"#);

    // Axes
    svg.push_str(&format!(
        r##"<rect x="{x0}" y="{y0}" width="{width}" height="{height}" fill="none" stroke="#999"/>"##
    ));

    // Chance diagonal
    let (dx0, dy0) = to_px(0.0, 0.0);
    let (dx1, dy1) = to_px(1.0, 1.0);
    svg.push_str(&format!(
        r#"<line x1="{dx0:.1}" y1="{dy0:.1}" x2="{dx1:.1}" y2="{dy1:.1}" stroke="gray" stroke-dasharray="5,4"/>"#
    ));

    // Curve
    let points: Vec<String> = fpr
        .iter()
        .zip(tpr.iter())
        .map(|(&fx, &fy)| {
            let (px, py) = to_px(fx, fy);
            format!("{px:.1},{py:.1}")
        })
        .collect();
    svg.push_str(&format!(
        r##"<polyline points="{}" fill="none" stroke="#1f77b4" stroke-width="2"/>"##,
        points.join(" ")
    ));

    svg.push_str(
        r#"<text x="170" y="270" text-anchor="middle" font-size="13">False Positive Rate</text>"#,
    );
    svg.push_str(
        r#"<text x="16" y="130" text-anchor="middle" font-size="13" transform="rotate(-90 16 130)">True Positive Rate</text>"#,
    );
    svg.push_str("</svg>");

    Figure {
        name: "roc_curve".to_string(),
        svg,
    }
}

/// Compute metrics and render both diagnostic figures.
///
/// Pure function of its arguments; nothing is mutated or cached.
pub fn evaluate_predictions(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
    y_proba: &Array1<f64>,
) -> (BTreeMap<String, f64>, Vec<Figure>) {
    let metrics = compute_classification_metrics(y_true, y_pred, y_proba);
    let figures = vec![
        plot_confusion_matrix(y_true, y_pred),
        plot_roc_curve(y_true, y_proba),
    ];
    (metrics, figures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_classifier_metrics() {
        let y_true = array![0.0, 0.0, 1.0, 1.0];
        let y_pred = array![0.0, 0.0, 1.0, 1.0];
        let y_proba = array![0.1, 0.2, 0.8, 0.9];

        let metrics = compute_classification_metrics(&y_true, &y_pred, &y_proba);
        assert_eq!(metrics["accuracy"], 1.0);
        assert_eq!(metrics["precision"], 1.0);
        assert_eq!(metrics["recall"], 1.0);
        assert_eq!(metrics["roc_auc"], 1.0);
    }

    #[test]
    fn test_single_class_auc_is_neutral() {
        let y_true = array![1.0, 1.0, 1.0];
        let y_proba = array![0.2, 0.9, 0.5];
        assert_eq!(roc_auc_score(&y_true, &y_proba), 0.5);
    }

    #[test]
    fn test_degenerate_predictions_do_not_divide_by_zero() {
        // All-negative predictions: no true/false positives.
        let y_true = array![1.0, 1.0, 0.0, 0.0];
        let y_pred = array![0.0, 0.0, 0.0, 0.0];
        let y_proba = array![0.4, 0.4, 0.4, 0.4];

        let metrics = compute_classification_metrics(&y_true, &y_pred, &y_proba);
        assert_eq!(metrics["precision"], 0.0);
        assert_eq!(metrics["recall"], 0.0);
        // Constant scores rank nothing above anything else.
        assert_eq!(metrics["roc_auc"], 0.5);
    }

    #[test]
    fn test_auc_with_ties() {
        let y_true = array![0.0, 0.0, 1.0, 1.0];
        let y_proba = array![0.5, 0.5, 0.5, 0.9];
        // One positive clearly on top, the rest tied: 0.5 + 0.5*0.5 = 0.75
        assert!((roc_auc_score(&y_true, &y_proba) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_curve_endpoints() {
        let y_true = array![0.0, 1.0, 0.0, 1.0];
        let y_proba = array![0.1, 0.9, 0.3, 0.7];
        let (fpr, tpr) = roc_curve(&y_true, &y_proba);
        assert_eq!((fpr[0], tpr[0]), (0.0, 0.0));
        assert_eq!(
            (*fpr.last().unwrap(), *tpr.last().unwrap()),
            (1.0, 1.0)
        );
    }

    #[test]
    fn test_figures_have_expected_names() {
        let y_true = array![0.0, 1.0];
        let y_pred = array![0.0, 1.0];
        let y_proba = array![0.2, 0.8];

        let (_, figures) = evaluate_predictions(&y_true, &y_pred, &y_proba);
        let names: Vec<&str> = figures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["confusion_matrix", "roc_curve"]);
        assert!(figures[0].svg.starts_with("<svg"));
    }
}
