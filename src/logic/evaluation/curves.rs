//! ROC and precision-recall curves over every distinct score threshold

use serde::{Deserialize, Serialize};

use crate::logic::error::{IdsError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    /// Decreasing; the first entry is +inf (nothing predicted positive)
    pub thresholds: Vec<f64>,
    pub auc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionRecallCurve {
    /// One longer than `thresholds`; ends with 1.0
    pub precision: Vec<f64>,
    /// One longer than `thresholds`; ends with 0.0
    pub recall: Vec<f64>,
    /// Increasing
    pub thresholds: Vec<f64>,
}

/// Cumulative (false positives, true positives, threshold) at each distinct
/// score, scores descending
fn binary_counts(labels: &[u8], scores: &[f64]) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    if labels.len() != scores.len() {
        return Err(IdsError::ShapeMismatch(format!(
            "{} labels vs {} scores",
            labels.len(),
            scores.len()
        )));
    }
    if labels.is_empty() {
        return Err(IdsError::EmptyDataset("no scores to evaluate".into()));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut fps = Vec::new();
    let mut tps = Vec::new();
    let mut thresholds = Vec::new();
    let (mut fp, mut tp) = (0.0, 0.0);
    for (pos, &i) in order.iter().enumerate() {
        if labels[i] > 0 {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let last_of_run = order
            .get(pos + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if last_of_run {
            fps.push(fp);
            tps.push(tp);
            thresholds.push(scores[i]);
        }
    }
    Ok((fps, tps, thresholds))
}

/// Area under a curve by the trapezoidal rule; `x` may be increasing or decreasing
pub fn auc(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(IdsError::ShapeMismatch(format!(
            "auc needs at least 2 points of equal length, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    let area: f64 = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum();
    let decreasing = x.windows(2).all(|w| w[1] <= w[0]);
    Ok(if decreasing { -area } else { area })
}

pub fn roc_curve(labels: &[u8], scores: &[f64]) -> Result<RocCurve> {
    let (fps, tps, thr) = binary_counts(labels, scores)?;

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut thresholds = vec![f64::INFINITY];

    let (neg, pos) = (fps[fps.len() - 1], tps[tps.len() - 1]);
    if neg == 0.0 {
        log::warn!("No negative samples: false positive rate is undefined");
    }
    if pos == 0.0 {
        log::warn!("No positive samples: true positive rate is undefined");
    }

    for ((fp, tp), t) in fps.iter().zip(tps.iter()).zip(thr.iter()) {
        fpr.push(if neg > 0.0 { fp / neg } else { f64::NAN });
        tpr.push(if pos > 0.0 { tp / pos } else { f64::NAN });
        thresholds.push(*t);
    }
    if neg == 0.0 {
        fpr[0] = f64::NAN;
    }
    if pos == 0.0 {
        tpr[0] = f64::NAN;
    }

    let area = auc(&fpr, &tpr)?;
    Ok(RocCurve {
        fpr,
        tpr,
        thresholds,
        auc: area,
    })
}

pub fn precision_recall_curve(labels: &[u8], scores: &[f64]) -> Result<PrecisionRecallCurve> {
    let (fps, tps, thr) = binary_counts(labels, scores)?;
    let pos = tps[tps.len() - 1];
    if pos == 0.0 {
        log::warn!("No positive samples: recall is set to 1.0 at every threshold");
    }

    let mut precision: Vec<f64> = fps
        .iter()
        .zip(tps.iter())
        .map(|(fp, tp)| if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 })
        .rev()
        .collect();
    let mut recall: Vec<f64> = tps
        .iter()
        .map(|tp| if pos > 0.0 { tp / pos } else { 1.0 })
        .rev()
        .collect();
    precision.push(1.0);
    recall.push(0.0);

    Ok(PrecisionRecallCurve {
        precision,
        recall,
        thresholds: thr.into_iter().rev().collect(),
    })
}
