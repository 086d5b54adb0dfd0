//! Robust scaler: `(x - median) / IQR`, fitted once on the training partition

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::logic::error::{IdsError, Result};

/// Per-column center and scale. Not idempotent: transforming scaled data
/// again rescales it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RobustScaler {
    center: Vec<f64>,
    scale: Vec<f64>,
    /// Columns whose IQR was zero (scaled by 1.0 instead)
    degenerate_columns: Vec<usize>,
    fitted: bool,
}

impl RobustScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn width(&self) -> usize {
        self.center.len()
    }

    pub fn center(&self) -> &[f64] {
        &self.center
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn degenerate_columns(&self) -> &[usize] {
        &self.degenerate_columns
    }

    pub fn fit(&mut self, data: &Array2<f64>) -> Result<()> {
        if self.fitted {
            return Err(IdsError::ScalerAlreadyFitted);
        }
        if data.nrows() == 0 {
            return Err(IdsError::EmptyDataset("cannot fit scaler on zero rows".into()));
        }

        let mut center = Vec::with_capacity(data.ncols());
        let mut scale = Vec::with_capacity(data.ncols());
        let mut degenerate = Vec::new();

        for (j, column) in data.axis_iter(Axis(1)).enumerate() {
            let mut sorted: Vec<f64> = column.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));

            let median = quantile(&sorted, 0.5);
            let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);

            center.push(median);
            if iqr == 0.0 || !iqr.is_finite() {
                degenerate.push(j);
                scale.push(1.0);
            } else {
                scale.push(iqr);
            }
        }

        if !degenerate.is_empty() {
            log::warn!(
                "Degenerate columns (zero IQR, divisor 1.0): {} of {}",
                degenerate.len(),
                data.ncols()
            );
        }

        self.center = center;
        self.scale = scale;
        self.degenerate_columns = degenerate;
        self.fitted = true;
        Ok(())
    }

    pub fn fit_transform(&mut self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(data)?;
        self.transform(data)
    }

    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check(data.ncols())?;
        let center = Array1::from(self.center.clone());
        let scale = Array1::from(self.scale.clone());
        Ok((data - &center) / &scale)
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check(row.len())?;
        Ok(row
            .iter()
            .zip(self.center.iter().zip(self.scale.iter()))
            .map(|(x, (c, s))| (x - c) / s)
            .collect())
    }

    fn check(&self, width: usize) -> Result<()> {
        if !self.fitted {
            return Err(IdsError::ScalerNotFitted);
        }
        if width != self.width() {
            return Err(IdsError::SchemaMismatch {
                expected: self.width(),
                actual: width,
            });
        }
        Ok(())
    }
}

/// Quantile of sorted data with linear interpolation between closest ranks
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
