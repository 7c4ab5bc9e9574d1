//! Statistical helpers shared by the metrics

use climeval_core::errors::{EvalError, EvalResult};
use climeval_core::masked::MaskedArray;
use ndarray::{Dimension, Zip};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Values at the positions where neither array is masked
///
/// Fails with a shape mismatch if the arrays differ in shape.
pub fn jointly_valid<D: Dimension>(
    a: &MaskedArray<D>,
    b: &MaskedArray<D>,
    context: &str,
) -> EvalResult<(Vec<f64>, Vec<f64>)> {
    if a.shape() != b.shape() {
        return Err(EvalError::shape_mismatch(context, a.shape(), b.shape()));
    }
    let mut xs = vec![];
    let mut ys = vec![];
    Zip::from(a.data())
        .and(a.mask())
        .and(b.data())
        .and(b.mask())
        .for_each(|x, x_masked, y, y_masked| {
            if !x_masked && !y_masked {
                xs.push(*x);
                ys.push(*y);
            }
        });
    Ok((xs, ys))
}

/// Pearson correlation coefficient
///
/// `None` when fewer than two pairs are given or either series has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let (sxy, sxx, syy) = xs[..n].iter().zip(&ys[..n]).fold(
        (0.0, 0.0, 0.0),
        |(sxy, sxx, syy), (x, y)| {
            let dx = x - mean_x;
            let dy = y - mean_y;
            (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
        },
    );
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Pearson correlation over the jointly valid cells of two arrays
///
/// Undefined correlations are reported as NaN.
pub fn pattern_correlation<D: Dimension>(
    a: &MaskedArray<D>,
    b: &MaskedArray<D>,
    context: &str,
) -> EvalResult<f64> {
    let (xs, ys) = jointly_valid(a, b, context)?;
    Ok(pearson(&xs, &ys).unwrap_or(f64::NAN))
}

/// Significance level (`1 - p`) of a correlation coefficient
///
/// Uses a two-sided Student-t test with `n - 2` degrees of freedom. Requires `n >= 3`.
pub fn correlation_significance(r: f64, n: usize) -> EvalResult<f64> {
    if n < 3 {
        return Err(EvalError::Value(format!(
            "a significance level needs at least 3 samples, got {}",
            n
        )));
    }
    let dof = (n - 2) as f64;
    let denominator = 1.0 - r * r;
    if denominator <= 0.0 {
        return Ok(1.0);
    }
    let t = r * (dof / denominator).sqrt();
    let distribution =
        StudentsT::new(0.0, 1.0, dof).map_err(|e| EvalError::Value(e.to_string()))?;
    let p_value = 2.0 * (1.0 - distribution.cdf(t.abs()));
    Ok(1.0 - p_value)
}
