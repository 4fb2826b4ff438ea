//! Generalized ESD (Rosner) outlier test over a univariate sample.
//!
//! Two-sided test under a normality assumption. Critical values need the
//! Student-t quantile, computed here with the Acklam normal quantile plus
//! a Cornish–Fisher expansion in 1/df — accurate to ~1e-3 for df ≥ 3,
//! which is plenty for outlier screening.

/// Indices of outliers detected by the generalized ESD test.
///
/// Up to `max_outliers` candidates are examined; the reported set is the
/// largest prefix whose extreme studentized deviate exceeds its critical
/// value, which makes the test robust to masking by multiple outliers.
pub fn esd_outliers(values: &[f64], alpha: f64, max_outliers: usize) -> Vec<usize> {
    let n = values.len();
    if n < 3 || max_outliers == 0 {
        return Vec::new();
    }
    let max_outliers = max_outliers.min(n - 2);

    let mut active: Vec<usize> = (0..n).collect();
    let mut removed: Vec<usize> = Vec::new();
    let mut confirmed = 0;

    for i in 1..=max_outliers {
        let m = active.len();
        if m < 3 {
            break;
        }
        let mean = active.iter().map(|&j| values[j]).sum::<f64>() / m as f64;
        let var = active
            .iter()
            .map(|&j| (values[j] - mean).powi(2))
            .sum::<f64>()
            / (m - 1) as f64;
        let sd = var.sqrt();
        if sd == 0.0 {
            break;
        }

        let (pos, deviate) = active
            .iter()
            .enumerate()
            .map(|(k, &j)| (k, (values[j] - mean).abs() / sd))
            .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

        removed.push(active.remove(pos));
        if deviate > critical_value(n, i, alpha) {
            confirmed = i;
        }
    }

    removed.truncate(confirmed);
    removed
}

/// Rosner's critical value λ_i for the i-th removal step.
fn critical_value(n: usize, i: usize, alpha: f64) -> f64 {
    let n = n as f64;
    let i = i as f64;
    let p = 1.0 - alpha / (2.0 * (n - i + 1.0));
    let df = n - i - 1.0;
    let t = student_t_quantile(p, df);
    ((n - i) * t) / (((df + t * t) * (n - i + 1.0)).sqrt())
}

/// Student-t quantile via Cornish–Fisher around the normal quantile.
fn student_t_quantile(p: f64, df: f64) -> f64 {
    let z = normal_quantile(p);
    let z2 = z * z;
    let g1 = z * (z2 + 1.0) / 4.0;
    let g2 = z * (5.0 * z2 * z2 + 16.0 * z2 + 3.0) / 96.0;
    let g3 = z * (3.0 * z2 * z2 * z2 + 19.0 * z2 * z2 + 17.0 * z2 - 15.0) / 384.0;
    let g4 = z
        * (79.0 * z2 * z2 * z2 * z2 + 776.0 * z2 * z2 * z2 + 1482.0 * z2 * z2
            - 1920.0 * z2
            - 945.0)
        / 92160.0;
    z + g1 / df + g2 / (df * df) + g3 / (df * df * df) + g4 / (df * df * df * df)
}

/// Acklam's rational approximation to the standard normal quantile.
fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
