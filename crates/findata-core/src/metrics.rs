//! Derived financial metrics.
//!
//! Pure functions over numeric series used to enrich query results. None of
//! them touch the store; undefined results are reported as `None` rather than
//! `NaN` or infinity.

/// Compound annual growth rate between two point values.
///
/// `(end / start)^(1 / years) - 1`
///
/// # Returns
///
/// `None` when `years < 1` or either value is non-positive, since the growth
/// rate is undefined for non-positive bases.
///
/// # Example
///
/// ```rust
/// use findata_core::metrics::cagr;
///
/// let rate = cagr(100.0, 121.0, 2).unwrap();
/// assert!((rate - 0.1).abs() < 1e-12);
/// ```
#[must_use]
pub fn cagr(start: f64, end: f64, years: i64) -> Option<f64> {
    if years < 1 || start <= 0.0 || end <= 0.0 {
        return None;
    }
    Some((end / start).powf(1.0 / years as f64) - 1.0)
}

/// Simple return between two adjacent values: `(curr - prev) / prev`.
#[must_use]
pub fn simple_return(prev: f64, curr: f64) -> Option<f64> {
    if prev == 0.0 {
        return None;
    }
    Some((curr - prev) / prev)
}

/// Return from the first to the last point of a series.
#[must_use]
pub fn total_return(series: &[f64]) -> Option<f64> {
    match (series.first(), series.last()) {
        (Some(&first), Some(&last)) if series.len() >= 2 => simple_return(first, last),
        _ => None,
    }
}

/// Maximum drawdown of a price series.
///
/// Tracks the running peak and returns the most negative
/// `(price - peak) / peak` seen, i.e. the worst decline from any prior peak
/// to any later point. The peak only ever moves up.
///
/// # Returns
///
/// `None` for fewer than two points, `0.0` for a non-decreasing series and a
/// value in `(-1, 0]` otherwise.
#[must_use]
pub fn max_drawdown(series: &[f64]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }

    let mut peak = series[0];
    let mut worst = 0.0_f64;
    for &price in series {
        if price > peak {
            peak = price;
        }
        if peak > 0.0 {
            let drawdown = (price - peak) / peak;
            if drawdown < worst {
                worst = drawdown;
            }
        }
    }
    Some(worst)
}

/// Rounds to a fixed number of decimal places.
#[must_use]
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(places as i32);
    (value * factor).round() / factor
}
