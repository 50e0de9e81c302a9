//! Period aggregation in the HEC-DSS convention.
//!
//! Each period is closed on the right and labelled by its end: the daily
//! value stamped `02JAN2000 0000` summarises `(01JAN2000 0000, 02JAN2000 0000]`.
//! Missing values are skipped; a period with no valid values is `NaN`.

use crate::series::{Column, Interval, SeriesError, TimeSeries};

/// Period means of every column.
pub fn per_aver(series: &TimeSeries, period: Interval) -> Result<TimeSeries, SeriesError> {
    aggregate(series, period, |v| v.iter().sum::<f64>() / v.len() as f64)
}

/// Period maxima of every column.
pub fn per_max(series: &TimeSeries, period: Interval) -> Result<TimeSeries, SeriesError> {
    aggregate(series, period, |v| v.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Period minima of every column.
pub fn per_min(series: &TimeSeries, period: Interval) -> Result<TimeSeries, SeriesError> {
    aggregate(series, period, |v| v.iter().copied().fold(f64::INFINITY, f64::min))
}

fn aggregate(
    series: &TimeSeries,
    period: Interval,
    reduce: impl Fn(&[f64]) -> f64,
) -> Result<TimeSeries, SeriesError> {
    let times = series.timestamps();
    let (Some(&first), Some(&last)) = (times.first(), times.last()) else {
        let columns = series
            .columns()
            .iter()
            .map(|c| Column::new(c.name.clone(), Vec::new()))
            .collect();
        return TimeSeries::irregular(Vec::new(), columns);
    };

    let first_edge = period.ceil(first);
    let n_bins = period.steps_between(first_edge, period.ceil(last)).max(0) as usize + 1;
    let bins: Vec<usize> = times
        .iter()
        .map(|t| period.steps_between(first_edge, period.ceil(*t)).max(0) as usize)
        .collect();

    let columns = series
        .columns()
        .iter()
        .map(|c| {
            let mut grouped: Vec<Vec<f64>> = vec![Vec::new(); n_bins];
            for (bin, v) in bins.iter().zip(&c.values) {
                if !v.is_nan() {
                    grouped[(*bin).min(n_bins - 1)].push(*v);
                }
            }
            let values = grouped
                .iter()
                .map(|g| if g.is_empty() { f64::NAN } else { reduce(g) })
                .collect();
            Column::new(c.name.clone(), values)
        })
        .collect();
    TimeSeries::regular(first_edge, period, columns)
}
