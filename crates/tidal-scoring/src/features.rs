//! Per-candidate feature vectors and column normalisation.

/// Number of features per candidate.
pub const FEATURE_COUNT: usize = 4;

/// Column: encounters between the candidate and the destination.
pub const ENCOUNTER: usize = 0;
/// Column: distance between the candidate and the destination.
pub const DISTANCE: usize = 1;
/// Column: fraction of the candidate's buffer in use.
pub const OCCUPANCY: usize = 2;
/// Column: the candidate's recent delivery successes.
pub const SUCCESS: usize = 3;

/// Features of one candidate relay for one message.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Min-max scale every column of `rows` into [0, 1] in place.
///
/// A column whose values are all equal carries no information and becomes
/// all zeros.
pub fn normalize(rows: &mut [FeatureVector]) {
    for column in 0..FEATURE_COUNT {
        let (min, max) = rows.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), row| (min.min(row[column]), max.max(row[column])),
        );
        let spread = max - min;

        for row in rows.iter_mut() {
            row[column] = if spread > 0.0 {
                (row[column] - min) / spread
            } else {
                0.0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_scale_independently() {
        let mut rows = vec![
            [0.0, 100.0, 0.5, 3.0],
            [10.0, 300.0, 0.5, 1.0],
            [5.0, 200.0, 0.5, 2.0],
        ];
        normalize(&mut rows);

        assert_eq!(rows[0], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(rows[1], [1.0, 1.0, 0.0, 0.0]);
        assert_eq!(rows[2], [0.5, 0.5, 0.0, 0.5]);
    }

    #[test]
    fn constant_column_is_zero() {
        let mut rows = vec![[7.0; FEATURE_COUNT], [7.0; FEATURE_COUNT]];
        normalize(&mut rows);
        assert!(rows.iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn empty_and_single_rows() {
        let mut empty: Vec<FeatureVector> = Vec::new();
        normalize(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![[1.0, 2.0, 0.3, 4.0]];
        normalize(&mut single);
        assert_eq!(single[0], [0.0; FEATURE_COUNT]);
    }
}
