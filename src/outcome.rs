use crate::error::ModelError;

/// Joint scoreline distribution for one fixture. `matrix[i][j]` is the
/// probability of a home `i` - away `j` final score under independence of
/// the two scoring distributions; the three scalars partition the total
/// matrix mass.
#[derive(Debug, Clone, PartialEq)]
pub struct JointOutcome {
    pub matrix: Vec<Vec<f64>>,
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

/// Combines two independent scoring distributions into the joint scoreline
/// matrix and the aggregated home-win / draw / away-win probabilities.
///
/// The two distributions must have the same length, so that the win/draw
/// comparison covers every cell instead of silently stopping at the shorter
/// axis.
pub fn joint(home: &[f64], away: &[f64]) -> Result<JointOutcome, ModelError> {
    if home.is_empty() || away.is_empty() {
        return Err(ModelError::InvalidInput("empty pmf".to_string()));
    }
    if home.len() != away.len() {
        return Err(ModelError::InvalidInput(format!(
            "pmf lengths differ: home {} vs away {}",
            home.len(),
            away.len()
        )));
    }
    for (name, pmf) in [("home", home), ("away", away)] {
        if let Some(p) = pmf.iter().find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0) {
            return Err(ModelError::InvalidInput(format!(
                "{name} pmf entry {p} is not a probability"
            )));
        }
    }

    let k = home.len();
    let mut matrix = vec![vec![0.0; k]; k];
    for (i, h) in home.iter().enumerate() {
        for (j, a) in away.iter().enumerate() {
            matrix[i][j] = h * a;
        }
    }

    let mut home_win = 0.0;
    let mut draw = 0.0;
    let mut away_win = 0.0;
    for (i, row) in matrix.iter().enumerate() {
        for (j, p) in row.iter().enumerate() {
            if i > j {
                home_win += p;
            } else if i < j {
                away_win += p;
            } else {
                draw += p;
            }
        }
    }

    Ok(JointOutcome {
        matrix,
        home_win,
        draw,
        away_win,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_pmfs_give_known_split() {
        let p = [0.5, 0.3, 0.2];
        let out = joint(&p, &p).expect("valid pmfs");
        assert!((out.draw - 0.38).abs() < 1e-12);
        assert!((out.home_win - 0.31).abs() < 1e-12);
        assert!((out.away_win - 0.31).abs() < 1e-12);
        assert!((out.matrix[1][2] - 0.06).abs() < 1e-12);
    }

    #[test]
    fn aggregates_partition_the_matrix_mass() {
        let p = [0.62, 0.25, 0.09, 0.04];
        let q = [0.40, 0.33, 0.17, 0.10];
        let out = joint(&p, &q).unwrap();
        let mass: f64 = out.matrix.iter().flatten().sum();
        let split = out.home_win + out.draw + out.away_win;
        assert!((mass - split).abs() < 1e-12);
    }

    #[test]
    fn swapping_sides_swaps_win_probabilities() {
        let p = [0.5, 0.25, 0.15, 0.1];
        let q = [0.3, 0.4, 0.2, 0.1];
        let ab = joint(&p, &q).unwrap();
        let ba = joint(&q, &p).unwrap();
        // Mirrored sums accumulate in a different order; compare within
        // float epsilon.
        assert!((ab.home_win - ba.away_win).abs() < 1e-12);
        assert!((ab.away_win - ba.home_win).abs() < 1e-12);
        assert_eq!(ab.draw, ba.draw);
    }

    #[test]
    fn inputs_are_not_consumed_or_mutated() {
        let p = vec![0.7, 0.3];
        let q = vec![0.6, 0.4];
        let _ = joint(&p, &q).unwrap();
        assert_eq!(p, vec![0.7, 0.3]);
        assert_eq!(q, vec![0.6, 0.4]);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = joint(&[0.5, 0.5], &[0.4, 0.3, 0.3]).unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput(_)));
        assert!(err.to_string().contains("2"));
        assert!(err.to_string().contains("3"));
    }

    #[test]
    fn empty_pmf_is_rejected() {
        assert!(joint(&[], &[1.0]).is_err());
        assert!(joint(&[1.0], &[]).is_err());
    }

    #[test]
    fn out_of_range_entries_are_rejected() {
        assert!(joint(&[0.5, 1.5], &[0.5, 0.5]).is_err());
        assert!(joint(&[0.5, 0.5], &[-0.1, 0.5]).is_err());
        assert!(joint(&[f64::NAN, 0.5], &[0.5, 0.5]).is_err());
    }
}
