use scoreline::error::ModelError;
use scoreline::outcome::joint;
use scoreline::poisson_gamma::{PoissonGammaConfig, fit, pool};

#[test]
fn two_fitted_sides_combine_into_a_full_outcome() {
    let cfg = PoissonGammaConfig::default();
    let home = fit(&pool(&[2, 1, 3, 0, 2], &[1, 2, 1, 1, 0]), &cfg).unwrap();
    let away = fit(&pool(&[0, 1, 1, 0, 2], &[1, 0, 2, 1, 1]), &cfg).unwrap();

    let out = joint(&home, &away).unwrap();
    assert_eq!(out.matrix.len(), 15);
    assert_eq!(out.matrix[0].len(), 15);

    let total = out.home_win + out.draw + out.away_win;
    assert!(total > 0.98 && total <= 1.0, "total {total}");

    // The home side scores ~1.5 a game against a ~0.9 away side.
    assert!(out.home_win > out.away_win);
}

#[test]
fn truncated_pmf_still_covers_at_least_99_percent() {
    let cfg = PoissonGammaConfig::default();
    let pmf = fit(&[1, 1, 2, 0, 1, 3, 2, 1], &cfg).unwrap();
    let coverage: f64 = pmf.iter().sum();
    assert!(coverage > 0.99 && coverage <= 1.0, "coverage {coverage}");
}

#[test]
fn win_probabilities_are_symmetric_under_side_swap() {
    let cfg = PoissonGammaConfig {
        limit: 8,
        ..PoissonGammaConfig::default()
    };
    let p = fit(&[2, 3, 1, 2, 4], &cfg).unwrap();
    let q = fit(&[0, 1, 0, 1, 1], &cfg).unwrap();

    let pq = joint(&p, &q).unwrap();
    let qp = joint(&q, &p).unwrap();
    // The mirrored sums accumulate in a different order, so compare within
    // float epsilon rather than bitwise.
    assert!((pq.home_win - qp.away_win).abs() < 1e-12);
    assert!((pq.away_win - qp.home_win).abs() < 1e-12);
    assert_eq!(pq.draw, qp.draw);
}

#[test]
fn the_whole_pipeline_is_deterministic() {
    let cfg = PoissonGammaConfig::default();
    let run = || {
        let home = fit(&[2, 0, 1, 1, 3], &cfg).unwrap();
        let away = fit(&[1, 1, 0, 2, 0], &cfg).unwrap();
        joint(&home, &away).unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.matrix, b.matrix);
    assert_eq!(a.home_win, b.home_win);
    assert_eq!(a.draw, b.draw);
    assert_eq!(a.away_win, b.away_win);
}

#[test]
fn hand_built_pmfs_give_the_textbook_split() {
    let p = [0.5, 0.3, 0.2];
    let out = joint(&p, &p).unwrap();
    assert!((out.draw - 0.38).abs() < 1e-12);
    assert!((out.home_win - 0.31).abs() < 1e-12);
    assert!((out.away_win - 0.31).abs() < 1e-12);
}

#[test]
fn invalid_inputs_fail_fast_with_named_offenders() {
    let cfg = PoissonGammaConfig::default();

    let err = fit(&[], &cfg).unwrap_err();
    assert!(matches!(err, ModelError::InvalidInput(_)));

    let err = fit(&[3, -1], &cfg).unwrap_err();
    assert!(err.to_string().contains("-1"));

    let zero_limit = PoissonGammaConfig {
        limit: 0,
        ..PoissonGammaConfig::default()
    };
    assert!(fit(&[1], &zero_limit).is_err());

    let err = joint(&[0.5, 0.5], &[0.2, 0.3, 0.5]).unwrap_err();
    assert!(matches!(err, ModelError::InvalidInput(_)));
}
