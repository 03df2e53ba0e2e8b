use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Dirichlet, Distribution};
use rstest::rstest;
use sales_forecast::models::{Forecaster, MovingAverageForecaster};
use sales_forecast::{
    forecast, ForecastError, Observation, SalesRecord, Series, SeriesStore, SizeAllocator,
    SizeRatioProfile,
};
use std::collections::BTreeMap;

fn random_series(rng: &mut StdRng, n: usize) -> Series {
    let observations = (0..n)
        .map(|i| {
            let date = NaiveDate::from_ymd_opt(2010 + i as i32, 1, 1).unwrap();
            let sizes: BTreeMap<u32, f64> = (6..=9)
                .map(|size| (size, rng.gen_range(0..=200) as f64))
                .collect();
            let total = sizes.values().sum();
            Observation::new(date, total, sizes)
        })
        .collect();
    Series::new("Retail Store A", observations).unwrap()
}

fn profile_from(ratios: &[f64]) -> SizeRatioProfile {
    let ratios = ratios
        .iter()
        .enumerate()
        .map(|(i, &r)| (4 + i as u32, r))
        .collect();
    SizeRatioProfile::new(ratios).unwrap()
}

#[test]
fn test_moving_average_is_rounded_trailing_mean() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..200 {
        let n = rng.gen_range(2..=8);
        let series = random_series(&mut rng, n);
        let totals = series.totals();

        for k in 1..=n {
            let forecast = MovingAverageForecaster::new(k)
                .unwrap()
                .forecast(&series)
                .unwrap();
            let mean = totals[n - k..].iter().sum::<f64>() / k as f64;

            assert!(forecast >= 0);
            assert_eq!(forecast, mean.round_ties_even() as i64, "n={} k={}", n, k);
        }
    }
}

#[test]
fn test_fewer_than_two_observations_rejected() {
    let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    let only = Observation::new(date, 10.0, BTreeMap::from([(8, 10.0)]));

    assert!(matches!(
        Series::new("Online Store", vec![only]),
        Err(ForecastError::InsufficientData { found: 1, .. })
    ));
    assert!(matches!(
        Series::new("Online Store", Vec::new()),
        Err(ForecastError::InsufficientData { found: 0, .. })
    ));

    let store = SeriesStore::new(vec![SalesRecord {
        institution: "Online Store".to_string(),
        date,
        total: 10.0,
        sizes: BTreeMap::from([(8, 10.0)]),
    }]);
    assert!(store.series("Online Store").is_err());
}

#[test]
fn test_allocation_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let dirichlet = Dirichlet::new(&[1.0; 12]).unwrap();

    for _ in 0..50 {
        let profile = profile_from(&dirichlet.sample(&mut rng));
        let total = rng.gen_range(0..10_000);

        assert_eq!(
            SizeAllocator.allocate(total, &profile),
            SizeAllocator.allocate(total, &profile)
        );
    }

    let series = random_series(&mut rng, 4);
    assert_eq!(forecast(&series, 2).unwrap(), forecast(&series, 2).unwrap());
}

#[rstest]
#[case(2, 0.3)]
#[case(3, 0.2)]
#[case(12, 0.2)]
#[case(12, 5.0)]
fn test_drift_within_bound_for_generated_profiles(#[case] sizes: usize, #[case] alpha: f64) {
    let mut rng = StdRng::seed_from_u64(sizes as u64);
    let dirichlet = Dirichlet::new(&vec![alpha; sizes]).unwrap();

    for _ in 0..500 {
        let ratios: Vec<f64> = dirichlet.sample(&mut rng);
        if ratios.iter().any(|r| !r.is_finite()) {
            continue;
        }
        let profile = profile_from(&ratios);
        let total = rng.gen_range(0..5_000);

        let allocation = SizeAllocator.allocate(total, &profile);
        let drift = SizeAllocator::drift(total, &allocation);

        assert!(
            drift.abs() <= SizeAllocator::drift_bound(&profile),
            "drift {} for {:?} at total {}",
            drift,
            ratios,
            total
        );
    }
}

#[rstest]
#[case(vec![1.0, 0.0, 0.0, 0.0], 0)]
#[case(vec![0.0, 0.0, 0.0, 1.0], 0)]
#[case(vec![0.5, 0.5], 0)]
#[case(vec![0.25, 0.25, 0.25, 0.25], -2)]
fn test_drift_for_extreme_profiles(#[case] ratios: Vec<f64>, #[case] expected: i64) {
    let profile = profile_from(&ratios);

    // 0.25 * 1002 = 250.5 rounds down to the even 250 four times
    let allocation = SizeAllocator.allocate(1002, &profile);
    let drift = SizeAllocator::drift(1002, &allocation);

    assert_eq!(drift, expected);
    assert!(drift.abs() <= SizeAllocator::drift_bound(&profile));
}
