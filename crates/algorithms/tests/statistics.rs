//! End-to-end tests over the public statistics API.
//!
//! Uses the four-key weights example
//! `{1: [2, 4], 2: [1], 3: [4], 4: [1, 3]}` plus generated lattices.

use std::collections::HashMap;

use approx::assert_relative_eq;
use proptest::prelude::*;
use spatialstats_algorithms::prelude::*;

fn example() -> WeightsMatrix<u32> {
    let mut rows = HashMap::new();
    rows.insert(1, vec![WeightEntry::new(2, 1.0), WeightEntry::new(4, 1.0)]);
    rows.insert(2, vec![WeightEntry::new(1, 1.0)]);
    rows.insert(3, vec![WeightEntry::new(4, 1.0)]);
    rows.insert(4, vec![WeightEntry::new(1, 1.0), WeightEntry::new(3, 1.0)]);
    WeightsMatrix::from_rows(rows, vec![1, 2, 3, 4], 4).unwrap()
}

/// Rook contiguity on a `size` x `size` lattice
fn lattice(size: usize) -> WeightsMatrix<usize> {
    let rows = (0..size * size)
        .map(|id| {
            let (r, c) = (id / size, id % size);
            let mut neighbors = Vec::new();
            if r > 0 {
                neighbors.push(WeightEntry::new(id - size, 1.0));
            }
            if r + 1 < size {
                neighbors.push(WeightEntry::new(id + size, 1.0));
            }
            if c > 0 {
                neighbors.push(WeightEntry::new(id - 1, 1.0));
            }
            if c + 1 < size {
                neighbors.push(WeightEntry::new(id + 1, 1.0));
            }
            (id, neighbors)
        })
        .collect();
    WeightsMatrix::from_ordered_rows(rows).unwrap()
}

fn gradient(size: usize) -> Vec<f64> {
    (0..size * size)
        .map(|id| (id / size + id % size) as f64 + ((id * 37) % 11) as f64 / 4.0)
        .collect()
}

#[test]
fn worked_example_lags() {
    let w = example();
    let ws = w.standardize();
    assert_eq!(
        ws.row(&1).unwrap(),
        vec![WeightEntry::new(2, 0.5), WeightEntry::new(4, 0.5)]
    );
    assert_eq!(neighbor_sum(&ws, &[1.0, 2.0, 3.0, 4.0]).unwrap(), vec![3.0, 1.0, 4.0, 2.0]);
}

#[test]
fn worked_example_csr_layout() {
    let w = example();
    let csr = w.sparse();
    assert_eq!(csr.row_index(), &[0, 2, 3, 4, 6]);
    assert_eq!(csr.col_index(), &[1, 3, 0, 3, 0, 2]);
    assert_eq!(csr.values(), &[1.0; 6]);
}

#[test]
fn constant_vector_moran_is_zero() {
    let w = lattice(4).standardize();
    let mut moran = Moran::with_x(&w, vec![3.5; 16]).unwrap();
    assert_eq!(moran.stat().unwrap(), 0.0);
}

#[test]
fn getis_ord_star_detection() {
    let w = example();
    let windowed = w.window();
    assert!(!GetisOrd::new(&w).is_star());
    assert!(GetisOrd::new(&windowed).is_star());

    // a forced G* over plain weights uses the windowed neighborhood
    let mut forced = GetisOrd::with_star(&w, true);
    forced.set_x(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let mut detected = GetisOrd::with_x(&windowed, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(forced.stat().unwrap(), detected.stat().unwrap());
}

#[test]
fn global_mc_same_across_modes() {
    let w = lattice(6).standardize();
    let x = gradient(6);

    let mut results = Vec::new();
    for mode in [
        ProcessingMode::Sequential,
        ProcessingMode::Parallel,
        ProcessingMode::ParallelWith(3),
    ] {
        let mut moran = Moran::with_x(&w, x.clone()).unwrap();
        moran.set_processing_mode(mode);
        results.push(moran.mc(99, Some(2024)).unwrap());
    }
    assert!(results.windows(2).all(|p| p[0].to_bits() == p[1].to_bits()));
}

#[test]
fn local_mc_same_across_modes() {
    let w = lattice(6);
    let x = gradient(6);

    let mut sequential = LocalMoran::with_x(&w, x.clone()).unwrap();
    sequential.set_processing_mode(ProcessingMode::Sequential);
    let mut parallel = LocalMoran::with_x(&w, x.clone()).unwrap();
    parallel.set_processing_mode(ProcessingMode::ParallelWith(4));
    assert_eq!(
        sequential.mc(99, Some(17)).unwrap(),
        parallel.mc(99, Some(17)).unwrap()
    );

    let mut g1 = GetisOrd::with_x(&w, x.clone()).unwrap();
    g1.set_processing_mode(ProcessingMode::Sequential);
    let mut g2 = GetisOrd::with_x(&w, x).unwrap();
    assert_eq!(g1.mc(49, Some(5)).unwrap(), g2.mc(49, Some(5)).unwrap());
}

#[test]
fn seeded_mc_is_cached_and_rebind_clears() {
    let w = lattice(4).standardize();
    let mut moran = Moran::with_x(&w, gradient(4)).unwrap();
    let p = moran.mc_with(&PermutationParams::seeded(99, 8)).unwrap();
    assert_eq!(moran.state(), StatState::PermutationTested);
    assert_eq!(moran.mc(99, Some(8)).unwrap(), p);

    moran.set_x(gradient(4).into_iter().rev().collect()).unwrap();
    assert_eq!(moran.state(), StatState::Bound);
}

#[test]
fn local_summary_in_key_order() {
    let w = example();
    let mut lisa = LocalMoran::with_x(&w, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let summary = lisa.summary(99, Some(1)).unwrap();
    let keys: Vec<u32> = summary.iter().map(|s| s.key).collect();
    assert_eq!(keys, vec![1, 2, 3, 4]);
    assert_eq!(summary[2].group, Cluster::HighHigh);
    for s in &summary {
        assert!((0.01..=1.0).contains(&s.p));
    }
}

#[test]
fn global_summary() {
    let w = lattice(5).standardize();
    let mut geary = Geary::with_x(&w, gradient(5)).unwrap();
    let summary = geary.summary(99, Some(3)).unwrap();
    assert_relative_eq!(summary.stat, geary.stat().unwrap());
    assert!(summary.p >= 0.01 && summary.p <= 1.0);
}

/// Returns a vector one short of the requested keys
struct ShortSource;

impl FieldSource<usize> for ShortSource {
    fn fetch(&self, _field: &str, keys: &[usize]) -> Result<Vec<f64>> {
        Ok(vec![1.0; keys.len().saturating_sub(1)])
    }
}

#[test]
fn source_length_mismatch_rejected() {
    let w = lattice(3);
    let mut moran = Moran::new(&w);
    assert_eq!(
        moran.resolve_x(&ShortSource, "any").unwrap_err(),
        Error::DimensionMismatch {
            expected: 9,
            actual: 8
        }
    );
    assert_eq!(moran.state(), StatState::Unbound);
}

#[test]
fn closed_forms_missing_where_expected() {
    let w = lattice(3);
    let x = gradient(3);
    let y: Vec<f64> = x.iter().map(|v| v * v).collect();

    let mut bivariate = BivariateMoran::with_xy(&w, x.clone(), y.clone()).unwrap();
    assert!(matches!(bivariate.variance(), Err(Error::NotImplemented { .. })));
    let mut local_bivariate = LocalBivariateMoran::with_xy(&w, x.clone(), y.clone()).unwrap();
    assert!(matches!(local_bivariate.expectation(), Err(Error::NotImplemented { .. })));
    let mut geary = LocalGeary::with_x(&w, x.clone()).unwrap();
    assert!(matches!(geary.z_score(), Err(Error::NotImplemented { .. })));
    let mut multi = MultivariateGeary::with_variables(&w, vec![x, y]).unwrap();
    assert!(matches!(multi.variance(), Err(Error::NotImplemented { .. })));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn p_values_within_bounds(
        values in prop::collection::vec(-100.0f64..100.0, 9),
        permutations in 1usize..60,
        seed in any::<u64>(),
    ) {
        let w = lattice(3).standardize();
        let lower = 1.0 / (permutations as f64 + 1.0);

        let mut moran = Moran::with_x(&w, values.clone()).unwrap();
        let p = moran.mc(permutations, Some(seed)).unwrap();
        prop_assert!(p >= lower && p <= 1.0);

        let mut lisa = LocalMoran::with_x(&w, values).unwrap();
        for p in lisa.mc(permutations, Some(seed)).unwrap() {
            prop_assert!(p >= lower && p <= 1.0);
        }
    }
}
