use microstat::{
    Ensemble, EnsembleBuilder, Grid, LabelField, Mask, PathMode, Statistic, clusters,
};
use ndarray::Dimension;

mod common;

#[cfg(test)]
mod tests {
    use super::*;

    // S2 at a single lag of a 2D grid, computed pair by pair
    fn brute_force_s2(f: &Grid<bool>, mask: Option<&Mask>, lag: [isize; 2]) -> Option<f64> {
        let shape = f.shape();
        let (mut sum, mut norm) = (0.0, 0.0);
        for y in 0..shape[0] as isize {
            for x in 0..shape[1] as isize {
                let Some(other) = f.linear_index(&[y + lag[0], x + lag[1]]) else {
                    continue;
                };
                let here = f.linear_index(&[y, x]).unwrap();
                let masked = |i: usize| mask.is_some_and(|m| m.get_linear(i));
                if masked(here) || masked(other) {
                    continue;
                }
                norm += 1.0;
                if f.get_linear(here) && f.get_linear(other) {
                    sum += 1.0;
                }
            }
        }
        (norm > 0.0).then(|| sum / norm)
    }

    fn seven_by_seven_stripe() -> Grid<bool> {
        let mut values = vec![false; 49];
        for col in 2..=4 {
            values[3 * 7 + col] = true;
        }
        Grid::from_shape_vec(&[7, 7], values, true).unwrap()
    }

    #[test]
    fn zero_lag_is_the_mean() {
        let f = common::random_binary(&[21, 16], 0.4, true, 5);
        let mut s2 = Ensemble::new(&[5, 5], true, Statistic::S2).unwrap();
        s2.accumulate(&f, None).unwrap();
        let mut mean = Ensemble::new(&[1, 1], true, Statistic::Mean).unwrap();
        let phi = mean.mean(&f, None).unwrap().unwrap();

        let center = s2.roi().center();
        let zero_lag = s2.result()[[center[0], center[1]]].unwrap();
        assert!(common::isclose(zero_lag, phi, 1e-14, 0.0));
    }

    #[test]
    fn symmetric_in_the_lag() {
        for periodic in [true, false] {
            let f = common::random_binary(&[12, 15], 0.5, periodic, 11);
            let mut ensemble = Ensemble::new(&[7, 5], periodic, Statistic::S2).unwrap();
            ensemble.accumulate(&f, None).unwrap();
            let result = ensemble.result();
            for i in 0..7 {
                for j in 0..5 {
                    assert_eq!(result[[i, j]], result[[6 - i, 4 - j]]);
                }
            }
        }
    }

    #[test]
    fn matches_brute_force_with_mask() {
        let f = common::random_binary(&[10, 13], 0.5, false, 21);
        let mask = common::random_binary(&[10, 13], 0.2, false, 22);
        let mut ensemble = Ensemble::new(&[5, 5], false, Statistic::S2).unwrap();
        ensemble.accumulate(&f, Some(&mask)).unwrap();
        let result = ensemble.result();
        for (index, value) in result.indexed_iter() {
            let lag = ensemble.roi().lag_of(index.slice());
            let expected = brute_force_s2(&f, Some(&mask), [lag[0], lag[1]]);
            match (value, expected) {
                (Some(v), Some(e)) => assert!(common::isclose(*v, e, 1e-14, 0.0)),
                (v, e) => assert_eq!(*v, e),
            }
        }
    }

    #[test]
    fn querying_is_idempotent() {
        let f = common::random_binary(&[9, 9], 0.3, true, 3);
        let mut ensemble = Ensemble::new(&[3, 3], true, Statistic::S2).unwrap();
        ensemble.accumulate(&f, None).unwrap();
        let first = ensemble.result();
        assert_eq!(ensemble.result(), first);
        assert_eq!(ensemble.variance(), ensemble.variance());
    }

    #[test]
    fn fully_masked_images_add_nothing() {
        let f = common::random_binary(&[6, 6], 0.5, true, 8);
        let mask = Grid::filled(&[6, 6], true, true).unwrap();

        let mut ensemble = Ensemble::new(&[3, 3], true, Statistic::S2).unwrap();
        ensemble.accumulate(&f, Some(&mask)).unwrap();
        assert!(ensemble.result().iter().all(Option::is_none));
        assert!(ensemble.norm().iter().all(|&n| n == 0.0));

        ensemble.accumulate(&f, None).unwrap();
        let before = ensemble.result();
        ensemble.accumulate(&f, Some(&mask)).unwrap();
        assert_eq!(ensemble.result(), before);
    }

    #[test]
    fn stripe_two_point_probability() {
        let f = seven_by_seven_stripe();
        let mut ensemble = Ensemble::new(&[5, 5], true, Statistic::S2).unwrap();
        ensemble.accumulate(&f, None).unwrap();
        let result = ensemble.result();
        for (j, count) in [1.0, 2.0, 3.0, 2.0, 1.0].into_iter().enumerate() {
            assert_eq!(result[[2, j]], Some(count / 49.0));
        }
        for j in 0..5 {
            assert_eq!(result[[0, j]], Some(0.0));
        }
    }

    #[test]
    fn stripe_lineal_path() {
        let f = seven_by_seven_stripe();
        for mode in [PathMode::Bresenham, PathMode::Actual, PathMode::Full] {
            let mut ensemble = EnsembleBuilder::new()
                .roi(&[7, 7])
                .periodic(true)
                .statistic(Statistic::LinealPath)
                .path_mode(mode)
                .build()
                .unwrap();
            ensemble.accumulate(&f, None).unwrap();
            let result = ensemble.result();
            for (j, count) in [0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0].into_iter().enumerate() {
                let value = result[[3, j]].unwrap();
                assert!(common::isclose(value, count / 49.0, 1e-14, 0.0));
            }
        }
    }

    #[test]
    fn cluster_function_of_a_single_cluster() {
        // with a single cluster, C2 reduces to S2
        let f = seven_by_seven_stripe();
        let labels = clusters(&f).unwrap();
        let mut c2 = Ensemble::new(&[5, 5], true, Statistic::C2).unwrap();
        c2.accumulate(labels.as_grid(), None).unwrap();
        let mut s2 = Ensemble::new(&[5, 5], true, Statistic::S2).unwrap();
        s2.accumulate(&f, None).unwrap();
        assert_eq!(c2.result(), s2.result());

        // C2 never exceeds S2
        let f = common::random_binary(&[15, 15], 0.45, true, 31);
        let labels = clusters(&f).unwrap();
        let mut c2 = Ensemble::new(&[5, 5], true, Statistic::C2).unwrap();
        c2.accumulate(labels.as_grid(), None).unwrap();
        let mut s2 = Ensemble::new(&[5, 5], true, Statistic::S2).unwrap();
        s2.accumulate(&f, None).unwrap();
        for (c, s) in c2.result().iter().zip(s2.result().iter()) {
            assert!(c.unwrap() <= s.unwrap());
        }
    }

    #[test]
    fn weighted_correlation_of_the_phase_itself() {
        // W2 with the indicator as weight is S2 divided by the volume fraction
        let f = common::random_binary(&[14, 11], 0.35, true, 41);
        let mut w2 = Ensemble::new(&[5, 5], true, Statistic::W2).unwrap();
        w2.accumulate_pair(&f, &f, None, None).unwrap();
        let mut s2 = Ensemble::new(&[5, 5], true, Statistic::S2).unwrap();
        s2.accumulate(&f, None).unwrap();
        let phi = f.count_foreground() as f64 / f.len() as f64;
        for (w, s) in w2.result().iter().zip(s2.result().iter()) {
            assert!(common::isclose(w.unwrap(), s.unwrap() / phi, 1e-12, 0.0));
        }
    }

    #[test]
    fn height_height_of_random_field() {
        let f = common::random_scalar(&[10, 12], true, 51);
        let mut ensemble = Ensemble::new(&[3, 3], true, Statistic::HeightHeight).unwrap();
        ensemble.accumulate(&f, None).unwrap();
        let result = ensemble.result();
        assert_eq!(result[[1, 1]], Some(0.0));

        let mut expected = 0.0;
        for y in 0..10 {
            for x in 0..12 {
                let a = f.get(&[y, x]).unwrap();
                let b = f.get(&[y, x + 1]).unwrap();
                expected += (b - a) * (b - a);
            }
        }
        expected /= 120.0;
        assert!(common::isclose(result[[1, 2]].unwrap(), expected, 1e-12, 0.0));
        let rms = ensemble.root_mean_square().unwrap();
        assert!(common::isclose(rms[[1, 2]].unwrap(), expected.sqrt(), 1e-12, 0.0));
    }

    #[test]
    fn parallel_ensembles_merge() {
        let images: Vec<Grid<bool>> = (0..4)
            .map(|seed| common::random_binary(&[16, 16], 0.5, true, 100 + seed))
            .collect();

        let mut serial = Ensemble::new(&[5, 5], true, Statistic::S2).unwrap();
        for image in images.iter() {
            serial.accumulate(image, None).unwrap();
        }

        let partial: Vec<Ensemble> = std::thread::scope(|s| {
            let handles: Vec<_> = images
                .chunks(2)
                .map(|chunk| {
                    s.spawn(move || {
                        let mut ensemble = Ensemble::new(&[5, 5], true, Statistic::S2).unwrap();
                        for image in chunk {
                            ensemble.accumulate(image, None).unwrap();
                        }
                        ensemble
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let mut merged = partial[0].clone();
        merged.merge(&partial[1]).unwrap();

        assert_eq!(merged.first(), serial.first());
        assert_eq!(merged.norm(), serial.norm());
    }

    #[test]
    fn fields_of_different_shapes() {
        let small = common::random_binary(&[6, 6], 0.5, true, 61);
        let large = common::random_binary(&[8, 5], 0.5, true, 62);

        let mut both = Ensemble::new(&[3, 3], true, Statistic::S2).unwrap();
        both.accumulate(&small, None).unwrap();
        both.accumulate(&large, None).unwrap();
        // every cell of both (periodic) fields contributes to every lag
        assert!(both.norm().iter().all(|&n| n == 76.0));

        let mut separate = Ensemble::new(&[3, 3], true, Statistic::S2).unwrap();
        separate.accumulate(&small, None).unwrap();
        let mut other = Ensemble::new(&[3, 3], true, Statistic::S2).unwrap();
        other.accumulate(&large, None).unwrap();
        separate.merge(&other).unwrap();
        assert_eq!(separate.first(), both.first());
        assert_eq!(separate.norm(), both.norm());
    }

    #[test]
    fn collapsed_walk_ends_at_bounded_edge() {
        // a single-cell cluster next to the right edge
        let labels = vec![0_usize, 0, 0, 0, 0, 1, 0];
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 0.0, 6.0];

        let clusters =
            LabelField::from_grid(Grid::from_shape_vec(&[7], labels.clone(), false).unwrap());
        let f = Grid::from_shape_vec(&[7], values.clone(), false).unwrap();
        let mut bounded = Ensemble::new(&[5], false, Statistic::W2c).unwrap();
        bounded
            .accumulate_collapsed(&clusters, &clusters.center_field(), &f, None)
            .unwrap();
        let result = bounded.result();
        assert_eq!(result[[2]], Some(5.5));
        assert_eq!(result[[1]], Some(4.0));
        // the walk towards +2 leaves the field right after the exit point
        assert_eq!(result[[3]], None);
        assert_eq!(result[[4]], None);

        let clusters = LabelField::from_grid(Grid::from_shape_vec(&[7], labels, true).unwrap());
        let f = Grid::from_shape_vec(&[7], values, true).unwrap();
        let mut periodic = Ensemble::new(&[5], true, Statistic::W2c).unwrap();
        periodic
            .accumulate_collapsed(&clusters, &clusters.center_field(), &f, None)
            .unwrap();
        assert_eq!(periodic.result()[[3]], Some(1.0));
    }

    #[test]
    fn roi_larger_than_periodic_field() {
        let f = common::random_binary(&[3, 3], 0.5, true, 71);
        let mut ensemble = Ensemble::new(&[7, 7], true, Statistic::S2).unwrap();
        ensemble.accumulate(&f, None).unwrap();
        let result = ensemble.result();
        assert!(ensemble.norm().iter().all(|&n| n == 9.0));

        // lags that differ by the field's period are the same lag
        for i in 0..4 {
            for j in 0..7 {
                assert_eq!(result[[i, j]], result[[i + 3, j]]);
                assert_eq!(result[[j, i]], result[[j, i + 3]]);
            }
        }
        let phi = f.count_foreground() as f64 / 9.0;
        assert!(common::isclose(result[[3, 3]].unwrap(), phi, 1e-14, 0.0));
        assert_eq!(result[[0, 0]], result[[3, 3]]);
    }

    #[test]
    fn boundary_conditions_must_match() {
        let bounded = common::random_binary(&[6, 6], 0.5, false, 81);
        let mut ensemble = Ensemble::new(&[3, 3], true, Statistic::S2).unwrap();
        let err = ensemble.accumulate(&bounded, None).unwrap_err();
        assert!(err.is_configuration());
        assert!(ensemble.norm().iter().all(|&n| n == 0.0));

        let periodic = bounded.with_periodic(true).unwrap();
        let err = ensemble
            .accumulate_pair(&periodic, &bounded, None, None)
            .unwrap_err();
        assert!(err.is_configuration());
        ensemble.accumulate(&periodic, None).unwrap();
    }

    #[test]
    fn errors() {
        let f = common::random_binary(&[6, 6], 0.5, true, 1);
        let g = common::random_binary(&[6, 7], 0.5, true, 2);

        let mut s2 = Ensemble::new(&[3, 3], true, Statistic::S2).unwrap();
        assert!(s2.accumulate_pair(&f, &g, None, None).unwrap_err().is_shape_mismatch());
        let scalar = common::random_scalar(&[6, 6], true, 3);
        assert!(s2.accumulate(&scalar, None).unwrap_err().is_configuration());
        assert!(s2.norm().iter().all(|&n| n == 0.0));

        let mut w2c = Ensemble::new(&[3, 3], true, Statistic::W2c).unwrap();
        assert!(w2c.accumulate_pair(&f, &f, None, None).unwrap_err().is_configuration());
        let labels = clusters(&f).unwrap();
        let other = clusters(&g).unwrap();
        let err = w2c
            .accumulate_collapsed(&labels, &other, &f, None)
            .unwrap_err();
        assert!(err.is_shape_mismatch());

        let err = EnsembleBuilder::new()
            .roi(&[3, 3])
            .statistic_name("S4")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("heightheight"));
    }
}
