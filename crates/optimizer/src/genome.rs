//! Genetic operators over [`StrategyWeights`].
//!
//! All operators return in-range genomes: out-of-range values produced by
//! mutation are clamped here and never surface as errors.

use rand::Rng;

use common::{Gene, StrategyWeights};

/// Genome with every gene drawn uniformly and independently from its range.
pub fn random_weights<R: Rng + ?Sized>(rng: &mut R) -> StrategyWeights {
    let mut weights = StrategyWeights::default();
    for gene in Gene::ALL {
        let (min, max) = gene.range();
        weights.set(gene, rng.gen_range(min..=max));
    }
    weights
}

/// Gene-wise arithmetic mean of two parents.
pub fn crossover(a: &StrategyWeights, b: &StrategyWeights) -> StrategyWeights {
    let mut child = *a;
    for gene in Gene::ALL {
        child.set(gene, (a.get(gene) + b.get(gene)) / 2.0);
    }
    child.clamped()
}

/// Perturb each gene with probability `rate` by a uniform delta within
/// ±[`Gene::mutation_step`], then clamp.
pub fn mutate<R: Rng + ?Sized>(rng: &mut R, weights: StrategyWeights, rate: f64) -> StrategyWeights {
    let mut mutated = weights;
    for gene in Gene::ALL {
        if rng.gen_bool(rate.clamp(0.0, 1.0)) {
            let step = gene.mutation_step();
            let delta = rng.gen_range(-step..=step);
            mutated.set(gene, mutated.get(gene) + delta);
        }
    }
    mutated.clamped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_weights_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            assert!(random_weights(&mut rng).is_in_range());
        }
    }

    #[test]
    fn crossover_takes_the_mean() {
        let a = StrategyWeights {
            super_trend_weight: 0.0,
            bollinger_weight: 3.0,
            ema_weight: 1.0,
            rsi_weight: 2.0,
            macd_weight: 0.5,
            strength_threshold: 4.0,
            atr_multiplier: 1.5,
        };
        let b = StrategyWeights {
            super_trend_weight: 2.0,
            bollinger_weight: 1.0,
            ema_weight: 1.0,
            rsi_weight: 0.0,
            macd_weight: 1.5,
            strength_threshold: 8.0,
            atr_multiplier: 4.0,
        };
        let child = crossover(&a, &b);
        assert_eq!(child.super_trend_weight, 1.0);
        assert_eq!(child.bollinger_weight, 2.0);
        assert_eq!(child.ema_weight, 1.0);
        assert_eq!(child.rsi_weight, 1.0);
        assert_eq!(child.macd_weight, 1.0);
        assert_eq!(child.strength_threshold, 6.0);
        assert_eq!(child.atr_multiplier, 2.75);
    }

    #[test]
    fn zero_rate_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let w = StrategyWeights::default();
        assert_eq!(mutate(&mut rng, w, 0.0), w);
    }

    #[test]
    fn mutation_moves_at_most_one_step() {
        let mut rng = StdRng::seed_from_u64(3);
        let base = StrategyWeights {
            atr_multiplier: 2.5,
            strength_threshold: 5.0,
            ..StrategyWeights::default()
        };
        for _ in 0..500 {
            let m = mutate(&mut rng, base, 1.0);
            for gene in Gene::ALL {
                let moved = (m.get(gene) - base.get(gene)).abs();
                assert!(moved <= gene.mutation_step() + 1e-12, "{gene:?} moved {moved}");
            }
        }
    }

    #[test]
    fn mutation_at_bounds_is_clamped() {
        let mut rng = StdRng::seed_from_u64(11);
        let edge = StrategyWeights {
            super_trend_weight: 0.0,
            bollinger_weight: 3.0,
            ema_weight: 0.0,
            rsi_weight: 3.0,
            macd_weight: 0.0,
            strength_threshold: 10.0,
            atr_multiplier: 1.5,
        };
        for _ in 0..500 {
            assert!(mutate(&mut rng, edge, 1.0).is_in_range());
        }
    }
}
