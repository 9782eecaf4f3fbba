use std::cmp::Ordering;

use rand::Rng;

use common::{Score, StrategyWeights};

use crate::genome::{crossover, mutate, random_weights};
use crate::GeneticConfig;

/// Descending by fitness. NaN fitness sorts last.
pub fn rank(scores: &mut [Score]) {
    scores.sort_by(|a, b| by_fitness_desc(a.fitness, b.fitness));
}

fn by_fitness_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// Initial population, every genome drawn uniformly.
pub fn seed_population<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Vec<StrategyWeights> {
    (0..size).map(|_| random_weights(rng)).collect()
}

/// Build the next population from scores already ranked by [`rank`].
///
/// Layout: the top `elite` genomes unchanged, then tournament children, then
/// `random_tail` fresh genomes. The result always has exactly
/// `population_size` members.
pub fn next_generation<R: Rng + ?Sized>(
    rng: &mut R,
    ranked: &[Score],
    config: &GeneticConfig,
) -> Vec<StrategyWeights> {
    let size = config.population_size;
    let mut next = Vec::with_capacity(size);

    next.extend(ranked.iter().take(config.elite).map(|s| s.weights));

    let bred = size.saturating_sub(next.len() + config.random_tail);
    for _ in 0..bred {
        let (a, b) = tournament(rng, ranked, config.tournament_size);
        let child = crossover(&a, &b);
        next.push(mutate(rng, child, config.mutation_rate));
    }

    while next.len() < size {
        next.push(random_weights(rng));
    }
    next
}

/// Draw `size` contestants uniformly with replacement and return the two
/// fittest.
fn tournament<R: Rng + ?Sized>(
    rng: &mut R,
    ranked: &[Score],
    size: usize,
) -> (StrategyWeights, StrategyWeights) {
    if ranked.is_empty() {
        return (random_weights(rng), random_weights(rng));
    }
    let mut picks: Vec<Score> = (0..size.max(2))
        .map(|_| ranked[rng.gen_range(0..ranked.len())])
        .collect();
    rank(&mut picks);
    (picks[0].weights, picks[1].weights)
}
