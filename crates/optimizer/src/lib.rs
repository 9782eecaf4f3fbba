pub mod genome;
pub mod population;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info};

use common::{Error, Result, Score, StrategyWeights};
use strategy::{fitness, ReplayWindow, StrategySettings};

use crate::population::{next_generation, rank, seed_population};

/// Search parameters, loaded from the `[optimizer]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Top genomes copied unchanged into the next generation.
    pub elite: usize,
    /// Fresh random genomes appended to every new generation.
    pub random_tail: usize,
    pub tournament_size: usize,
    /// Per-gene mutation probability.
    pub mutation_rate: f64,
    /// Fixed RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 50,
            elite: 5,
            random_tail: 20,
            tournament_size: 5,
            mutation_rate: 0.2,
            seed: None,
        }
    }
}

impl GeneticConfig {
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(Error::Config("population_size must be at least 1".into()));
        }
        if self.generations == 0 {
            return Err(Error::Config("generations must be at least 1".into()));
        }
        if self.elite + self.random_tail > self.population_size {
            return Err(Error::Config(format!(
                "elite ({}) + random_tail ({}) exceeds population_size ({})",
                self.elite, self.random_tail, self.population_size
            )));
        }
        if self.tournament_size < 2 {
            return Err(Error::Config("tournament_size must be at least 2".into()));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(Error::Config(format!(
                "mutation_rate must be within [0, 1], got {}",
                self.mutation_rate
            )));
        }
        Ok(())
    }
}

/// Fitness summary of one evaluated generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
    pub best_weights: StrategyWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    /// Best genome of the final generation.
    pub best: Score,
    pub history: Vec<GenerationStats>,
}

/// Generational genetic search over [`StrategyWeights`].
///
/// Fitness is the final realized P&L of a full strategy replay over the
/// candle window. Each generation evaluates every genome concurrently on its
/// own cursor and joins them all before breeding the next population.
pub struct GeneticOptimizer {
    config: GeneticConfig,
    settings: StrategySettings,
    rng: StdRng,
}

impl GeneticOptimizer {
    pub fn new(config: GeneticConfig, settings: StrategySettings) -> Result<Self> {
        config.validate()?;
        settings.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            settings,
            rng,
        })
    }

    pub fn config(&self) -> &GeneticConfig {
        &self.config
    }

    pub async fn run(&mut self, window: ReplayWindow) -> Result<OptimizationReport> {
        info!(
            candles = window.len(),
            population = self.config.population_size,
            generations = self.config.generations,
            "Starting genetic optimization"
        );

        let mut population = seed_population(&mut self.rng, self.config.population_size);
        let mut history = Vec::with_capacity(self.config.generations);
        let mut best = None;

        for generation in 0..self.config.generations {
            let mut scores = self.evaluate(&population, &window).await?;
            rank(&mut scores);

            let stats = summarize(generation, &scores);
            info!(
                generation,
                best = stats.best,
                mean = stats.mean,
                worst = stats.worst,
                weights = ?stats.best_weights,
                "Generation evaluated"
            );
            history.push(stats);
            best = scores.first().copied();

            if generation + 1 < self.config.generations {
                population = next_generation(&mut self.rng, &scores, &self.config);
            }
        }

        // validate() guarantees at least one generation of at least one genome
        let best = best.ok_or_else(|| Error::Other("optimizer produced no scores".into()))?;
        info!(fitness = best.fitness, weights = ?best.weights, "Optimization finished");
        Ok(OptimizationReport { best, history })
    }

    /// Score every genome on a private replay of `window`, in population
    /// order.
    async fn evaluate(
        &self,
        population: &[StrategyWeights],
        window: &ReplayWindow,
    ) -> Result<Vec<Score>> {
        let mut tasks = JoinSet::new();
        for (index, &weights) in population.iter().enumerate() {
            let replay = window.replay();
            let settings = self.settings.clone();
            tasks.spawn_blocking(move || (index, fitness(weights, &settings, replay)));
        }

        let mut fitnesses = vec![0.0; population.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, value) = joined?;
            fitnesses[index] = value;
        }
        debug!(evaluated = population.len(), "Generation joined");

        Ok(population
            .iter()
            .zip(fitnesses)
            .map(|(&weights, fitness)| Score { weights, fitness })
            .collect())
    }
}

fn summarize(generation: usize, ranked: &[Score]) -> GenerationStats {
    let finite: Vec<f64> = ranked
        .iter()
        .map(|s| s.fitness)
        .filter(|f| f.is_finite())
        .collect();
    let mean = if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };
    GenerationStats {
        generation,
        best: ranked.first().map_or(0.0, |s| s.fitness),
        mean,
        worst: ranked.last().map_or(0.0, |s| s.fitness),
        best_weights: ranked.first().map_or_else(StrategyWeights::default, |s| s.weights),
    }
}
