//! Engine configuration.
//!
//! [`EngineConfig`] holds every parameter that controls the island
//! search. The [`EngineConfig::descriptors`] list is the single source
//! of truth for the externally configurable subset: it drives request
//! validation, clamping in [`EngineConfig::from_params`], and UI
//! metadata.

use super::selection::Selection;
use crate::request::{AlgorithmParams, ParamValue, ParameterDescriptor};

/// Configuration for the rostering engine.
///
/// Controls population size, operator rates, termination conditions,
/// island topology, and parallelism.
///
/// # Defaults
///
/// ```
/// use u_roster::engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.population_size, 50);
/// assert_eq!(config.num_islands, 3);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_roster::engine::{EngineConfig, Selection};
///
/// let config = EngineConfig::default()
///     .with_population_size(80)
///     .with_selection(Selection::Tournament(5))
///     .with_mutation_rate(0.15)
///     .with_seed(42);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of chromosomes per island population.
    ///
    /// Larger populations increase diversity but slow down each
    /// generation. Typical range: 30–150.
    pub population_size: usize,

    /// Maximum number of generations per island before termination.
    pub max_generations: usize,

    /// Selection strategy for choosing parents.
    pub selection: Selection,

    /// Fraction of the population preserved as elites (0.0–0.5).
    ///
    /// Islands scale this by their specialization's elite factor.
    pub elite_rate: f64,

    /// Probability of applying crossover to a pair of parents (0.0–1.0).
    ///
    /// When crossover is not applied, a clone of one parent is used.
    pub crossover_rate: f64,

    /// Probability of mutating each offspring gene (0.0–1.0).
    ///
    /// Islands scale this by their specialization's mutation factor.
    pub mutation_rate: f64,

    /// Generations with no significant improvement before an island
    /// stops. Set to 0 to disable stagnation-based termination.
    pub stagnation_limit: usize,

    /// Minimum relative improvement to reset the stagnation counter.
    ///
    /// The improvement ratio is `|old - new| / |old|`; below this
    /// threshold the generation still counts as stagnating.
    pub convergence_threshold: f64,

    /// Number of specialized islands evolved concurrently.
    pub num_islands: usize,

    /// Generations between migration rounds.
    pub migration_interval: usize,

    /// Chromosomes copied per island per migration round.
    pub migration_size: usize,

    /// Whether quality-focused islands run bounded local search.
    pub enable_local_search: bool,

    /// Generations between local-search passes.
    pub local_search_interval: usize,

    /// Improvement attempts per local-search pass.
    pub local_search_iterations: usize,

    /// Whether to use worker threads (islands and in-island evaluation).
    pub parallel: bool,

    /// Random seed for reproducibility. `None` uses a random seed.
    ///
    /// Islands derive their own seeds from this one, so runs with the
    /// same seed match modulo migration timing.
    pub seed: Option<u64>,

    /// Optional wall-clock budget in milliseconds.
    ///
    /// A deadline watchdog trips the cancellation flag when the budget
    /// elapses; islands return their best-so-far.
    pub time_limit_ms: Option<u64>,

    /// Fitness cache capacity in entries.
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 200,
            selection: Selection::default(),
            elite_rate: 0.1,
            crossover_rate: 0.85,
            mutation_rate: 0.1,
            stagnation_limit: 30,
            convergence_threshold: 0.001,
            num_islands: 3,
            migration_interval: 10,
            migration_size: 3,
            enable_local_search: true,
            local_search_interval: 20,
            local_search_iterations: 30,
            parallel: true,
            seed: None,
            time_limit_ms: None,
            cache_capacity: crate::eval::DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Sets the per-island population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the maximum number of generations.
    pub fn with_max_generations(mut self, n: usize) -> Self {
        self.max_generations = n;
        self
    }

    /// Sets the selection strategy.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the elite rate.
    pub fn with_elite_rate(mut self, rate: f64) -> Self {
        self.elite_rate = rate.clamp(0.0, 0.5);
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the stagnation limit (0 to disable).
    pub fn with_stagnation_limit(mut self, limit: usize) -> Self {
        self.stagnation_limit = limit;
        self
    }

    /// Sets the convergence threshold.
    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold.max(0.0);
        self
    }

    /// Sets the island count.
    pub fn with_num_islands(mut self, n: usize) -> Self {
        self.num_islands = n.max(1);
        self
    }

    /// Sets the migration interval in generations.
    pub fn with_migration_interval(mut self, interval: usize) -> Self {
        self.migration_interval = interval.max(1);
        self
    }

    /// Sets the migration size.
    pub fn with_migration_size(mut self, size: usize) -> Self {
        self.migration_size = size.max(1);
        self
    }

    /// Enables or disables local search.
    pub fn with_local_search(mut self, enabled: bool) -> Self {
        self.enable_local_search = enabled;
        self
    }

    /// Enables or disables worker threads.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the wall-clock budget in milliseconds.
    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    /// Sets the fitness cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    /// Convenience builder for tournament size.
    ///
    /// Equivalent to `.with_selection(Selection::Tournament(k))`.
    pub fn with_tournament_size(self, k: usize) -> Self {
        self.with_selection(Selection::Tournament(k))
    }

    /// Preset for quick runs: small populations, tight budget.
    ///
    /// - Population: 30, Generations: 100, Islands: 2
    /// - Stagnation limit: 15, Time limit: 10s
    pub fn fast() -> Self {
        Self {
            population_size: 30,
            max_generations: 100,
            num_islands: 2,
            stagnation_limit: 15,
            time_limit_ms: Some(10_000),
            ..Self::default()
        }
    }

    /// Preset for quality runs: large populations, generous budget.
    ///
    /// - Population: 100, Generations: 500, Islands: 4
    /// - Stagnation limit: 60, Time limit: 60s
    pub fn quality() -> Self {
        Self {
            population_size: 100,
            max_generations: 500,
            num_islands: 4,
            stagnation_limit: 60,
            time_limit_ms: Some(60_000),
            ..Self::default()
        }
    }

    /// Selects a preset from the problem size (genome slot count).
    ///
    /// - `slot_count < 100` → [`fast()`](Self::fast)
    /// - `100 ≤ slot_count < 600` → default
    /// - `slot_count ≥ 600` → [`quality()`](Self::quality)
    pub fn auto_select(slot_count: usize) -> Self {
        if slot_count < 100 {
            Self::fast()
        } else if slot_count < 600 {
            Self::default()
        } else {
            Self::quality()
        }
    }

    /// Descriptors for the externally configurable parameters.
    ///
    /// `seed` accepts -1 for "unseeded". This list is serialized for UI
    /// generation and drives both validation and clamping.
    pub fn descriptors() -> Vec<ParameterDescriptor> {
        let d = Self::default();
        vec![
            ParameterDescriptor::int("populationSize", d.population_size as i64, 10, 500),
            ParameterDescriptor::int("maxGenerations", d.max_generations as i64, 1, 5000),
            ParameterDescriptor::float("mutationRate", d.mutation_rate, 0.0, 1.0),
            ParameterDescriptor::float("crossoverRate", d.crossover_rate, 0.0, 1.0),
            ParameterDescriptor::float("eliteRate", d.elite_rate, 0.0, 0.5),
            ParameterDescriptor::int("tournamentSize", 3, 1, 10),
            ParameterDescriptor::int("stagnationLimit", d.stagnation_limit as i64, 0, 1000),
            ParameterDescriptor::int("numberOfIslands", d.num_islands as i64, 1, 8),
            ParameterDescriptor::int("migrationInterval", d.migration_interval as i64, 1, 100),
            ParameterDescriptor::int("migrationSize", d.migration_size as i64, 1, 20),
            ParameterDescriptor::bool("enableLocalSearch", d.enable_local_search),
            ParameterDescriptor::int("seed", -1, -1, i64::MAX),
        ]
    }

    /// Merges a parameter bag over the defaults.
    ///
    /// Every recognized value is clamped to its descriptor bounds;
    /// unrecognized keys are ignored.
    pub fn from_params(params: &AlgorithmParams) -> Self {
        let mut config = Self::default();
        let descriptors = Self::descriptors();
        let clamped = |name: &str| -> Option<ParamValue> {
            let descriptor = descriptors.iter().find(|d| d.name == name)?;
            params.get(name).map(|v| descriptor.clamp(v))
        };

        if let Some(ParamValue::Int(v)) = clamped("populationSize") {
            config.population_size = v as usize;
        }
        if let Some(ParamValue::Int(v)) = clamped("maxGenerations") {
            config.max_generations = v as usize;
        }
        if let Some(ParamValue::Float(v)) = clamped("mutationRate") {
            config.mutation_rate = v;
        }
        if let Some(ParamValue::Float(v)) = clamped("crossoverRate") {
            config.crossover_rate = v;
        }
        if let Some(ParamValue::Float(v)) = clamped("eliteRate") {
            config.elite_rate = v;
        }
        if let Some(ParamValue::Int(v)) = clamped("tournamentSize") {
            config.selection = Selection::Tournament(v as usize);
        }
        if let Some(ParamValue::Int(v)) = clamped("stagnationLimit") {
            config.stagnation_limit = v as usize;
        }
        if let Some(ParamValue::Int(v)) = clamped("numberOfIslands") {
            config.num_islands = v as usize;
        }
        if let Some(ParamValue::Int(v)) = clamped("migrationInterval") {
            config.migration_interval = v as usize;
        }
        if let Some(ParamValue::Int(v)) = clamped("migrationSize") {
            config.migration_size = v as usize;
        }
        if let Some(ParamValue::Bool(v)) = clamped("enableLocalSearch") {
            config.enable_local_search = v;
        }
        if let Some(ParamValue::Int(v)) = clamped("seed") {
            config.seed = if v >= 0 { Some(v as u64) } else { None };
        }
        config
    }

    /// Validates the configuration.
    ///
    /// Returns `Err` with a description if any parameter is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.population_size < 2 {
            return Err("population_size must be at least 2".into());
        }
        if self.max_generations == 0 {
            return Err("max_generations must be at least 1".into());
        }
        let elite_count = (self.population_size as f64 * self.elite_rate) as usize;
        if elite_count >= self.population_size {
            return Err("elite_rate too high: elites fill entire population".into());
        }
        if let Selection::Tournament(k) = self.selection {
            if k == 0 {
                return Err("tournament size must be at least 1".into());
            }
        }
        if self.num_islands == 0 {
            return Err("num_islands must be at least 1".into());
        }
        if self.migration_interval == 0 {
            return Err("migration_interval must be at least 1".into());
        }
        if self.migration_size >= self.population_size {
            return Err("migration_size must be smaller than population_size".into());
        }
        if self.convergence_threshold < 0.0 {
            return Err("convergence_threshold must be non-negative".into());
        }
        if self.time_limit_ms == Some(0) {
            return Err("time_limit_ms must be positive or None".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.population_size, 50);
        assert_eq!(config.max_generations, 200);
        assert_eq!(config.selection, Selection::Tournament(3));
        assert_eq!(config.num_islands, 3);
        assert_eq!(config.migration_interval, 10);
        assert_eq!(config.migration_size, 3);
        assert!(config.enable_local_search);
        assert!(config.parallel);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::default()
            .with_population_size(80)
            .with_max_generations(300)
            .with_selection(Selection::Rank)
            .with_elite_rate(0.2)
            .with_num_islands(4)
            .with_migration_interval(5)
            .with_migration_size(2)
            .with_seed(42);

        assert_eq!(config.population_size, 80);
        assert_eq!(config.max_generations, 300);
        assert_eq!(config.selection, Selection::Rank);
        assert!((config.elite_rate - 0.2).abs() < 1e-10);
        assert_eq!(config.num_islands, 4);
        assert_eq!(config.seed, Some(42));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_clamping() {
        let config = EngineConfig::default()
            .with_elite_rate(0.9)
            .with_crossover_rate(-0.5)
            .with_mutation_rate(2.0);

        assert!((config.elite_rate - 0.5).abs() < 1e-10);
        assert!((config.crossover_rate - 0.0).abs() < 1e-10);
        assert!((config.mutation_rate - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        assert!(EngineConfig::default()
            .with_population_size(1)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_max_generations(0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_selection(Selection::Tournament(0))
            .validate()
            .is_err());
        assert!(EngineConfig {
            migration_size: 50,
            ..EngineConfig::default()
        }
        .validate()
        .is_err());
        assert!(EngineConfig::default()
            .with_time_limit_ms(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_descriptors_cover_public_surface() {
        let descriptors = EngineConfig::descriptors();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name).collect();

        for expected in [
            "populationSize",
            "maxGenerations",
            "mutationRate",
            "crossoverRate",
            "eliteRate",
            "tournamentSize",
            "stagnationLimit",
            "numberOfIslands",
            "migrationInterval",
            "migrationSize",
            "enableLocalSearch",
            "seed",
        ] {
            assert!(names.contains(&expected), "missing descriptor {expected}");
        }
    }

    #[test]
    fn test_from_params_merges_and_clamps() {
        let params = AlgorithmParams::new()
            .with("populationSize", ParamValue::Int(1000))
            .with("mutationRate", ParamValue::Float(0.3))
            .with("tournamentSize", ParamValue::Int(5))
            .with("enableLocalSearch", ParamValue::Bool(false))
            .with("seed", ParamValue::Int(123))
            .with("unknownKnob", ParamValue::Int(7));
        let config = EngineConfig::from_params(&params);

        assert_eq!(config.population_size, 500, "clamped to descriptor max");
        assert!((config.mutation_rate - 0.3).abs() < 1e-10);
        assert_eq!(config.selection, Selection::Tournament(5));
        assert!(!config.enable_local_search);
        assert_eq!(config.seed, Some(123));
        assert_eq!(config.max_generations, 200, "untouched default");
    }

    #[test]
    fn test_from_params_negative_seed_is_unseeded() {
        let params = AlgorithmParams::new().with("seed", ParamValue::Int(-1));
        let config = EngineConfig::from_params(&params);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_presets_validate() {
        assert!(EngineConfig::fast().validate().is_ok());
        assert!(EngineConfig::quality().validate().is_ok());
        assert_eq!(EngineConfig::auto_select(50).population_size, 30);
        assert_eq!(EngineConfig::auto_select(300).population_size, 50);
        assert_eq!(EngineConfig::auto_select(1000).population_size, 100);
    }
}
