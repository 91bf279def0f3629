use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Insertion weight '{name}' must lie in [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },
    #[error("Fragment insertion weights sum to {sum}; the total must not exceed 1")]
    WeightSumExceedsOne { sum: f64 },
    #[error("Parameter '{0}' must be positive")]
    NonPositive(&'static str),
}

/// Per-residue sampling permissions supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueFlags {
    /// Residues whose geometry template chunk insertions may overwrite.
    pub sample_by_template: Vec<bool>,
    /// Residues whose torsions fragment insertions may overwrite.
    pub sample_by_fragment: Vec<bool>,
    /// Bound on the per-residue registry-shift jitter for chunk copies.
    pub max_registry_shift: Vec<usize>,
}

impl ResidueFlags {
    pub fn all_enabled(nres: usize) -> Self {
        Self {
            sample_by_template: vec![true; nres],
            sample_by_fragment: vec![true; nres],
            max_registry_shift: vec![0; nres],
        }
    }
}

/// How many sheets the strand-pairing sampler should assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SheetCount {
    /// Exactly this many pairings are drawn.
    Exact(usize),
    /// A uniform random number of pairings in `1..=max` is drawn.
    Random(usize),
}

impl Default for SheetCount {
    fn default() -> Self {
        SheetCount::Exact(1)
    }
}

/// All tunables of the staged hybridization search. Construct through
/// [`HybridizeConfigBuilder`]; every field has a sensible default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridizeConfig {
    /// Multiplier applied to all four stage cycle budgets.
    pub increase_cycles: f64,
    pub stage1_cycles: usize,
    pub stage2_cycles: usize,
    pub stage3_cycles: usize,
    pub stage4_cycles: usize,
    /// Admit uncovered chunks of non-initial templates probabilistically.
    pub add_non_init_chunks: bool,
    /// Force-admit chunks of every template and widen fragment sampling.
    pub domain_assembly: bool,
    /// Fragment weight at template-covered positions (uncovered get 1).
    pub frag_weight_aligned: f64,
    pub frag_1mer_insertion_weight: f64,
    pub small_frag_insertion_weight: f64,
    pub big_frag_insertion_weight: f64,
    /// Per-chunk weighting used by the automatic insertion-weight heuristic.
    pub chunk_insertion_weight: f64,
    /// Recompute the three fragment insertion weights from coverage counts.
    pub auto_frag_insertion_weight: bool,
    pub top_n_big_frag: usize,
    pub top_n_small_frag: usize,
    /// Fraction of each fragment class's weight ceded to strand-pairing jump
    /// moves when pairings are present.
    pub jump_move_fraction: f64,
    /// Global chain-break weight increase factor (`k` in the ramp formulas).
    pub increase_chainbreak: f64,
    /// Ramp the overlap chain-break term during the final stage.
    pub overlap_chainbreaks: bool,
    pub temperature: f64,
    pub skip_convergence_check: bool,
    pub sheets: SheetCount,
    pub filter_templates: bool,
    /// Seed for the single pseudo-random stream driving the whole run.
    /// `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for HybridizeConfig {
    fn default() -> Self {
        Self {
            increase_cycles: 1.0,
            stage1_cycles: 2000,
            stage2_cycles: 2000,
            stage3_cycles: 2000,
            stage4_cycles: 400,
            add_non_init_chunks: false,
            domain_assembly: false,
            frag_weight_aligned: 0.0,
            frag_1mer_insertion_weight: 0.0,
            small_frag_insertion_weight: 0.0,
            big_frag_insertion_weight: 0.5,
            chunk_insertion_weight: 5.0,
            auto_frag_insertion_weight: false,
            top_n_big_frag: 25,
            top_n_small_frag: 200,
            jump_move_fraction: 1.0 / 11.0,
            increase_chainbreak: 1.0,
            overlap_chainbreaks: true,
            temperature: 2.0,
            skip_convergence_check: false,
            sheets: SheetCount::default(),
            filter_templates: false,
            seed: None,
        }
    }
}

#[derive(Default)]
pub struct HybridizeConfigBuilder {
    config: Option<HybridizeConfig>,
}

impl HybridizeConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Some(HybridizeConfig::default()),
        }
    }

    fn with(mut self, f: impl FnOnce(&mut HybridizeConfig)) -> Self {
        f(self.config.get_or_insert_with(HybridizeConfig::default));
        self
    }

    pub fn increase_cycles(self, factor: f64) -> Self {
        self.with(|c| c.increase_cycles = factor)
    }
    pub fn stage_cycles(self, s1: usize, s2: usize, s3: usize, s4: usize) -> Self {
        self.with(|c| {
            c.stage1_cycles = s1;
            c.stage2_cycles = s2;
            c.stage3_cycles = s3;
            c.stage4_cycles = s4;
        })
    }
    pub fn add_non_init_chunks(self, enabled: bool) -> Self {
        self.with(|c| c.add_non_init_chunks = enabled)
    }
    pub fn domain_assembly(self, enabled: bool) -> Self {
        self.with(|c| c.domain_assembly = enabled)
    }
    pub fn frag_weight_aligned(self, weight: f64) -> Self {
        self.with(|c| c.frag_weight_aligned = weight)
    }
    pub fn insertion_weights(self, one_mer: f64, small: f64, big: f64) -> Self {
        self.with(|c| {
            c.frag_1mer_insertion_weight = one_mer;
            c.small_frag_insertion_weight = small;
            c.big_frag_insertion_weight = big;
        })
    }
    pub fn auto_frag_insertion_weight(self, enabled: bool) -> Self {
        self.with(|c| c.auto_frag_insertion_weight = enabled)
    }
    pub fn top_n_frags(self, big: usize, small: usize) -> Self {
        self.with(|c| {
            c.top_n_big_frag = big;
            c.top_n_small_frag = small;
        })
    }
    pub fn increase_chainbreak(self, factor: f64) -> Self {
        self.with(|c| c.increase_chainbreak = factor)
    }
    pub fn overlap_chainbreaks(self, enabled: bool) -> Self {
        self.with(|c| c.overlap_chainbreaks = enabled)
    }
    pub fn temperature(self, temperature: f64) -> Self {
        self.with(|c| c.temperature = temperature)
    }
    pub fn skip_convergence_check(self, skip: bool) -> Self {
        self.with(|c| c.skip_convergence_check = skip)
    }
    pub fn sheets(self, sheets: SheetCount) -> Self {
        self.with(|c| c.sheets = sheets)
    }
    pub fn filter_templates(self, enabled: bool) -> Self {
        self.with(|c| c.filter_templates = enabled)
    }
    pub fn seed(self, seed: u64) -> Self {
        self.with(|c| c.seed = Some(seed))
    }

    pub fn build(self) -> Result<HybridizeConfig, ConfigError> {
        let config = self.config.unwrap_or_default();
        for (name, value) in [
            ("frag_1mer_insertion_weight", config.frag_1mer_insertion_weight),
            ("small_frag_insertion_weight", config.small_frag_insertion_weight),
            ("big_frag_insertion_weight", config.big_frag_insertion_weight),
            ("jump_move_fraction", config.jump_move_fraction),
            ("frag_weight_aligned", config.frag_weight_aligned),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::WeightOutOfRange { name, value });
            }
        }
        let sum = config.frag_1mer_insertion_weight
            + config.small_frag_insertion_weight
            + config.big_frag_insertion_weight;
        if sum > 1.0 + 1e-12 {
            return Err(ConfigError::WeightSumExceedsOne { sum });
        }
        for (name, value) in [
            ("increase_cycles", config.increase_cycles),
            ("temperature", config.temperature),
            ("increase_chainbreak", config.increase_chainbreak),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive(name));
            }
        }
        Ok(config)
    }
}
