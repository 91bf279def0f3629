use crate::core::forcefield::scoring::ScoreFunction;
use crate::core::forcefield::stages::{
    StagedScoreFunctions, stage2_chainbreak_weight, stage3_chainbreak_weights,
    stage4_chainbreak_weight, stage4_overlap_weight,
};
use crate::core::forcefield::term::ScoreTerm;
use crate::core::fragments::FragmentLibrary;
use crate::core::kinematics::builder::{TreeBuild, build_tree};
use crate::core::models::conformation::{Conformation, DistanceBound};
use crate::core::models::residue::parse_sequence;
use crate::core::templates::TemplateSet;
use crate::core::utils::geometry::superimposed_rmsd;
use crate::engine::config::{HybridizeConfig, ResidueFlags};
use crate::engine::convergence::{ConvergenceChecker, TouchTracker};
use crate::engine::error::EngineError;
use crate::engine::monte_carlo::MonteCarlo;
use crate::engine::movers::chunk::{ChunkChoice, ChunkInsertionMover, TemplateChoice};
use crate::engine::movers::fragment::{FragmentSelection, FragmentTrialMover};
use crate::engine::movers::jump::PairingJumpMover;
use crate::engine::movers::{MoveOutcome, Mover, WeightedRandomMover};
use crate::engine::pairing::{PairingSetup, StrandPairing, add_strand_pairings, superimpose_pairings};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::weights::{base_fragment_weights, weights_for};
use nalgebra::Point3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
use tracing::{debug, info, warn};

const STAGE3_MACRO_ITERATIONS: usize = 10;
const STAGE4_MACRO_ITERATIONS: usize = 3;
const GAP_CONSTRAINT_STDEV: f64 = 1.0;

/// Everything the search consumes. All inputs are read-only; the run clones
/// what it needs to mutate.
pub struct HybridizeInput {
    /// Target amino-acid sequence, one-letter codes.
    pub sequence: String,
    pub templates: TemplateSet,
    pub fragments_big: FragmentLibrary,
    pub fragments_small: FragmentLibrary,
    /// Per-residue sampling permissions; `None` enables everything.
    pub flags: Option<ResidueFlags>,
    /// Candidate strand pairings; empty disables jump sampling.
    pub pairings: Vec<StrandPairing>,
    /// Secondary structure (H/E/L); derived from the small fragments when
    /// absent.
    pub secstruct: Option<String>,
    /// Reference CA coordinates used only for post-hoc similarity
    /// diagnostics, never as part of the sampled objective.
    pub reference: Option<Vec<Point3<f64>>>,
}

#[derive(Debug, Clone)]
pub struct HybridizeResult {
    /// The best conformation found, with its original kinematic tree
    /// restored and auxiliary constraints discarded.
    pub conformation: Conformation,
    /// Named scalar diagnostics for external reporting.
    pub diagnostics: BTreeMap<String, f64>,
}

/// Runs the four-stage hybridization search: tree construction, initial
/// chunk placement, then annealing with staged score functions, and finally
/// best-conformation recovery and tree restoration.
pub fn run(
    input: &HybridizeInput,
    config: &HybridizeConfig,
    reporter: &ProgressReporter,
) -> Result<HybridizeResult, EngineError> {
    // === Setup: inputs, secondary structure, pairing sample, tree ===
    let sequence = parse_sequence(&input.sequence)?;
    let nres = sequence.len();
    let flags = match &input.flags {
        Some(flags) => flags.clone(),
        None => ResidueFlags::all_enabled(nres),
    };
    validate_lengths(nres, &flags, input.reference.as_deref())?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let secstruct: Vec<char> = match &input.secstruct {
        Some(ss) => {
            if ss.len() != nres {
                return Err(EngineError::InputMismatch {
                    what: "secstruct",
                    expected: nres,
                    found: ss.len(),
                });
            }
            ss.chars().collect()
        }
        None => {
            let derived = input
                .fragments_small
                .derived_secstruct(nres, config.top_n_big_frag);
            info!(secstruct = %derived, "Secondary structure from fragments");
            derived.chars().collect()
        }
    };

    let fragments_1mer = input.fragments_small.chop_to_1mers();
    let mut conformation = Conformation::extended(sequence, secstruct.clone());
    let original_tree = conformation.tree().clone();
    let mut templates = input.templates.clone();

    let mut pairing_setup = add_strand_pairings(
        &mut templates,
        nres,
        &input.pairings,
        &secstruct,
        config.sheets,
        config.filter_templates,
        &mut rng,
    )?;

    let pairing_anchors: Vec<usize> = pairing_setup
        .as_ref()
        .map(|s| s.anchors.clone())
        .unwrap_or_default();
    let build = build_tree(
        nres,
        &templates,
        &pairing_anchors,
        config.add_non_init_chunks,
        config.domain_assembly,
        &mut rng,
    )?;
    conformation.set_tree(build.tree.clone());

    if let Some(setup) = pairing_setup.as_mut() {
        superimpose_pairings(&mut templates, setup, &mut rng);
    }

    let base = ScoreFunction::default_base();
    if base.weight(ScoreTerm::AtomPairConstraint) != 0.0 {
        add_gap_constraints(&mut conformation, &build);
    }
    let staged = StagedScoreFunctions::from_base(&base);

    // === Initial placement from the templates ===
    let jump_mover = pairing_setup
        .as_ref()
        .map(|setup| PairingJumpMover::new(setup.jumps.clone()));
    initialize_from_templates(
        &mut conformation,
        &templates,
        &flags,
        pairing_setup.as_ref(),
        jump_mover.as_ref(),
        &mut rng,
    );

    // === Residue weights and movers ===
    let base_weights = base_fragment_weights(
        nres,
        &templates,
        &flags,
        config.frag_weight_aligned,
        config.domain_assembly,
    );
    let pairing_residues: HashSet<usize> = pairing_anchors.iter().copied().collect();
    let jump_anchors: Vec<usize> = conformation
        .tree()
        .anchors()
        .into_iter()
        .filter(|a| !pairing_residues.contains(a))
        .collect();
    let big_window = input.fragments_big.window_len();
    let small_window = input.fragments_small.window_len();
    let weights_big = weights_for(big_window, None, &jump_anchors, &base_weights);
    let weights_small = weights_for(small_window, Some(big_window), &jump_anchors, &base_weights);
    let weights_1mer = weights_for(1, Some(small_window), &jump_anchors, &base_weights);

    let frag_1mer_mover = FragmentTrialMover::new(
        &fragments_1mer,
        &weights_1mer,
        conformation.tree(),
        FragmentSelection::TopN(config.top_n_big_frag),
    );
    let small_gaps_mover = FragmentTrialMover::new(
        &input.fragments_small,
        &weights_small,
        conformation.tree(),
        FragmentSelection::TopN(config.top_n_big_frag),
    );
    let big_frag_mover = FragmentTrialMover::new(
        &input.fragments_big,
        &weights_big,
        conformation.tree(),
        FragmentSelection::TopN(config.top_n_big_frag),
    );
    let small_full_mover = FragmentTrialMover::new(
        &input.fragments_small,
        &weights_big,
        conformation.tree(),
        FragmentSelection::TopN(0),
    );
    let small_smooth_mover = FragmentTrialMover::new(
        &input.fragments_small,
        &weights_big,
        conformation.tree(),
        FragmentSelection::Smooth { top_n: 0 },
    );

    let (weight_1mer, weight_small, weight_big) = insertion_weights(
        config,
        &templates,
        &frag_1mer_mover,
        &small_gaps_mover,
        &big_frag_mover,
    );
    let total_frag_weight = weight_1mer + weight_small + weight_big;
    let do_frag_inserts =
        total_frag_weight > 0.0 && weights_big.iter().sum::<f64>() > 1e-6;

    let mut random_chunk_mover = ChunkInsertionMover::new(
        &templates,
        &flags,
        nres,
        TemplateChoice::WeightedRandom,
        ChunkChoice::Random,
    );
    if let Some(setup) = pairing_setup.as_ref() {
        random_chunk_mover
            .set_templates_to_ignore(setup.template_indices.iter().copied().collect());
    }
    let chunk_mover = Rc::new(RefCell::new(random_chunk_mover));
    let jump_mover = jump_mover.map(|m| Rc::new(RefCell::new(m)));

    let frag_1mer_mover = Rc::new(RefCell::new(frag_1mer_mover));
    let small_gaps_mover = Rc::new(RefCell::new(small_gaps_mover));
    let big_frag_mover = Rc::new(RefCell::new(big_frag_mover));
    let small_full_mover = Rc::new(RefCell::new(small_full_mover));
    let small_smooth_mover = Rc::new(RefCell::new(small_smooth_mover));

    let jump_fraction = if jump_mover.is_some() {
        config.jump_move_fraction
    } else {
        0.0
    };

    // Stages 1-3: chunks + big + small-in-gaps + 1mer (+ pairing jumps).
    let mut full_frag_mover = WeightedRandomMover::new();
    // Stage 4: chunks + small + 1mer, plain and smooth variants.
    let mut small_frag_mover = WeightedRandomMover::new();
    let mut small_frag_smooth_mover = WeightedRandomMover::new();
    if total_frag_weight < 1.0 {
        let chunk_weight = 1.0 - total_frag_weight;
        full_frag_mover.add_mover(chunk_mover.clone(), chunk_weight);
        small_frag_mover.add_mover(chunk_mover.clone(), chunk_weight);
        small_frag_smooth_mover.add_mover(chunk_mover.clone(), chunk_weight);
    }
    if do_frag_inserts {
        add_with_jump(
            &mut full_frag_mover,
            frag_1mer_mover.clone(),
            weight_1mer,
            jump_mover.as_ref(),
            jump_fraction,
        );
        add_with_jump(
            &mut full_frag_mover,
            small_gaps_mover,
            weight_small,
            jump_mover.as_ref(),
            jump_fraction,
        );
        add_with_jump(
            &mut full_frag_mover,
            big_frag_mover,
            weight_big,
            jump_mover.as_ref(),
            jump_fraction,
        );

        add_with_jump(
            &mut small_frag_mover,
            small_full_mover,
            weight_small + weight_big,
            jump_mover.as_ref(),
            jump_fraction,
        );
        add_with_jump(
            &mut small_frag_mover,
            frag_1mer_mover.clone(),
            weight_1mer,
            jump_mover.as_ref(),
            jump_fraction,
        );

        add_with_jump(
            &mut small_frag_smooth_mover,
            small_smooth_mover,
            weight_small + weight_big,
            jump_mover.as_ref(),
            jump_fraction,
        );
        add_with_jump(
            &mut small_frag_smooth_mover,
            frag_1mer_mover,
            weight_1mer,
            jump_mover.as_ref(),
            jump_fraction,
        );
    }

    let mut diagnostics = BTreeMap::new();
    diagnostics.insert(
        "template_weight_sum".to_string(),
        templates.weights().iter().sum(),
    );
    if let Some(setup) = pairing_setup.as_ref() {
        diagnostics.insert("floating_pairs".to_string(), setup.floating.len() as f64);
    }

    let temperature = config.temperature;
    let k = config.increase_chainbreak;
    let cycles = |n: usize| (n as f64 * config.increase_cycles) as usize;

    // === Stage 1: replace extended-chain geometry under the clash score ===
    let stage1_max = cycles(config.stage1_cycles);
    reporter.report(Progress::StageStart {
        name: "Stage 1",
        max_cycles: stage1_max,
    });
    info!(max_cycles = stage1_max, "Stage 1: folding with the clash-only score");
    {
        let eligible = touch_eligibility(nres, &weights_big, &weights_small, &weights_1mer, &build, &flags);
        let mut done = TouchTracker::new(eligible);
        let mut mc = MonteCarlo::new(&conformation, staged.stage0.clone(), temperature);
        let mut converged = false;
        let mut cycles_used = stage1_max;
        for cycle in 1..=stage1_max {
            let outcome = full_frag_mover.apply(&mut conformation, &mut rng);
            let accepted = mc.boltzmann(&mut conformation, &mut rng);
            if accepted {
                if let MoveOutcome::Moved { start, stop } = outcome {
                    done.mark_span(start, stop);
                }
            }
            if done.is_complete() {
                info!(cycle, "Stage 1: replaced extended chains");
                cycles_used = cycle;
                converged = true;
                break;
            }
        }
        if !converged {
            warn!(
                untouched = ?done.untouched(),
                "Stage 1: extended chain may still remain after the cycle budget"
            );
        }
        mc.log_counters("stage1");
        mc.recover_low(&mut conformation);
        diagnostics.insert("stage1_cycles_used".to_string(), cycles_used as f64);
        diagnostics.insert("stage1_acceptance_rate".to_string(), mc.acceptance_rate());
    }
    record_similarity(&mut diagnostics, "rms_after_stage1", &conformation, input);
    reporter.report(Progress::StageFinish);

    // === Stage 2: one pass with the low-detail score and autotemperature ===
    let stage2_max = cycles(config.stage2_cycles);
    reporter.report(Progress::StageStart {
        name: "Stage 2",
        max_cycles: stage2_max,
    });
    info!(max_cycles = stage2_max, "Stage 2: folding with the stage-1 score");
    {
        let mut function = staged.stage1.clone();
        let setting = stage2_chainbreak_weight(k);
        debug!(linear_chainbreak = setting, "Stage 2 chain-break weight");
        function.set_weight(ScoreTerm::LinearChainbreak, setting);
        let mut mc = MonteCarlo::new(&conformation, function, temperature);
        mc.set_autotemp(true);
        for _ in 0..stage2_max {
            full_frag_mover.apply(&mut conformation, &mut rng);
            mc.boltzmann(&mut conformation, &mut rng);
        }
        mc.log_counters("stage2");
        mc.recover_low(&mut conformation);
        diagnostics.insert("stage2_acceptance_rate".to_string(), mc.acceptance_rate());
    }
    record_similarity(&mut diagnostics, "rms_after_stage2", &conformation, input);
    reporter.report(Progress::StageFinish);

    // === Stage 3: ten macro-iterations alternating the two mid scores ===
    let stage3_max = cycles(config.stage3_cycles);
    reporter.report(Progress::StageStart {
        name: "Stage 3",
        max_cycles: stage3_max,
    });
    info!(max_cycles = stage3_max, "Stage 3: alternating mid-detail scores");
    {
        let mut checker = (!config.skip_convergence_check).then(|| {
            ConvergenceChecker::new(
                nonzero_positions(&weights_big),
                nonzero_positions(&weights_small),
            )
        });
        for nmacro in 1..=STAGE3_MACRO_ITERATIONS {
            reporter.report(Progress::MacroIteration {
                current: nmacro,
                total: STAGE3_MACRO_ITERATIONS,
            });
            let progress = nmacro as f64 / STAGE3_MACRO_ITERATIONS as f64;
            let (weight_a, weight_b) = stage3_chainbreak_weights(progress, k);
            let use_primary = nmacro % 2 == 1 || nmacro > STAGE3_MACRO_ITERATIONS - 4;
            let function = if use_primary {
                let mut f = staged.stage2.clone();
                f.set_weight(ScoreTerm::LinearChainbreak, weight_a);
                f
            } else {
                let mut f = staged.stage2b.clone();
                f.set_weight(ScoreTerm::LinearChainbreak, weight_b);
                f
            };
            debug!(
                nmacro,
                primary = use_primary,
                linear_chainbreak = function.weight(ScoreTerm::LinearChainbreak),
                "Stage 3 macro-iteration"
            );
            let mut mc = MonteCarlo::new(&conformation, function, temperature);
            mc.set_autotemp(true);
            for _ in 0..stage3_max {
                full_frag_mover.apply(&mut conformation, &mut rng);
                mc.boltzmann(&mut conformation, &mut rng);
                if let Some(checker) = checker.as_mut() {
                    if !checker.keep_going(&conformation, mc.num_accepts()) {
                        break;
                    }
                }
            }
            mc.log_counters("stage3");
            mc.recover_low(&mut conformation);
            diagnostics.insert("stage3_acceptance_rate".to_string(), mc.acceptance_rate());
        }
    }
    record_similarity(&mut diagnostics, "rms_after_stage3", &conformation, input);
    reporter.report(Progress::StageFinish);

    // === Stage 4: final score with ramped chain-break weights ===
    let stage4_max = cycles(config.stage4_cycles);
    reporter.report(Progress::StageStart {
        name: "Stage 4",
        max_cycles: stage4_max,
    });
    info!(max_cycles = stage4_max, "Stage 4: folding with the final score");
    {
        for nmacro in 1..=STAGE4_MACRO_ITERATIONS {
            reporter.report(Progress::MacroIteration {
                current: nmacro,
                total: STAGE4_MACRO_ITERATIONS,
            });
            let progress = nmacro as f64 / STAGE4_MACRO_ITERATIONS as f64;
            let mut function = staged.final_stage.clone();
            let setting = stage4_chainbreak_weight(progress, k);
            debug!(nmacro, linear_chainbreak = setting, "Stage 4 macro-iteration");
            function.set_weight(ScoreTerm::LinearChainbreak, setting);
            if config.overlap_chainbreaks {
                function.set_weight(ScoreTerm::OverlapChainbreak, stage4_overlap_weight(progress));
            }
            let mut mc = MonteCarlo::new(&conformation, function, temperature);
            mc.set_autotemp(true);
            let mover = if nmacro == 1 {
                info!(nmacro, "Stage 4: small-fragment trials");
                &mut small_frag_mover
            } else {
                info!(nmacro, "Stage 4: smooth small-fragment trials");
                &mut small_frag_smooth_mover
            };
            for _ in 0..stage4_max {
                mover.apply(&mut conformation, &mut rng);
                mc.boltzmann(&mut conformation, &mut rng);
            }
            mc.log_counters("stage4");
            mc.recover_low(&mut conformation);
            diagnostics.insert("stage4_acceptance_rate".to_string(), mc.acceptance_rate());
        }
    }
    record_similarity(&mut diagnostics, "rms_after_stage4", &conformation, input);
    reporter.report(Progress::StageFinish);

    // === Terminal: discard constraints, restore the original tree ===
    conformation.clear_constraints();
    conformation.set_tree(original_tree);
    diagnostics.insert(
        "final_score".to_string(),
        staged.final_stage.score(&conformation),
    );
    for (residue, count) in chunk_mover.borrow().trial_counts().iter().enumerate() {
        debug!(residue, count, "Chunk trial counter");
    }

    Ok(HybridizeResult {
        conformation,
        diagnostics,
    })
}

/// Adds a fragment mover to a composite, ceding the configured fraction of
/// its weight to the pairing jump mover when pairings exist.
fn add_with_jump<'a>(
    composite: &mut WeightedRandomMover<'a>,
    mover: Rc<RefCell<FragmentTrialMover<'a>>>,
    weight: f64,
    jump_mover: Option<&Rc<RefCell<PairingJumpMover>>>,
    jump_fraction: f64,
) {
    if weight <= 0.0 {
        return;
    }
    composite.add_mover(mover, weight * (1.0 - jump_fraction));
    if let Some(jump) = jump_mover {
        composite.add_mover(jump.clone(), weight * jump_fraction);
    }
}

fn validate_lengths(
    nres: usize,
    flags: &ResidueFlags,
    reference: Option<&[Point3<f64>]>,
) -> Result<(), EngineError> {
    for (what, len) in [
        ("sample_by_template", flags.sample_by_template.len()),
        ("sample_by_fragment", flags.sample_by_fragment.len()),
        ("max_registry_shift", flags.max_registry_shift.len()),
    ] {
        if len != nres {
            return Err(EngineError::InputMismatch {
                what,
                expected: nres,
                found: len,
            });
        }
    }
    if let Some(reference) = reference {
        if reference.len() != nres {
            return Err(EngineError::InputMismatch {
                what: "reference",
                expected: nres,
                found: reference.len(),
            });
        }
    }
    Ok(())
}

/// CA-CA upper distance bound for a sequence gap of the given length,
/// saturating beyond eight residues.
fn gap_distance(gap: usize) -> f64 {
    const TABLE: [f64; 9] = [4.0, 7.5, 11.0, 14.5, 18.0, 21.0, 24.5, 27.5, 31.0];
    TABLE.get(gap).copied().unwrap_or(9999.0)
}

/// Adds a bounded CA-CA constraint across every short inter-chunk gap so the
/// segments cannot drift apart faster than the chain could physically span.
fn add_gap_constraints(conformation: &mut Conformation, build: &TreeBuild) {
    for window in build.chunks.windows(2) {
        let gap_start = window[0].stop;
        let gap_stop = window[1].start;
        let gap_size = gap_stop - gap_start - 1;
        if gap_size > 8 {
            continue;
        }
        debug!(gap_start, gap_stop, "Adding gap constraint");
        conformation.add_constraint(DistanceBound {
            i: gap_start,
            j: gap_stop,
            upper: gap_distance(gap_size),
            stdev: GAP_CONSTRAINT_STDEV,
        });
    }
}

/// Places the initial template's chunks, applies one jump fragment per
/// pairing, then inserts each non-floating pairing template chunk.
fn initialize_from_templates(
    conformation: &mut Conformation,
    templates: &TemplateSet,
    flags: &ResidueFlags,
    pairing_setup: Option<&PairingSetup>,
    jump_mover: Option<&PairingJumpMover>,
    rng: &mut StdRng,
) {
    let nres = conformation.len();
    let mut initial_mover = ChunkInsertionMover::new(
        templates,
        flags,
        nres,
        TemplateChoice::Fixed(templates.initial_index()),
        ChunkChoice::All,
    );
    initial_mover.apply(conformation, rng);

    let Some(setup) = pairing_setup else {
        return;
    };
    if let Some(jump_mover) = jump_mover {
        jump_mover.apply_at_all_positions(conformation, rng);
    }
    for &index in &setup.template_indices {
        if setup.floating.contains(&index) {
            continue;
        }
        let mut pairing_mover = ChunkInsertionMover::new(
            templates,
            flags,
            nres,
            TemplateChoice::Fixed(index),
            ChunkChoice::All,
        );
        pairing_mover.apply(conformation, rng);
    }
}

/// The three fragment insertion weights, optionally recomputed from the
/// movers' position coverage.
fn insertion_weights(
    config: &HybridizeConfig,
    templates: &TemplateSet,
    frag_1mer_mover: &FragmentTrialMover,
    small_gaps_mover: &FragmentTrialMover,
    big_frag_mover: &FragmentTrialMover,
) -> (f64, f64, f64) {
    if !config.auto_frag_insertion_weight {
        return (
            config.frag_1mer_insertion_weight,
            config.small_frag_insertion_weight,
            config.big_frag_insertion_weight,
        );
    }

    let fallback = |n: usize, default: usize| if n == 0 { default } else { n };
    let one_mer_frags = fallback(frag_1mer_mover.nr_frags(), config.top_n_small_frag);
    let small_frags = fallback(small_gaps_mover.nr_frags(), config.top_n_small_frag);
    let big_frags = fallback(big_frag_mover.nr_frags(), config.top_n_big_frag);

    let template_coverage: f64 = templates
        .iter()
        .enumerate()
        .filter(|(i, _)| !templates.is_pairing(*i))
        .map(|(_, t)| t.chunks().len() as f64)
        .sum::<f64>()
        * config.chunk_insertion_weight;
    let one_mer_coverage = (frag_1mer_mover.total_frames() * one_mer_frags) as f64;
    let small_coverage = (small_gaps_mover.total_frames() * small_frags) as f64;
    let big_coverage = (big_frag_mover.total_frames() * big_frags) as f64;

    let sum = one_mer_coverage + small_coverage + big_coverage + template_coverage;
    if sum <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let weights = (
        one_mer_coverage / sum,
        small_coverage / sum,
        big_coverage / sum,
    );
    info!(
        one_mer = weights.0,
        small = weights.1,
        big = weights.2,
        "Automatic fragment insertion weights"
    );
    weights
}

/// Residues whose starting geometry stage 1 must replace: everything a
/// fragment mover can touch plus everything a chunk insertion can overwrite.
fn touch_eligibility(
    nres: usize,
    weights_big: &[f64],
    weights_small: &[f64],
    weights_1mer: &[f64],
    build: &TreeBuild,
    flags: &ResidueFlags,
) -> Vec<bool> {
    let mut eligible = vec![false; nres];
    for (i, slot) in eligible.iter_mut().enumerate() {
        let by_fragment =
            weights_big[i] > 0.0 || weights_small[i] > 0.0 || weights_1mer[i] > 0.0;
        let by_chunk =
            flags.sample_by_template[i] && build.chunks.iter().any(|c| c.contains(i));
        *slot = by_fragment || by_chunk;
    }
    eligible
}

fn nonzero_positions(weights: &[f64]) -> Vec<usize> {
    weights
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w > 0.0)
        .map(|(i, _)| i)
        .collect()
}

fn record_similarity(
    diagnostics: &mut BTreeMap<String, f64>,
    name: &str,
    conformation: &Conformation,
    input: &HybridizeInput,
) {
    if let Some(reference) = input.reference.as_ref() {
        let rms = superimposed_rmsd(&conformation.ca_positions(), reference);
        info!(name, rms, "Similarity to reference");
        diagnostics.insert(name.to_string(), rms);
    }
}
