//! Stochastic movers and their weighted composition.
//!
//! Every operator implements one contract: mutate the conformation (or
//! decline to) and report the residue span that moved. A cycle with no
//! eligible move is a silent no-op, never an error.

pub mod chunk;
pub mod fragment;
pub mod jump;

use crate::core::models::conformation::Conformation;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use std::cell::RefCell;
use std::rc::Rc;

/// What a mover did to the conformation this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Residues in `start..=stop` changed coordinates.
    Moved { start: usize, stop: usize },
    /// Nothing was eligible; the conformation is untouched.
    NoOp,
}

impl MoveOutcome {
    pub fn union(self, other: MoveOutcome) -> MoveOutcome {
        match (self, other) {
            (MoveOutcome::NoOp, o) | (o, MoveOutcome::NoOp) => o,
            (
                MoveOutcome::Moved { start: s1, stop: e1 },
                MoveOutcome::Moved { start: s2, stop: e2 },
            ) => MoveOutcome::Moved {
                start: s1.min(s2),
                stop: e1.max(e2),
            },
        }
    }
}

/// A stochastic conformational operator. Movers are stateful only for
/// bookkeeping (trial counters, cached eligibility); all randomness comes
/// from the explicitly threaded generator.
pub trait Mover {
    fn apply(&mut self, conformation: &mut Conformation, rng: &mut StdRng) -> MoveOutcome;

    fn name(&self) -> &'static str;
}

/// Shared movers keep one set of counters while appearing in several
/// composites.
impl<M: Mover> Mover for Rc<RefCell<M>> {
    fn apply(&mut self, conformation: &mut Conformation, rng: &mut StdRng) -> MoveOutcome {
        self.borrow_mut().apply(conformation, rng)
    }

    fn name(&self) -> &'static str {
        self.borrow().name()
    }
}

/// Draws one member per cycle with probability proportional to its weight.
/// An empty combinator is a permanent no-op.
#[derive(Default)]
pub struct WeightedRandomMover<'a> {
    movers: Vec<(Box<dyn Mover + 'a>, f64)>,
}

impl<'a> WeightedRandomMover<'a> {
    pub fn new() -> Self {
        Self { movers: Vec::new() }
    }

    pub fn add_mover(&mut self, mover: impl Mover + 'a, weight: f64) {
        if weight > 0.0 {
            self.movers.push((Box::new(mover), weight));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.movers.is_empty()
    }
}

impl<'a> Mover for WeightedRandomMover<'a> {
    fn apply(&mut self, conformation: &mut Conformation, rng: &mut StdRng) -> MoveOutcome {
        if self.movers.is_empty() {
            return MoveOutcome::NoOp;
        }
        let distribution = WeightedIndex::new(self.movers.iter().map(|(_, w)| *w))
            .expect("weights are validated positive on insertion");
        let choice = distribution.sample(rng);
        self.movers[choice].0.apply(conformation, rng)
    }

    fn name(&self) -> &'static str {
        "weighted_random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::residue::parse_sequence;
    use rand::SeedableRng;

    struct CountingMover {
        hits: Rc<RefCell<usize>>,
    }

    impl Mover for CountingMover {
        fn apply(&mut self, _conformation: &mut Conformation, _rng: &mut StdRng) -> MoveOutcome {
            *self.hits.borrow_mut() += 1;
            MoveOutcome::Moved { start: 0, stop: 0 }
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn conformation() -> Conformation {
        Conformation::extended(parse_sequence("AAAA").unwrap(), vec!['L'; 4])
    }

    #[test]
    fn union_merges_spans() {
        let a = MoveOutcome::Moved { start: 2, stop: 5 };
        let b = MoveOutcome::Moved { start: 4, stop: 9 };
        assert_eq!(a.union(b), MoveOutcome::Moved { start: 2, stop: 9 });
        assert_eq!(a.union(MoveOutcome::NoOp), a);
        assert_eq!(MoveOutcome::NoOp.union(MoveOutcome::NoOp), MoveOutcome::NoOp);
    }

    #[test]
    fn empty_combinator_is_a_silent_no_op() {
        let mut combinator = WeightedRandomMover::new();
        let mut conf = conformation();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(combinator.apply(&mut conf, &mut rng), MoveOutcome::NoOp);
    }

    #[test]
    fn zero_weight_movers_are_never_added() {
        let hits = Rc::new(RefCell::new(0));
        let mut combinator = WeightedRandomMover::new();
        combinator.add_mover(
            CountingMover { hits: hits.clone() },
            0.0,
        );
        assert!(combinator.is_empty());
    }

    #[test]
    fn draw_frequencies_follow_weights() {
        let hits_a = Rc::new(RefCell::new(0));
        let hits_b = Rc::new(RefCell::new(0));
        let mut combinator = WeightedRandomMover::new();
        combinator.add_mover(CountingMover { hits: hits_a.clone() }, 3.0);
        combinator.add_mover(CountingMover { hits: hits_b.clone() }, 1.0);

        let mut conf = conformation();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..4000 {
            combinator.apply(&mut conf, &mut rng);
        }
        let a = *hits_a.borrow() as f64;
        let b = *hits_b.borrow() as f64;
        let ratio = a / b;
        assert!((2.4..3.6).contains(&ratio), "ratio was {ratio}");
    }

    #[test]
    fn shared_movers_accumulate_counts_across_composites() {
        let hits = Rc::new(RefCell::new(0));
        let shared = Rc::new(RefCell::new(CountingMover { hits: hits.clone() }));
        let mut first = WeightedRandomMover::new();
        first.add_mover(shared.clone(), 1.0);
        let mut second = WeightedRandomMover::new();
        second.add_mover(shared, 1.0);

        let mut conf = conformation();
        let mut rng = StdRng::seed_from_u64(2);
        first.apply(&mut conf, &mut rng);
        second.apply(&mut conf, &mut rng);
        assert_eq!(*hits.borrow(), 2);
    }
}
