use super::{MoveOutcome, Mover};
use crate::core::models::conformation::Conformation;
use nalgebra::Isometry3;
use rand::Rng;
use rand::rngs::StdRng;

/// One strand pairing's jump-sampling state: the paired residues and the
/// candidate rigid transforms of the downstream partner's frame relative to
/// the upstream residue's backbone frame.
#[derive(Debug, Clone)]
pub struct PairingJump {
    pub i: usize,
    pub j: usize,
    pub fragments: Vec<Isometry3<f64>>,
}

/// Re-places strand-pairing partners by swapping in one of the pairing's
/// jump fragments. Only residues that head a jump-connected segment can be
/// moved; a pairing whose partners are both buried inside template chunks is
/// a no-op for this mover (the chunk movers own them).
pub struct PairingJumpMover {
    jumps: Vec<PairingJump>,
}

impl PairingJumpMover {
    pub fn new(jumps: Vec<PairingJump>) -> Self {
        Self { jumps }
    }

    pub fn is_empty(&self) -> bool {
        self.jumps.is_empty()
    }

    fn apply_jump(
        &self,
        conformation: &mut Conformation,
        jump: &PairingJump,
        rng: &mut StdRng,
    ) -> MoveOutcome {
        if jump.fragments.is_empty() {
            return MoveOutcome::NoOp;
        }
        // Prefer moving the downstream partner; fall back to the upstream one
        // if only it heads a segment.
        let (base, partner) = if segment_headed_by(conformation, jump.j).is_some() {
            (jump.i, jump.j)
        } else if segment_headed_by(conformation, jump.i).is_some() {
            (jump.j, jump.i)
        } else {
            return MoveOutcome::NoOp;
        };
        let segment = segment_headed_by(conformation, partner)
            .expect("partner was just checked to head a segment");

        let fragment = jump.fragments[rng.gen_range(0..jump.fragments.len())];
        let frame = conformation.triad(base).frame() * fragment;
        let (start, stop) = conformation.set_segment_frame(segment, frame);
        MoveOutcome::Moved { start, stop }
    }

    /// Applies one jump fragment at every pairing, used to place floating
    /// pairs during initialization.
    pub fn apply_at_all_positions(
        &self,
        conformation: &mut Conformation,
        rng: &mut StdRng,
    ) -> MoveOutcome {
        self.jumps
            .iter()
            .fold(MoveOutcome::NoOp, |acc, jump| {
                acc.union(self.apply_jump(conformation, jump, rng))
            })
    }
}

fn segment_headed_by(conformation: &Conformation, residue: usize) -> Option<usize> {
    conformation
        .tree()
        .segments()
        .iter()
        .position(|seg| seg.anchor == residue)
}

impl Mover for PairingJumpMover {
    fn apply(&mut self, conformation: &mut Conformation, rng: &mut StdRng) -> MoveOutcome {
        if self.jumps.is_empty() {
            return MoveOutcome::NoOp;
        }
        let jump = self.jumps[rng.gen_range(0..self.jumps.len())].clone();
        self.apply_jump(conformation, &jump, rng)
    }

    fn name(&self) -> &'static str {
        "pairing_jump"
    }
}
