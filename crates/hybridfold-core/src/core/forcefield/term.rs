/// The energy terms a score function can weight. Staged functions enable
/// progressively larger subsets of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScoreTerm {
    /// Steric clash between CA atoms.
    Vdw,
    /// Hydrophobic burial environment.
    Env,
    /// Residue-residue contact preference.
    Pair,
    /// Strand-strand pairing register.
    SsPair,
    /// Helix-strand packing.
    HsPair,
    /// Lonely-strand penalty driving sheet assembly.
    Sheet,
    /// Deviation of the peptide bond across each cut.
    LinearChainbreak,
    /// Deviation of the predicted chain continuation across each cut.
    OverlapChainbreak,
    /// Flat-bottomed CA-CA distance bounds attached to the conformation.
    AtomPairConstraint,
}

impl ScoreTerm {
    pub const ALL: [ScoreTerm; 9] = [
        ScoreTerm::Vdw,
        ScoreTerm::Env,
        ScoreTerm::Pair,
        ScoreTerm::SsPair,
        ScoreTerm::HsPair,
        ScoreTerm::Sheet,
        ScoreTerm::LinearChainbreak,
        ScoreTerm::OverlapChainbreak,
        ScoreTerm::AtomPairConstraint,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScoreTerm::Vdw => "vdw",
            ScoreTerm::Env => "env",
            ScoreTerm::Pair => "pair",
            ScoreTerm::SsPair => "ss_pair",
            ScoreTerm::HsPair => "hs_pair",
            ScoreTerm::Sheet => "sheet",
            ScoreTerm::LinearChainbreak => "linear_chainbreak",
            ScoreTerm::OverlapChainbreak => "overlap_chainbreak",
            ScoreTerm::AtomPairConstraint => "atom_pair_constraint",
        }
    }
}
