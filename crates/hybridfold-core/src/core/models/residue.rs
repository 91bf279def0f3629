use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SequenceError {
    #[error("Unknown one-letter amino acid code '{0}'")]
    UnknownCode(char),
    #[error("Target sequence is empty")]
    Empty,
}

/// The twenty standard amino acids, identified by one-letter code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AminoAcid {
    Ala,
    Arg,
    Asn,
    Asp,
    Cys,
    Gln,
    Glu,
    Gly,
    His,
    Ile,
    Leu,
    Lys,
    Met,
    Phe,
    Pro,
    Ser,
    Thr,
    Trp,
    Tyr,
    Val,
}

impl AminoAcid {
    pub fn from_one_letter(code: char) -> Result<Self, SequenceError> {
        match code.to_ascii_uppercase() {
            'A' => Ok(Self::Ala),
            'R' => Ok(Self::Arg),
            'N' => Ok(Self::Asn),
            'D' => Ok(Self::Asp),
            'C' => Ok(Self::Cys),
            'Q' => Ok(Self::Gln),
            'E' => Ok(Self::Glu),
            'G' => Ok(Self::Gly),
            'H' => Ok(Self::His),
            'I' => Ok(Self::Ile),
            'L' => Ok(Self::Leu),
            'K' => Ok(Self::Lys),
            'M' => Ok(Self::Met),
            'F' => Ok(Self::Phe),
            'P' => Ok(Self::Pro),
            'S' => Ok(Self::Ser),
            'T' => Ok(Self::Thr),
            'W' => Ok(Self::Trp),
            'Y' => Ok(Self::Tyr),
            'V' => Ok(Self::Val),
            other => Err(SequenceError::UnknownCode(other)),
        }
    }

    pub fn one_letter(&self) -> char {
        match self {
            Self::Ala => 'A',
            Self::Arg => 'R',
            Self::Asn => 'N',
            Self::Asp => 'D',
            Self::Cys => 'C',
            Self::Gln => 'Q',
            Self::Glu => 'E',
            Self::Gly => 'G',
            Self::His => 'H',
            Self::Ile => 'I',
            Self::Leu => 'L',
            Self::Lys => 'K',
            Self::Met => 'M',
            Self::Phe => 'F',
            Self::Pro => 'P',
            Self::Ser => 'S',
            Self::Thr => 'T',
            Self::Trp => 'W',
            Self::Tyr => 'Y',
            Self::Val => 'V',
        }
    }

    /// Kyte-Doolittle hydropathy, used by the burial and contact terms.
    pub fn hydropathy(&self) -> f64 {
        match self {
            Self::Ile => 4.5,
            Self::Val => 4.2,
            Self::Leu => 3.8,
            Self::Phe => 2.8,
            Self::Cys => 2.5,
            Self::Met => 1.9,
            Self::Ala => 1.8,
            Self::Gly => -0.4,
            Self::Thr => -0.7,
            Self::Ser => -0.8,
            Self::Trp => -0.9,
            Self::Tyr => -1.3,
            Self::Pro => -1.6,
            Self::His => -3.2,
            Self::Glu => -3.5,
            Self::Gln => -3.5,
            Self::Asp => -3.5,
            Self::Asn => -3.5,
            Self::Lys => -3.9,
            Self::Arg => -4.5,
        }
    }
}

pub fn parse_sequence(sequence: &str) -> Result<Vec<AminoAcid>, SequenceError> {
    if sequence.is_empty() {
        return Err(SequenceError::Empty);
    }
    sequence.chars().map(AminoAcid::from_one_letter).collect()
}

/// Backbone dihedral angles of one residue, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Torsions {
    pub phi: f64,
    pub psi: f64,
    pub omega: f64,
}

impl Torsions {
    pub fn new(phi: f64, psi: f64, omega: f64) -> Self {
        Self { phi, psi, omega }
    }

    /// Extended-chain starting values.
    pub fn extended() -> Self {
        Self::new(-150.0, 150.0, 180.0)
    }

    /// Ideal beta-strand values, used for synthesized pairing templates.
    pub fn ideal_strand() -> Self {
        Self::new(-120.0, 120.0, 180.0)
    }

    /// Summed angular distance to another torsion set, in degrees.
    pub fn distance(&self, other: &Self) -> f64 {
        angle_difference(self.phi, other.phi).abs()
            + angle_difference(self.psi, other.psi).abs()
            + angle_difference(self.omega, other.omega).abs()
    }
}

/// Signed difference between two angles in degrees, wrapped to (-180, 180].
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let mut d = (a - b) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}
