use crate::core::models::residue::Torsions;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum FragmentError {
    #[error("Fragment library window length must be nonzero")]
    ZeroWindow,
    #[error("Fragment at frame {frame_start} has {found} torsion triples, expected {expected}")]
    WindowMismatch {
        frame_start: usize,
        expected: usize,
        found: usize,
    },
}

/// One candidate torsion set for a window: a torsion triple per window
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub torsions: Vec<Torsions>,
}

impl Fragment {
    pub fn new(torsions: Vec<Torsions>) -> Self {
        Self { torsions }
    }
}

/// All ranked candidates for one window start position.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub start: usize,
    pub fragments: Vec<Fragment>,
}

/// An immutable per-window fragment collection with a constant window length.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentLibrary {
    window_len: usize,
    frames: Vec<Frame>,
}

impl FragmentLibrary {
    pub fn new(window_len: usize, mut frames: Vec<Frame>) -> Result<Self, FragmentError> {
        if window_len == 0 {
            return Err(FragmentError::ZeroWindow);
        }
        for frame in &frames {
            for fragment in &frame.fragments {
                if fragment.torsions.len() != window_len {
                    return Err(FragmentError::WindowMismatch {
                        frame_start: frame.start,
                        expected: window_len,
                        found: fragment.torsions.len(),
                    });
                }
            }
        }
        frames.sort_by_key(|f| f.start);
        Ok(Self { window_len, frames })
    }

    pub fn empty(window_len: usize) -> Self {
        Self {
            window_len: window_len.max(1),
            frames: Vec::new(),
        }
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Average candidate count per frame, rounded down. Zero for an empty
    /// library.
    pub fn mean_fragments_per_frame(&self) -> usize {
        if self.frames.is_empty() {
            return 0;
        }
        self.frames.iter().map(|f| f.fragments.len()).sum::<usize>() / self.frames.len()
    }

    /// Derives a single-residue library by slicing every window position of
    /// every fragment, preserving rank order within each new frame.
    pub fn chop_to_1mers(&self) -> FragmentLibrary {
        let mut by_start: BTreeMap<usize, Vec<Fragment>> = BTreeMap::new();
        for frame in &self.frames {
            for fragment in &frame.fragments {
                for (offset, torsions) in fragment.torsions.iter().enumerate() {
                    by_start
                        .entry(frame.start + offset)
                        .or_default()
                        .push(Fragment::new(vec![*torsions]));
                }
            }
        }
        let frames = by_start
            .into_iter()
            .map(|(start, fragments)| Frame { start, fragments })
            .collect();
        FragmentLibrary {
            window_len: 1,
            frames,
        }
    }

    /// Votes a three-state secondary structure string (H/E/L) over the target
    /// from the top-ranked fragments covering each position.
    pub fn derived_secstruct(&self, nres: usize, top_n: usize) -> String {
        let mut votes = vec![[0usize; 3]; nres];
        for frame in &self.frames {
            let considered = if top_n == 0 {
                frame.fragments.len()
            } else {
                top_n.min(frame.fragments.len())
            };
            for fragment in &frame.fragments[..considered] {
                for (offset, torsions) in fragment.torsions.iter().enumerate() {
                    let position = frame.start + offset;
                    if position >= nres {
                        continue;
                    }
                    let state = classify_torsions(torsions);
                    votes[position][state] += 1;
                }
            }
        }
        votes
            .iter()
            .map(|counts| {
                let best = (0..3).max_by_key(|&s| counts[s]).unwrap();
                if counts[best] == 0 {
                    'L'
                } else {
                    ['H', 'E', 'L'][best]
                }
            })
            .collect()
    }
}

/// Ramachandran-region classification: 0 = helix, 1 = strand, 2 = loop.
fn classify_torsions(torsions: &Torsions) -> usize {
    let phi = torsions.phi;
    let psi = torsions.psi;
    if (-100.0..-30.0).contains(&phi) && (-80.0..-5.0).contains(&psi) {
        0
    } else if (-180.0..-80.0).contains(&phi) && (psi >= 80.0 || psi <= -170.0) {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strand() -> Torsions {
        Torsions::new(-120.0, 130.0, 180.0)
    }

    fn helix() -> Torsions {
        Torsions::new(-60.0, -45.0, 180.0)
    }

    fn frame_of(start: usize, window: usize, count: usize, torsions: Torsions) -> Frame {
        Frame {
            start,
            fragments: (0..count)
                .map(|_| Fragment::new(vec![torsions; window]))
                .collect(),
        }
    }

    #[test]
    fn new_rejects_window_mismatch() {
        let bad = Frame {
            start: 0,
            fragments: vec![Fragment::new(vec![strand(); 2])],
        };
        let err = FragmentLibrary::new(3, vec![bad]).unwrap_err();
        assert_eq!(
            err,
            FragmentError::WindowMismatch {
                frame_start: 0,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn frames_are_sorted_by_start() {
        let lib = FragmentLibrary::new(
            3,
            vec![frame_of(6, 3, 1, strand()), frame_of(2, 3, 1, strand())],
        )
        .unwrap();
        let starts: Vec<_> = lib.frames().iter().map(|f| f.start).collect();
        assert_eq!(starts, vec![2, 6]);
    }

    #[test]
    fn chop_to_1mers_covers_every_window_position() {
        let lib = FragmentLibrary::new(3, vec![frame_of(4, 3, 2, strand())]).unwrap();
        let chopped = lib.chop_to_1mers();
        assert_eq!(chopped.window_len(), 1);
        let starts: Vec<_> = chopped.frames().iter().map(|f| f.start).collect();
        assert_eq!(starts, vec![4, 5, 6]);
        for frame in chopped.frames() {
            assert_eq!(frame.fragments.len(), 2);
            assert_eq!(frame.fragments[0].torsions.len(), 1);
        }
    }

    #[test]
    fn derived_secstruct_votes_by_ramachandran_region() {
        let lib = FragmentLibrary::new(
            3,
            vec![frame_of(0, 3, 5, helix()), frame_of(3, 3, 5, strand())],
        )
        .unwrap();
        let ss = lib.derived_secstruct(7, 25);
        assert_eq!(ss, "HHHEEEL");
    }

    #[test]
    fn mean_fragments_per_frame_handles_empty_library() {
        assert_eq!(FragmentLibrary::empty(9).mean_fragments_per_frame(), 0);
        let lib = FragmentLibrary::new(3, vec![frame_of(0, 3, 4, strand())]).unwrap();
        assert_eq!(lib.mean_fragments_per_frame(), 4);
    }
}
