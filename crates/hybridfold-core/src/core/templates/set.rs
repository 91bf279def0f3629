use super::template::Template;
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TemplateSetError {
    #[error("Template set is empty")]
    Empty,
    #[error("Weight list length {weights} does not match template count {templates}")]
    WeightCountMismatch { weights: usize, templates: usize },
    #[error("Initial template index {index} out of range for {len} templates")]
    InitialIndexOutOfRange { index: usize, len: usize },
}

/// The live collection of templates with their prior weights. Prior weights
/// of all templates always sum to 1; they are renormalized after
/// construction and after every filtering step. Synthesized strand-pairing
/// templates are registered with weight zero and tracked separately so that
/// random chunk selection can skip them.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: Vec<Template>,
    weights: Vec<f64>,
    initial_index: usize,
    pairing_indices: HashSet<usize>,
}

impl TemplateSet {
    pub fn new(
        templates: Vec<Template>,
        weights: Vec<f64>,
        initial_index: usize,
    ) -> Result<Self, TemplateSetError> {
        if templates.is_empty() {
            return Err(TemplateSetError::Empty);
        }
        if weights.len() != templates.len() {
            return Err(TemplateSetError::WeightCountMismatch {
                weights: weights.len(),
                templates: templates.len(),
            });
        }
        if initial_index >= templates.len() {
            return Err(TemplateSetError::InitialIndexOutOfRange {
                index: initial_index,
                len: templates.len(),
            });
        }
        let mut set = Self {
            templates,
            weights,
            initial_index,
            pairing_indices: HashSet::new(),
        };
        set.normalize_weights();
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn initial_index(&self) -> usize {
        self.initial_index
    }

    pub fn initial(&self) -> &Template {
        &self.templates[self.initial_index]
    }

    pub fn template(&self, index: usize) -> &Template {
        &self.templates[index]
    }

    pub fn template_mut(&mut self, index: usize) -> &mut Template {
        &mut self.templates[index]
    }

    pub fn weight(&self, index: usize) -> f64 {
        self.weights[index]
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn is_pairing(&self, index: usize) -> bool {
        self.pairing_indices.contains(&index)
    }

    pub fn pairing_indices(&self) -> impl Iterator<Item = usize> + '_ {
        let mut indices: Vec<usize> = self.pairing_indices.iter().copied().collect();
        indices.sort_unstable();
        indices.into_iter()
    }

    /// Appends a regular template and renormalizes the prior weights. When
    /// the set was emptied by filtering, the new template becomes the
    /// initial one.
    pub fn add_template(&mut self, template: Template, weight: f64) -> usize {
        let was_empty = self.templates.is_empty();
        self.templates.push(template);
        self.weights.push(weight);
        if was_empty {
            self.initial_index = 0;
        }
        self.normalize_weights();
        self.templates.len() - 1
    }

    /// Registers a synthesized strand-pairing template. Its prior weight is
    /// zero so it never participates in weighted template draws.
    pub fn add_pairing_template(&mut self, template: Template) -> usize {
        self.templates.push(template);
        self.weights.push(0.0);
        let index = self.templates.len() - 1;
        self.pairing_indices.insert(index);
        index
    }

    fn normalize_weights(&mut self) {
        let weight_sum: f64 = self.weights.iter().sum();
        if weight_sum <= 0.0 {
            // Degenerate prior: fall back to uniform over non-pairing templates.
            let live = self.templates.len() - self.pairing_indices.len();
            if live > 0 {
                let uniform = 1.0 / live as f64;
                for (i, w) in self.weights.iter_mut().enumerate() {
                    *w = if self.pairing_indices.contains(&i) {
                        0.0
                    } else {
                        uniform
                    };
                }
            }
            return;
        }
        for w in &mut self.weights {
            *w /= weight_sum;
        }
    }

    /// Removes the given templates and renormalizes the surviving prior
    /// weights. If the initial template is removed the first survivor takes
    /// its role. Pairing bookkeeping is remapped to the new indices.
    pub fn filter(&mut self, templates_to_remove: &HashSet<usize>) {
        if templates_to_remove.is_empty() {
            return;
        }

        let mut templates = Vec::new();
        let mut weights = Vec::new();
        let mut pairing_indices = HashSet::new();
        let mut new_initial = None;

        for (i, template) in self.templates.drain(..).enumerate() {
            if templates_to_remove.contains(&i) {
                if i == self.initial_index {
                    warn!(index = i, "Removing the initial template");
                }
                continue;
            }
            if i == self.initial_index {
                new_initial = Some(templates.len());
            }
            if self.pairing_indices.contains(&i) {
                pairing_indices.insert(templates.len());
            }
            weights.push(self.weights[i]);
            templates.push(template);
        }

        if templates.is_empty() {
            warn!("All templates were removed by filtering");
        }
        self.templates = templates;
        self.weights = weights;
        self.pairing_indices = pairing_indices;
        self.initial_index = new_initial.unwrap_or(0);
        self.normalize_weights();
    }
}
