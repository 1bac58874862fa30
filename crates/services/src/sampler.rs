use std::collections::HashSet;

use quiz_core::model::{Catalogue, QuestionId, QuestionRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SamplerError;

/// Draws questions from a catalogue without replacement.
///
/// Once every question has been drawn the used set is cleared and the whole
/// catalogue becomes available again, even in the middle of a session.
#[derive(Debug, Clone)]
pub struct QuestionSampler {
    catalogue: Catalogue,
    used_ids: HashSet<QuestionId>,
    rng: StdRng,
}

impl QuestionSampler {
    #[must_use]
    pub fn new(catalogue: Catalogue) -> Self {
        Self {
            catalogue,
            used_ids: HashSet::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Sampler with a deterministic random sequence.
    #[must_use]
    pub fn with_seed(catalogue: Catalogue, seed: u64) -> Self {
        Self {
            catalogue,
            used_ids: HashSet::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    #[must_use]
    pub fn used_ids(&self) -> &HashSet<QuestionId> {
        &self.used_ids
    }

    /// Questions that can still be drawn before the pool resets.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.catalogue.len() - self.used_ids.len()
    }

    /// Pick an unused question uniformly at random and mark it used.
    ///
    /// # Errors
    ///
    /// Returns `SamplerError::EmptyCatalogue` when there is nothing to draw.
    pub fn draw(&mut self) -> Result<QuestionRecord, SamplerError> {
        if self.catalogue.is_empty() {
            return Err(SamplerError::EmptyCatalogue);
        }

        let mut available: Vec<&QuestionRecord> = self
            .catalogue
            .iter()
            .filter(|q| !self.used_ids.contains(q.id()))
            .collect();

        if available.is_empty() {
            tracing::warn!(
                pool = self.catalogue.len(),
                "question pool exhausted, resetting"
            );
            self.used_ids.clear();
            available = self.catalogue.iter().collect();
        }

        let picked = available[self.rng.random_range(0..available.len())].clone();
        self.used_ids.insert(picked.id().clone());
        Ok(picked)
    }

    /// Forget every drawn question.
    pub fn reset(&mut self) {
        self.used_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionDraft;

    fn catalogue(n: u32) -> Catalogue {
        let drafts = (1..=n).map(|i| QuestionDraft {
            id: format!("q-{i}"),
            code: "a = 1\nb = 2".into(),
            error_line: 1,
            correct_line_text: "a = 2".into(),
            explanation: "demo".into(),
            error_type: "Demo".into(),
            validation_regex: None,
        });
        Catalogue::from_drafts(drafts).unwrap()
    }

    #[test]
    fn empty_catalogue_fails() {
        let mut sampler = QuestionSampler::with_seed(Catalogue::empty(), 1);
        assert_eq!(sampler.draw(), Err(SamplerError::EmptyCatalogue));
    }

    #[test]
    fn no_repeats_until_exhausted() {
        let mut sampler = QuestionSampler::with_seed(catalogue(5), 7);
        let mut seen = HashSet::new();
        for _ in 0..5 {
            let q = sampler.draw().unwrap();
            assert!(seen.insert(q.id().clone()), "repeated {}", q.id());
        }
        assert_eq!(sampler.remaining(), 0);
    }

    #[test]
    fn exhausted_pool_resets_and_keeps_drawing() {
        let mut sampler = QuestionSampler::with_seed(catalogue(3), 42);
        for _ in 0..3 {
            sampler.draw().unwrap();
        }
        let fourth = sampler.draw().unwrap();
        assert_eq!(sampler.used_ids().len(), 1);
        assert!(sampler.used_ids().contains(fourth.id()));

        // second cycle is again repeat-free
        let mut cycle = HashSet::from([fourth.id().clone()]);
        for _ in 0..2 {
            assert!(cycle.insert(sampler.draw().unwrap().id().clone()));
        }
        assert_eq!(cycle.len(), 3);
    }

    #[test]
    fn single_question_catalogue_always_returns_it() {
        let mut sampler = QuestionSampler::with_seed(catalogue(1), 3);
        for _ in 0..4 {
            assert_eq!(sampler.draw().unwrap().id().as_str(), "q-1");
        }
    }

    #[test]
    fn reset_clears_used_ids() {
        let mut sampler = QuestionSampler::with_seed(catalogue(4), 9);
        sampler.draw().unwrap();
        sampler.draw().unwrap();
        sampler.reset();
        assert_eq!(sampler.remaining(), 4);
    }
}
