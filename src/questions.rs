//! Question catalog
//!
//! The catalog is loaded once at startup and shared read-only by every lobby.
//! Each lobby keeps its own set of used question ids; picks never repeat until
//! the whole catalog has been used, then the cycle starts over.

use crate::types::{Question, QuestionId};
use rand::Rng;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read question catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse question catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Question catalog is empty")]
    Empty,

    #[error("Duplicate question id in catalog: {0}")]
    DuplicateId(QuestionId),
}

#[derive(Debug)]
pub struct QuestionSource {
    questions: Vec<Question>,
}

impl QuestionSource {
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.id.as_str()) {
                return Err(CatalogError::DuplicateId(q.id.clone()));
            }
        }

        Ok(Self { questions })
    }

    /// Load a catalog from a JSON array file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let questions: Vec<Question> = serde_json::from_str(&raw)?;
        let source = Self::new(questions)?;
        tracing::info!(
            "Loaded {} questions from {}",
            source.len(),
            path.as_ref().display()
        );
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Pick a random question not in `used` and record it there.
    /// Clears `used` first once every question has been asked.
    pub fn pick(&self, used: &mut HashSet<QuestionId>) -> Question {
        self.pick_with(used, &mut rand::rng())
    }

    pub fn pick_with<R: Rng>(&self, used: &mut HashSet<QuestionId>, rng: &mut R) -> Question {
        let mut remaining: Vec<&Question> = self
            .questions
            .iter()
            .filter(|q| !used.contains(&q.id))
            .collect();

        if remaining.is_empty() {
            tracing::debug!("Question catalog exhausted, starting a new cycle");
            used.clear();
            remaining = self.questions.iter().collect();
        }

        let choice = remaining[rng.random_range(0..remaining.len())].clone();
        used.insert(choice.id.clone());
        choice
    }
}
