use ndarray::Array1;
use tracing::debug;

use crate::codec;
use crate::error::{RagError, Result};
use crate::similarity::cosine_similarity;

/// A stored chunk together with its encoded embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: i64,
    pub label: String,
    pub text: String,
    pub embedding: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate<'a> {
    pub candidate: &'a Candidate,
    pub score: f64,
}

/// Working set for a single query: every candidate is decoded and scored
/// against the query on each call, nothing is kept between calls.
pub struct RetrievalIndex<'a> {
    candidates: &'a [Candidate],
    query: Array1<f64>,
}

impl<'a> RetrievalIndex<'a> {
    pub fn new(candidates: &'a [Candidate], query: impl Into<Array1<f64>>) -> Self {
        RetrievalIndex {
            candidates,
            query: query.into(),
        }
    }

    /// Scores every candidate in input order. Stops at the first candidate
    /// whose blob is malformed or empty, or whose dimension differs from the query.
    pub fn scored(&self) -> Result<Vec<ScoredCandidate<'a>>> {
        self.check_query()?;
        self.candidates
            .iter()
            .map(|candidate| {
                let score = self.score(candidate)?;
                Ok(ScoredCandidate { candidate, score })
            })
            .collect()
    }

    /// Returns the candidate most similar to the query. On equal scores the
    /// one earliest in input order wins; a NaN score never wins.
    pub fn find_best(&self) -> Result<&'a Candidate> {
        self.check_query()?;
        let mut best: Option<ScoredCandidate<'a>> = None;

        for candidate in self.candidates {
            let score = self.score(candidate)?;
            let replace = match &best {
                None => true,
                Some(current) => score > current.score || current.score.is_nan(),
            };
            if replace {
                best = Some(ScoredCandidate { candidate, score });
            }
        }

        let best = best.ok_or(RagError::EmptyCollection)?;
        debug!(
            label = %best.candidate.label,
            score = best.score,
            scanned = self.candidates.len(),
            "Selected best candidate"
        );
        Ok(best.candidate)
    }

    fn check_query(&self) -> Result<()> {
        if self.query.is_empty() {
            return Err(RagError::EmptyQueryEmbedding);
        }
        Ok(())
    }

    fn score(&self, candidate: &Candidate) -> Result<f64> {
        let vector = codec::decode(&candidate.embedding).map_err(|e| RagError::DecodeFailure {
            candidate: candidate.label.clone(),
            source: Box::new(e),
        })?;
        if vector.is_empty() {
            return Err(RagError::EmptyEmbedding {
                candidate: candidate.label.clone(),
            });
        }

        cosine_similarity(self.query.view(), vector.view()).map_err(|e| RagError::ScoreFailure {
            candidate: candidate.label.clone(),
            source: Box::new(e),
        })
    }
}
