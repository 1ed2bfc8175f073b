use std::cmp::Ordering;

use crate::document::model::Chunk;

pub const DEFAULT_TOP_K: usize = 5;

/// A retrieved chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Retrieval seam: anything that can rank candidates against a query vector.
pub trait SimilarityIndex: Send + Sync {
    fn top_k(&self, query: &[f32], candidates: &[Chunk], k: usize) -> Vec<RankedChunk>;
}

/// Full linear scan scoring every candidate with cosine similarity.
#[derive(Debug, Default, Clone, Copy)]
pub struct BruteForceIndex;

impl SimilarityIndex for BruteForceIndex {
    fn top_k(&self, query: &[f32], candidates: &[Chunk], k: usize) -> Vec<RankedChunk> {
        let mut scored: Vec<(usize, f32)> = candidates
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let score = chunk
                    .vector
                    .as_deref()
                    .map_or(0.0, |vector| cosine_similarity(query, vector));
                (i, score)
            })
            .collect();

        // Stable sort: equal scores keep candidate order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(i, score)| RankedChunk {
                chunk: candidates[i].clone(),
                score,
            })
            .collect()
    }
}

/// Cosine similarity; 0.0 for empty, zero-norm or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: i64, vector: Option<Vec<f32>>) -> Chunk {
        Chunk {
            id,
            document_id: 1,
            document_name: "policy.pdf".to_string(),
            chunk_index: id as usize,
            start_page: 0,
            end_page: 0,
            text: format!("chunk {}", id),
            vector,
        }
    }

    #[test]
    fn test_cosine_identity_and_degenerate_cases() {
        let a = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ranks_by_descending_score() {
        let candidates = vec![
            chunk(1, Some(vec![1.0, 0.0])),
            chunk(2, Some(vec![0.0, 1.0])),
            chunk(3, Some(vec![0.9, 0.1])),
        ];

        let ranked = BruteForceIndex.top_k(&[1.0, 0.0], &candidates, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].chunk.id, 1);
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
        assert_eq!(ranked[1].chunk.id, 3);
        assert!((ranked[1].score - 0.9939).abs() < 1e-3);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let candidates = vec![
            chunk(10, Some(vec![0.0, 1.0])),
            chunk(11, Some(vec![2.0, 0.0])),
            chunk(12, Some(vec![0.0, 3.0])),
            chunk(13, Some(vec![5.0, 0.0])),
        ];

        let first = BruteForceIndex.top_k(&[1.0, 0.0], &candidates, 4);
        let ids: Vec<_> = first.iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids, vec![11, 13, 10, 12]);

        let second = BruteForceIndex.top_k(&[1.0, 0.0], &candidates, 4);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_or_mismatched_vectors_score_zero() {
        let candidates = vec![
            chunk(1, None),
            chunk(2, Some(vec![1.0, 0.0, 0.0])),
            chunk(3, Some(vec![0.5, 0.5])),
        ];

        let ranked = BruteForceIndex.top_k(&[1.0, 0.0], &candidates, 5);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].chunk.id, 3);
        assert_eq!(ranked[1].score, 0.0);
        assert_eq!(ranked[1].chunk.id, 1);
        assert_eq!(ranked[2].chunk.id, 2);
    }

    #[test]
    fn test_fewer_candidates_than_k() {
        let candidates = vec![chunk(1, Some(vec![1.0]))];
        assert_eq!(BruteForceIndex.top_k(&[1.0], &candidates, DEFAULT_TOP_K).len(), 1);
        assert!(BruteForceIndex.top_k(&[1.0], &[], DEFAULT_TOP_K).is_empty());
    }
}
