use std::sync::Arc;
use thiserror::Error;

use crate::providers::traits::{EmbeddingProvider, ProviderError};

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding provider returned no vector")]
    Empty,
    #[error("Embedding generation failed: {0}")]
    Provider(#[source] ProviderError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Vector byte length {len} is not a multiple of element width {width}")]
    Misaligned { len: usize, width: usize },
    #[error("Unsupported vector element width: {0}")]
    UnsupportedWidth(usize),
}

/// Numeric width of one serialized vector element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementWidth {
    F32,
    F64,
}

impl ElementWidth {
    pub fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            4 => Some(ElementWidth::F32),
            8 => Some(ElementWidth::F64),
            _ => None,
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            ElementWidth::F32 => 4,
            ElementWidth::F64 => 8,
        }
    }
}

/// Fixed-width little-endian vector encoding.
///
/// One codec width is used for every vector written by the system. Stored
/// rows record their width so older rows written with a different width
/// can still be decoded through [`VectorCodec::for_stored_width`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorCodec {
    width: ElementWidth,
}

impl Default for VectorCodec {
    fn default() -> Self {
        Self::new(ElementWidth::F32)
    }
}

impl VectorCodec {
    pub fn new(width: ElementWidth) -> Self {
        Self { width }
    }

    pub fn for_stored_width(bytes: usize) -> Result<Self, CodecError> {
        ElementWidth::from_bytes(bytes)
            .map(Self::new)
            .ok_or(CodecError::UnsupportedWidth(bytes))
    }

    pub fn width(&self) -> ElementWidth {
        self.width
    }

    pub fn serialize(&self, vector: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(vector.len() * self.width.bytes());
        match self.width {
            ElementWidth::F32 => {
                for value in vector {
                    bytes.extend_from_slice(&value.to_le_bytes());
                }
            }
            ElementWidth::F64 => {
                for value in vector {
                    bytes.extend_from_slice(&f64::from(*value).to_le_bytes());
                }
            }
        }
        bytes
    }

    pub fn deserialize(&self, bytes: &[u8]) -> Result<Vec<f32>, CodecError> {
        let width = self.width.bytes();
        if bytes.len() % width != 0 {
            return Err(CodecError::Misaligned { len: bytes.len(), width });
        }

        let vector = match self.width {
            ElementWidth::F32 => bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            ElementWidth::F64 => bytes
                .chunks_exact(8)
                .map(|b| {
                    f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
                })
                .collect(),
        };

        Ok(vector)
    }
}

/// Calls the embedding provider and owns the codec vectors are stored with.
#[derive(Clone)]
pub struct EmbeddingCodec {
    provider: Arc<dyn EmbeddingProvider>,
    codec: VectorCodec,
}

impl EmbeddingCodec {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, codec: VectorCodec) -> Self {
        Self { provider, codec }
    }

    pub fn codec(&self) -> VectorCodec {
        self.codec
    }

    pub async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vector = self.provider.embed(text).await.map_err(|e| match e {
            ProviderError::EmptyResponse => EmbeddingError::Empty,
            other => EmbeddingError::Provider(other),
        })?;

        if vector.is_empty() {
            return Err(EmbeddingError::Empty);
        }

        log::debug!(
            "Encoded {} chars into a {}-dimension vector with {}",
            text.chars().count(),
            vector.len(),
            self.provider.model_name()
        );

        Ok(vector)
    }

    pub async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.encode(text).await?);
        }
        Ok(embeddings)
    }

    pub fn serialize(&self, vector: &[f32]) -> Vec<u8> {
        self.codec.serialize(vector)
    }

    pub fn deserialize(&self, bytes: &[u8]) -> Result<Vec<f32>, CodecError> {
        self.codec.deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticProvider(Option<Vec<f32>>);

    #[async_trait]
    impl EmbeddingProvider for StaticProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            match &self.0 {
                Some(v) => Ok(v.clone()),
                None => Err(ProviderError::Request("connection refused".to_string())),
            }
        }

        fn model_name(&self) -> &str {
            "static"
        }
    }

    #[test]
    fn test_serialized_length_matches_width() {
        let vector = vec![0.25_f32, -1.5, 3.0];
        assert_eq!(VectorCodec::new(ElementWidth::F32).serialize(&vector).len(), 12);
        assert_eq!(VectorCodec::new(ElementWidth::F64).serialize(&vector).len(), 24);
    }

    #[test]
    fn test_round_trip_both_widths() {
        let vector = vec![0.1_f32, -0.2, 0.333, 1e-7, 42.0];
        for width in [ElementWidth::F32, ElementWidth::F64] {
            let codec = VectorCodec::new(width);
            let decoded = codec.deserialize(&codec.serialize(&vector)).unwrap();
            assert_eq!(decoded.len(), vector.len());
            for (a, b) in decoded.iter().zip(&vector) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_little_endian_layout() {
        let bytes = VectorCodec::default().serialize(&[1.0]);
        assert_eq!(bytes, 1.0_f32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_misaligned_bytes_rejected() {
        let codec = VectorCodec::new(ElementWidth::F64);
        let err = codec.deserialize(&[0u8; 12]).unwrap_err();
        assert_eq!(err, CodecError::Misaligned { len: 12, width: 8 });
    }

    #[test]
    fn test_stored_width_lookup() {
        assert_eq!(VectorCodec::for_stored_width(8).unwrap().width(), ElementWidth::F64);
        assert_eq!(
            VectorCodec::for_stored_width(2).unwrap_err(),
            CodecError::UnsupportedWidth(2)
        );
    }

    #[tokio::test]
    async fn test_encode_wraps_provider_failure() {
        let codec = EmbeddingCodec::new(Arc::new(StaticProvider(None)), VectorCodec::default());
        let err = codec.encode("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Provider(ProviderError::Request(_))));
    }

    struct NoVectorProvider;

    #[async_trait]
    impl EmbeddingProvider for NoVectorProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Err(ProviderError::EmptyResponse)
        }

        fn model_name(&self) -> &str {
            "no-vector"
        }
    }

    #[tokio::test]
    async fn test_encode_maps_empty_response_to_empty() {
        let codec = EmbeddingCodec::new(Arc::new(NoVectorProvider), VectorCodec::default());
        assert!(matches!(codec.encode("hello").await, Err(EmbeddingError::Empty)));
    }

    #[tokio::test]
    async fn test_encode_rejects_empty_vector() {
        let codec = EmbeddingCodec::new(Arc::new(StaticProvider(Some(vec![]))), VectorCodec::default());
        assert!(matches!(codec.encode("hello").await, Err(EmbeddingError::Empty)));
    }

    #[tokio::test]
    async fn test_encode_batch_preserves_order() {
        let codec = EmbeddingCodec::new(
            Arc::new(StaticProvider(Some(vec![1.0, 2.0]))),
            VectorCodec::default(),
        );
        let out = codec
            .encode_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(out, vec![vec![1.0, 2.0], vec![1.0, 2.0]]);
    }
}
