use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("malformed embedding blob: {len} bytes is not a multiple of 8")]
    MalformedBlob { len: usize },

    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("no candidates to search")]
    EmptyCollection,

    #[error("failed to decode embedding for candidate {candidate}: {source}")]
    DecodeFailure {
        candidate: String,
        #[source]
        source: Box<RagError>,
    },

    #[error("failed to score candidate {candidate}: {source}")]
    ScoreFailure {
        candidate: String,
        #[source]
        source: Box<RagError>,
    },

    #[error("query cannot be empty")]
    EmptyQuery,

    #[error("query embedding is empty")]
    EmptyQueryEmbedding,

    #[error("stored embedding for candidate {candidate} is empty")]
    EmptyEmbedding { candidate: String },

    #[error("{name} has {tokens} tokens, over the limit of {limit}")]
    ContentTooLarge {
        name: String,
        tokens: usize,
        limit: usize,
    },

    #[error("embedding provider failed: {0:#}")]
    EmbeddingProviderFailure(#[source] anyhow::Error),

    #[error("generation provider failed: {0:#}")]
    GenerationProviderFailure(#[source] anyhow::Error),

    #[error("storage failed: {0:#}")]
    StorageFailure(#[source] anyhow::Error),

    #[error("ingestion failed: {0:#}")]
    Ingestion(#[source] anyhow::Error),
}
