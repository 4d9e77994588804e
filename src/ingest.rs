use anyhow::{Context, anyhow};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use crate::codec;
use crate::error::{RagError, Result};
use crate::llm::EmbeddingProvider;
use crate::store::{CandidateStore, NewCandidate};

/// A source file read from the documents directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub chunk_number: i64,
    pub content: String,
}

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"\w+|[^\w\s]").expect("token pattern is valid");
}

/// Approximate token count: words and individual punctuation marks after NFC normalization.
pub fn count_tokens(text: &str) -> usize {
    let text = text.nfc().collect::<String>();
    TOKEN_RE.find_iter(&text).count()
}

/// Reads every `.md` file directly inside `dir`, sorted by file name.
/// The label is the file stem and the chunk number its position in the listing.
pub fn load_documents(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(RagError::Ingestion(anyhow!(
            "documents directory {} must exist",
            dir.display()
        )));
    }

    let mut paths = fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|entry| entry.map(|e| e.path()))
                .collect::<std::io::Result<Vec<PathBuf>>>()
        })
        .with_context(|| format!("could not read {}", dir.display()))
        .map_err(RagError::Ingestion)?;
    paths.sort();

    let mut documents = Vec::new();
    for (i, path) in paths.into_iter().enumerate() {
        let is_markdown = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if !path.is_file() || !is_markdown {
            continue;
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("could not read contents of {}", path.display()))
            .map_err(RagError::Ingestion)?;

        documents.push(Document {
            name,
            chunk_number: i as i64,
            content,
        });
    }

    Ok(documents)
}

/// Rejects any document whose token count exceeds `limit`.
pub fn validate_sizes(documents: &[Document], limit: usize) -> Result<()> {
    for document in documents {
        let tokens = count_tokens(&document.content);
        debug!(name = %document.name, tokens, "Counted tokens");
        if tokens > limit {
            return Err(RagError::ContentTooLarge {
                name: document.name.clone(),
                tokens,
                limit,
            });
        }
    }
    Ok(())
}

/// Embeds every document and atomically replaces the stored collection.
/// Nothing is written if any document fails validation or embedding.
pub async fn populate(
    store: &dyn CandidateStore,
    embedder: &dyn EmbeddingProvider,
    documents: Vec<Document>,
    max_tokens: usize,
) -> Result<usize> {
    validate_sizes(&documents, max_tokens)?;

    let mut candidates = Vec::with_capacity(documents.len());
    for document in documents {
        let embedding = embedder
            .embed(&document.content)
            .await
            .with_context(|| format!("failed to generate embedding for {}", document.name))
            .map_err(RagError::EmbeddingProviderFailure)?;
        debug!(name = %document.name, dimension = embedding.len(), "Embedded document");

        candidates.push(NewCandidate {
            label: document.name,
            chunk_number: document.chunk_number,
            text: document.content,
            embedding: codec::encode(&embedding),
        });
    }

    let count = candidates.len();
    store.replace_all_candidates(candidates).await?;
    info!(count, "Populated store");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f64>> {
            if text.contains("poison") {
                return Err(anyhow!("provider refused"));
            }
            Ok(vec![text.len() as f64, 1.0])
        }
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        write!(file, "{content}").unwrap();
    }

    #[test]
    fn test_count_tokens() {
        assert_eq!(count_tokens(""), 0);
        assert_eq!(count_tokens("Cats purr."), 3);
        assert_eq!(count_tokens("  the   quick, brown fox!  "), 6);
    }

    #[test]
    fn test_load_documents_only_reads_markdown() {
        let dir = tempdir().unwrap();
        write(dir.path(), "dog.md", "Dogs bark.");
        write(dir.path(), "cat.MD", "Cats purr.");
        write(dir.path(), "notes.txt", "ignored");
        fs::create_dir(dir.path().join("nested.md")).unwrap();

        let documents = load_documents(dir.path()).unwrap();
        let names: Vec<_> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["cat", "dog"]);
        assert_eq!(documents[0].content, "Cats purr.");
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("animals");
        assert!(matches!(
            load_documents(&missing),
            Err(RagError::Ingestion(_))
        ));
    }

    #[test]
    fn test_oversized_document_is_rejected() {
        let documents = vec![Document {
            name: "whale".to_string(),
            chunk_number: 0,
            content: "big ".repeat(11),
        }];
        match validate_sizes(&documents, 10) {
            Err(RagError::ContentTooLarge { name, tokens, limit }) => {
                assert_eq!(name, "whale");
                assert_eq!(tokens, 11);
                assert_eq!(limit, 10);
            }
            other => panic!("expected ContentTooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_populate_writes_encoded_embeddings() {
        let dir = tempdir().unwrap();
        write(dir.path(), "cat.md", "Cats purr.");
        write(dir.path(), "dog.md", "Dogs bark loudly.");
        let store = SqliteStore::open_in_memory().unwrap();

        let documents = load_documents(dir.path()).unwrap();
        let count = populate(&store, &LengthEmbedder, documents, 1000).await.unwrap();
        assert_eq!(count, 2);

        let loaded = store.load_all_candidates().await.unwrap();
        assert_eq!(loaded[1].label, "dog");
        assert_eq!(
            codec::decode(&loaded[1].embedding).unwrap().to_vec(),
            vec![17.0, 1.0]
        );
    }

    #[tokio::test]
    async fn test_failed_embedding_leaves_store_untouched() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = vec![Document {
            name: "cat".to_string(),
            chunk_number: 0,
            content: "Cats purr.".to_string(),
        }];
        populate(&store, &LengthEmbedder, first, 1000).await.unwrap();

        let second = vec![
            Document {
                name: "dog".to_string(),
                chunk_number: 0,
                content: "Dogs bark.".to_string(),
            },
            Document {
                name: "toad".to_string(),
                chunk_number: 1,
                content: "poison skin".to_string(),
            },
        ];
        let err = populate(&store, &LengthEmbedder, second, 1000).await.unwrap_err();
        assert!(matches!(err, RagError::EmbeddingProviderFailure(_)));
        assert!(err.to_string().contains("toad"));

        let loaded = store.load_all_candidates().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].label, "cat");
    }

    #[tokio::test]
    async fn test_oversized_document_leaves_store_untouched() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = vec![Document {
            name: "cat".to_string(),
            chunk_number: 0,
            content: "Cats purr.".to_string(),
        }];
        populate(&store, &LengthEmbedder, first, 10).await.unwrap();

        let second = vec![
            Document {
                name: "dog".to_string(),
                chunk_number: 0,
                content: "Dogs bark.".to_string(),
            },
            Document {
                name: "whale".to_string(),
                chunk_number: 1,
                content: "big ".repeat(11),
            },
        ];
        let err = populate(&store, &LengthEmbedder, second, 10).await.unwrap_err();
        assert!(matches!(err, RagError::ContentTooLarge { ref name, .. } if name == "whale"));

        let loaded = store.load_all_candidates().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].label, "cat");
    }
}
