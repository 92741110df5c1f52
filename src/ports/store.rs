use crate::types::firestore::{Document, Fields};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("unreadable response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A remote document database holding collections of documents.
pub trait DocumentStore: Send + Sync {
    type ListFut<'a>: Future<Output = Result<Vec<Document>, StoreError>> + Send + 'a
    where
        Self: 'a;
    type WriteFut<'a>: Future<Output = Result<(), StoreError>> + Send + 'a
    where
        Self: 'a;

    /// Every document of `collection`, following pagination to the end.
    fn list_documents<'a>(&'a self, collection: &'a str) -> Self::ListFut<'a>;

    /// Replaces the document at `path` with `fields`.
    fn overwrite_document<'a>(&'a self, path: &'a str, fields: &'a Fields) -> Self::WriteFut<'a>;
}
