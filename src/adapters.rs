use std::pin::Pin;

use time::{OffsetDateTime, UtcOffset};

use crate::auth::AccessToken;
use crate::ports::{self, StoreError};
use crate::types::firestore::{Document, DocumentWrite, Fields, ListDocumentsResponse};

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    /// The local offset must be resolved before any other thread is spawned.
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl ports::Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn local_offset(&self) -> UtcOffset {
        self.offset
    }
}

/// Firestore REST client bound to one database's `documents` root.
#[derive(Clone)]
pub struct FirestoreStore {
    http: reqwest::Client,
    base_url: String,
    token: AccessToken,
}

impl FirestoreStore {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: AccessToken) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn list_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
    ) -> Result<ListDocumentsResponse, StoreError> {
        let url = self.url(collection);
        let mut request = self.http.get(&url).bearer_auth(self.token.secret());
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }
        let response = request
            .send()
            .await
            .map_err(|source| StoreError::Transport {
                url: url.clone(),
                source,
            })?;
        let response = ensure_success(&url, response).await?;
        response
            .json()
            .await
            .map_err(|source| StoreError::Decode { url, source })
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.list_page(collection, page_token.as_deref()).await?;
            documents.extend(page.documents);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(documents)
    }

    async fn patch(&self, path: &str, fields: &Fields) -> Result<(), StoreError> {
        let url = self.url(path);
        let response = self
            .http
            .patch(&url)
            .bearer_auth(self.token.secret())
            .json(&DocumentWrite { fields })
            .send()
            .await
            .map_err(|source| StoreError::Transport {
                url: url.clone(),
                source,
            })?;
        ensure_success(&url, response).await?;
        Ok(())
    }
}

async fn ensure_success(
    url: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

impl ports::DocumentStore for FirestoreStore {
    type ListFut<'a>
        = Pin<Box<dyn Future<Output = Result<Vec<Document>, StoreError>> + Send + 'a>>
    where
        Self: 'a;
    type WriteFut<'a>
        = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>
    where
        Self: 'a;

    fn list_documents<'a>(&'a self, collection: &'a str) -> Self::ListFut<'a> {
        Box::pin(self.fetch_all(collection))
    }

    fn overwrite_document<'a>(&'a self, path: &'a str, fields: &'a Fields) -> Self::WriteFut<'a> {
        Box::pin(self.patch(path, fields))
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::ports::DocumentStore;
    use crate::types::firestore::Value;
    use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> FirestoreStore {
        FirestoreStore::new(
            reqwest::Client::new(),
            format!("{}/v1/documents/", server.uri()),
            AccessToken::new("secret-token"),
        )
    }

    fn page(names: &[&str], next: Option<&str>) -> serde_json::Value {
        let documents: Vec<serde_json::Value> = names
            .iter()
            .map(|name| serde_json::json!({ "name": name, "fields": {} }))
            .collect();
        match next {
            Some(next) => serde_json::json!({ "documents": documents, "nextPageToken": next }),
            None => serde_json::json!({ "documents": documents }),
        }
    }

    #[tokio::test]
    async fn list_documents__should_follow_page_tokens() {
        // Given
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/documents/users"))
            .and(query_param_is_missing("pageToken"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["u1", "u2"], Some("p2"))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/documents/users"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(&["u3"], Some(""))))
            .expect(1)
            .mount(&server)
            .await;

        // When
        let documents = store(&server)
            .list_documents("users")
            .await
            .expect("list documents");

        // Then
        let names: Vec<&str> = documents.iter().map(|doc| doc.name.as_str()).collect();
        assert_eq!(names, ["u1", "u2", "u3"]);
    }

    #[tokio::test]
    async fn list_documents__should_accept_empty_collection() {
        // Given
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        // When
        let documents = store(&server)
            .list_documents("unlock_requests")
            .await
            .expect("list documents");

        // Then
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn list_documents__should_fail_on_error_status() {
        // Given
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
            .mount(&server)
            .await;

        // When
        let result = store(&server).list_documents("users").await;

        // Then
        match result {
            Err(StoreError::Status { status, body, .. }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "permission denied");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn overwrite_document__should_patch_fields() {
        // Given
        let server = MockServer::start().await;
        let mut fields = Fields::new();
        fields.insert("totalUsers".to_string(), Value::integer(3));
        Mock::given(method("PATCH"))
            .and(path("/v1/documents/stats/growth_trend"))
            .and(body_json(serde_json::json!({
                "fields": { "totalUsers": { "integerValue": "3" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        // When
        let result = store(&server)
            .overwrite_document("stats/growth_trend", &fields)
            .await;

        // Then
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn overwrite_document__should_report_rejected_write() {
        // Given
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad field"))
            .mount(&server)
            .await;

        // When
        let result = store(&server)
            .overwrite_document("stats/growth_trend", &Fields::new())
            .await;

        // Then
        assert!(matches!(result, Err(StoreError::Status { status: 400, .. })));
    }
}
