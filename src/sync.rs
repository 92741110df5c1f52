use crate::adapters::{FirestoreStore, SystemClock};
use crate::auth::{self, AuthError, CredentialError, ServiceAccount};
use crate::config::{StoreSettings, SyncConfig};
use crate::ports::{Clock, DocumentStore, StoreError};
use crate::stats::GrowthTrend;
use crate::types::firestore::{Document, Fields};
use crate::types::records::{UnlockRequest, UserRecord};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("failed to fetch {collection}: {source}")]
    Fetch {
        collection: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to save stats to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug)]
pub enum SyncOutcome {
    Written(GrowthTrend),
    Preview(Fields),
}

/// Authenticates with the configured credentials, then runs the pipeline against Firestore.
pub async fn execute(config: &SyncConfig) -> Result<SyncOutcome, SyncError> {
    let account = ServiceAccount::load(&config.credentials)?;
    let http = reqwest::Client::builder()
        .build()
        .map_err(SyncError::Client)?;

    info!("authenticating as {}", account.client_email);
    let token = auth::fetch_access_token(&http, &account).await?;

    let store = FirestoreStore::new(http, config.store.base_url_for(&account.project_id), token);
    let clock = SystemClock::new(config.local_offset);
    run(&store, &clock, &config.store, config.dry_run).await
}

pub async fn run<S, C>(
    store: &S,
    clock: &C,
    settings: &StoreSettings,
    dry_run: bool,
) -> Result<SyncOutcome, SyncError>
where
    S: DocumentStore,
    C: Clock,
{
    let trend = collect(store, clock, settings).await?;
    let fields = trend.to_fields(clock.now());
    if dry_run {
        return Ok(SyncOutcome::Preview(fields));
    }

    info!("saving stats to {}", settings.summary_document);
    store
        .overwrite_document(&settings.summary_document, &fields)
        .await
        .map_err(|source| SyncError::Write {
            path: settings.summary_document.clone(),
            source,
        })?;
    info!(
        days = trend.series.labels.len(),
        users = trend.total_users,
        requests = trend.total_requests,
        approved = trend.counters.approved,
        "stats synced"
    );
    Ok(SyncOutcome::Written(trend))
}

pub async fn collect<S, C>(
    store: &S,
    clock: &C,
    settings: &StoreSettings,
) -> Result<GrowthTrend, SyncError>
where
    S: DocumentStore,
    C: Clock,
{
    let users: Vec<UserRecord> = fetch(store, &settings.users_collection)
        .await?
        .iter()
        .map(UserRecord::from)
        .collect();
    info!("fetched {} users", users.len());

    let requests: Vec<UnlockRequest> = fetch(store, &settings.requests_collection)
        .await?
        .iter()
        .map(UnlockRequest::from)
        .collect();
    info!("fetched {} requests", requests.len());

    Ok(GrowthTrend::from_records(
        &users,
        &requests,
        clock.local_offset(),
    ))
}

async fn fetch<S: DocumentStore>(
    store: &S,
    collection: &str,
) -> Result<Vec<Document>, SyncError> {
    info!("fetching {collection}");
    store
        .list_documents(collection)
        .await
        .map_err(|source| SyncError::Fetch {
            collection: collection.to_string(),
            source,
        })
}
