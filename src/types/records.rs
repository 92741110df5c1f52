use crate::types::firestore::Document;

const CREATED_AT: &str = "createdAt";
const TIMESTAMP: &str = "timestamp";
const LAST_LOGIN: &str = "lastLogin";
const STATUS: &str = "status";
const REQUESTER_ID: &str = "requesterId";
const TARGET_ID: &str = "targetId";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub registered_at: Option<i64>,
    pub last_login: Option<i64>,
}

impl From<&Document> for UserRecord {
    fn from(document: &Document) -> Self {
        Self {
            registered_at: created_at(document),
            last_login: document.millis(LAST_LOGIN),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Other(String),
}

impl RequestStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("pending") => Self::Pending,
            Some("approved") => Self::Approved,
            Some("rejected") => Self::Rejected,
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockRequest {
    pub created_at: Option<i64>,
    pub status: RequestStatus,
    pub requester_id: Option<String>,
    pub target_id: Option<String>,
}

impl From<&Document> for UnlockRequest {
    fn from(document: &Document) -> Self {
        let status = document.fields.get(STATUS).and_then(|value| value.as_str());
        Self {
            created_at: created_at(document),
            status: RequestStatus::parse(status),
            requester_id: document.non_empty_str(REQUESTER_ID).map(str::to_string),
            target_id: document.non_empty_str(TARGET_ID).map(str::to_string),
        }
    }
}

fn created_at(document: &Document) -> Option<i64> {
    document
        .millis(CREATED_AT)
        .or_else(|| document.millis(TIMESTAMP))
}
