//! User accounts stored in the `Registered_users` collection.

use chrono::{DateTime, Utc};
use morse_core::documents::{filter_eq, ID_FIELD};
use morse_core::{Document, DocumentError, DocumentStore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const USERS_COLLECTION: &str = "Registered_users";

/// A stored user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashed_password: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_company: bool,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub promo: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
}

/// User fields safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_company: bool,
    pub company_id: Option<String>,
    pub promo: bool,
    pub is_active: bool,
    pub is_verified: bool,
    pub date_joined: Option<DateTime<Utc>>,
}

impl From<UserRecord> for PublicUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_company: user.is_company,
            company_id: user.company_id,
            promo: user.promo,
            is_active: user.is_active,
            is_verified: user.is_verified,
            date_joined: user.date_joined,
        }
    }
}

impl UserRecord {
    fn from_document(document: Document) -> Result<Self, DocumentError> {
        serde_json::from_value(serde_json::Value::Object(document)).map_err(|e| {
            DocumentError::Malformed {
                collection: USERS_COLLECTION.to_string(),
                reason: e.to_string(),
            }
        })
    }

    fn into_document(self) -> Result<Document, DocumentError> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(DocumentError::Malformed {
                collection: USERS_COLLECTION.to_string(),
                reason: "user did not serialize to an object".into(),
            }),
            Err(e) => Err(DocumentError::Malformed {
                collection: USERS_COLLECTION.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

pub async fn find_by_email(
    store: &dyn DocumentStore,
    email: &str,
) -> Result<Option<UserRecord>, DocumentError> {
    store
        .find_one(USERS_COLLECTION, &filter_eq("email", email))
        .await?
        .map(UserRecord::from_document)
        .transpose()
}

pub async fn find_by_id(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<Option<UserRecord>, DocumentError> {
    store
        .find_one(USERS_COLLECTION, &filter_eq(ID_FIELD, id))
        .await?
        .map(UserRecord::from_document)
        .transpose()
}

/// Insert `user`, returning it with its assigned id.
pub async fn insert(
    store: &dyn DocumentStore,
    mut user: UserRecord,
) -> Result<UserRecord, DocumentError> {
    let id = store
        .insert_one(USERS_COLLECTION, user.clone().into_document()?)
        .await?;
    user.id = id;
    Ok(user)
}

/// Mark the user verified and active. Returns `false` if no such user.
pub async fn mark_verified(store: &dyn DocumentStore, id: &str) -> Result<bool, DocumentError> {
    let mut set = Document::new();
    set.insert("is_verified".into(), true.into());
    set.insert("is_active".into(), true.into());
    store
        .update_one(USERS_COLLECTION, &filter_eq(ID_FIELD, id), set)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use morse_core::MemoryDocumentStore;

    fn user(email: &str) -> UserRecord {
        UserRecord {
            id: String::new(),
            email: email.into(),
            hashed_password: Some("pbkdf2-sha256$1$AA==$AA==".into()),
            full_name: Some("Test User".into()),
            is_company: false,
            company_id: None,
            promo: true,
            is_active: false,
            is_verified: false,
            date_joined: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_email_and_id() {
        let store = MemoryDocumentStore::new();
        let inserted = insert(&store, user("a@b.c")).await.unwrap();
        assert!(!inserted.id.is_empty());

        let by_email = find_by_email(&store, "a@b.c").await.unwrap().unwrap();
        assert_eq!(by_email, inserted);
        let by_id = find_by_id(&store, &inserted.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@b.c");
        assert!(find_by_email(&store, "x@y.z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_verified_sets_both_flags() {
        let store = MemoryDocumentStore::new();
        let inserted = insert(&store, user("a@b.c")).await.unwrap();

        assert!(mark_verified(&store, &inserted.id).await.unwrap());
        let found = find_by_id(&store, &inserted.id).await.unwrap().unwrap();
        assert!(found.is_verified && found.is_active);
        assert!(!mark_verified(&store, "missing").await.unwrap());
    }

    #[test]
    fn public_user_omits_password_hash() {
        let json = serde_json::to_value(PublicUser::from(user("a@b.c"))).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["email"], "a@b.c");
    }

    #[tokio::test]
    async fn malformed_document_is_reported() {
        let store = MemoryDocumentStore::new();
        let mut doc = Document::new();
        doc.insert("email".into(), 42.into());
        store.insert_one(USERS_COLLECTION, doc).await.unwrap();
        assert!(matches!(
            find_by_email(&store, "a@b.c").await,
            Ok(None)
        ));
        let mut doc = Document::new();
        doc.insert("email".into(), "bad@b.c".into());
        doc.insert("is_verified".into(), "yes".into());
        store.insert_one(USERS_COLLECTION, doc).await.unwrap();
        assert!(matches!(
            find_by_email(&store, "bad@b.c").await,
            Err(DocumentError::Malformed { .. })
        ));
    }
}
