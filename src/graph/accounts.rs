//! Accounts synchronizer
//!
//! Applies reconciled account modifications to the entity graph. Only the
//! browser's signed-in identity exposes privileged data, so foreign
//! accounts and authorization failures produce placeholder entities instead
//! of aborting the pass.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{
    retry_on_authorization, IdentityProvider, YouTubeApi, AUTH_RETRY_ATTEMPTS,
    AUTH_RETRY_BACKOFF,
};
use crate::bus::{Actor, HandlerError, Mailbox};
use crate::message::Payload;
use crate::sync::SyncStorageGateway;
use crate::topics;

use super::db::Database;
use super::error::GraphError;
use super::model::{Account, AccountState};
use super::videos::{refresh_account_videos, remove_account_cascade};

/// Reply answered to the add-account flow on success.
pub const STATUS_ADDED: &str = "ADDED";

/// Reply answered when privileged account info was unreachable.
pub const STATUS_AUTHORIZATION_REJECTED: &str = "AUTHORIZATION_REJECTED";

/// Actor applying `storage.sync.ACCOUNT_*` modifications to the graph.
pub struct AccountsSynchronizer {
    mailbox: Mailbox,
    db: Database,
    gateway: Arc<SyncStorageGateway>,
    api: Arc<dyn YouTubeApi>,
    identity: Arc<dyn IdentityProvider>,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl AccountsSynchronizer {
    pub fn new(
        db: Database,
        gateway: Arc<SyncStorageGateway>,
        api: Arc<dyn YouTubeApi>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            mailbox: Mailbox::new(),
            db,
            gateway,
            api,
            identity,
            retry_attempts: AUTH_RETRY_ATTEMPTS,
            retry_backoff: AUTH_RETRY_BACKOFF,
        }
    }

    /// Overrides the authorization retry policy.
    pub fn with_retry_policy(mut self, attempts: u32, backoff: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_backoff = backoff;
        self
    }

    async fn on_added(&self, account_id: &str) -> Result<Option<Payload>, GraphError> {
        // the account may have been removed again before this handler ran
        let entry = match self.gateway.find_account(account_id).await? {
            Some(entry) => entry,
            None => {
                tracing::warn!(
                    account = %account_id,
                    "Reconciled account vanished, ignoring stale event"
                );
                return Ok(None);
            }
        };

        let current = match self.identity.current_account_id().await {
            Ok(current) => current,
            Err(error) if error.is_authorization() => None,
            Err(error) => return Err(error.into()),
        };

        let (mut account, status) = if current.as_deref() != Some(account_id) {
            tracing::info!(account = %account_id, "Not the signed-in identity, persisting placeholder");
            (
                Account::placeholder(account_id, AccountState::Unauthorized),
                STATUS_ADDED,
            )
        } else {
            let fetched = retry_on_authorization(self.retry_attempts, self.retry_backoff, || {
                self.api.account_info(account_id, None)
            })
            .await;
            match fetched {
                Ok(account) => (account, STATUS_ADDED),
                Err(error) if error.is_authorization() => {
                    let mut account =
                        Account::placeholder(account_id, AccountState::Unauthorized);
                    account.last_error = Some(error.to_string());
                    (account, STATUS_AUTHORIZATION_REJECTED)
                }
                Err(error) => return Err(error.into()),
            }
        };

        if !entry.enabled {
            account.state = AccountState::Disabled;
        }

        let mut txn = self.db.transaction().await;
        txn.persist_account(account.clone());
        txn.commit();

        tracing::info!(account = %account_id, status, "Account added");
        self.mailbox
            .tell(topics::synchronization::ACCOUNT_ADDED, Payload::Account(account))?;
        Ok(Some(Payload::Text(status.to_string())))
    }

    async fn on_enabled(&self, account_id: &str) -> Result<(), GraphError> {
        let mut txn = self.db.transaction().await;
        let mut account = txn.find_account(account_id).ok_or(GraphError::MissingEntity {
            kind: "account",
            id: account_id.to_string(),
        })?;

        account.state = AccountState::Active;
        txn.persist_account(account.clone());
        refresh_account_videos(&mut txn, account_id, true);
        txn.commit();

        tracing::info!(account = %account_id, "Account enabled");
        self.mailbox
            .tell(topics::synchronization::ACCOUNT_ENABLED, Payload::Account(account))?;
        Ok(())
    }

    async fn on_disabled(&self, account_id: &str) -> Result<(), GraphError> {
        let mut txn = self.db.transaction().await;
        let mut account = txn.find_account(account_id).ok_or(GraphError::MissingEntity {
            kind: "account",
            id: account_id.to_string(),
        })?;

        account.state = AccountState::Disabled;
        txn.persist_account(account);
        refresh_account_videos(&mut txn, account_id, false);
        txn.commit();

        tracing::info!(account = %account_id, "Account disabled");
        Ok(())
    }

    async fn on_removed(&self, account_id: &str) -> Result<(), GraphError> {
        let mut txn = self.db.transaction().await;
        if txn.find_account(account_id).is_none() {
            tracing::warn!(account = %account_id, "Removed account was never persisted");
            return Ok(());
        }

        remove_account_cascade(&mut txn, account_id);
        txn.commit();

        tracing::info!(account = %account_id, "Account removed with cascade");
        Ok(())
    }
}

#[async_trait]
impl Actor for AccountsSynchronizer {
    fn name(&self) -> &'static str {
        "accounts-synchronizer"
    }

    fn topics(&self) -> &'static [&'static str] {
        &[
            topics::storage::ACCOUNT_ADDED,
            topics::storage::ACCOUNT_ENABLED,
            topics::storage::ACCOUNT_DISABLED,
            topics::storage::ACCOUNT_REMOVED,
        ]
    }

    fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    async fn handle(&self, topic: &str, data: Payload) -> Result<Option<Payload>, HandlerError> {
        let account_id = data
            .resource_id()
            .ok_or_else(|| GraphError::UnexpectedPayload {
                topic: topic.to_string(),
            })?
            .to_string();

        match topic {
            topics::storage::ACCOUNT_ADDED => Ok(self.on_added(&account_id).await?),
            topics::storage::ACCOUNT_ENABLED => {
                self.on_enabled(&account_id).await?;
                Ok(None)
            }
            topics::storage::ACCOUNT_DISABLED => {
                self.on_disabled(&account_id).await?;
                Ok(None)
            }
            topics::storage::ACCOUNT_REMOVED => {
                self.on_removed(&account_id).await?;
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::stub::{StubApi, StubIdentity};
    use crate::bus::{ActorBus, BusError, EventBus, DEFAULT_ASK_TIMEOUT};
    use crate::sync::MemorySyncStore;

    use super::*;

    struct Fixture {
        registry: ActorBus,
        asker: Mailbox,
        db: Database,
        gateway: Arc<SyncStorageGateway>,
        api: Arc<StubApi>,
    }

    async fn fixture(identity: StubIdentity) -> Fixture {
        let bus = Arc::new(EventBus::new());
        let store = Arc::new(MemorySyncStore::new());
        let gateway = SyncStorageGateway::new(store, bus.clone());
        let db = Database::new();
        let api = Arc::new(StubApi::new());

        let synchronizer = AccountsSynchronizer::new(
            db.clone(),
            gateway.clone(),
            api.clone(),
            Arc::new(identity),
        )
        .with_retry_policy(1, Duration::from_millis(1));

        let registry = ActorBus::with_bus(bus.clone());
        registry.register(Arc::new(synchronizer)).unwrap();

        let asker = Mailbox::new();
        asker.bind(bus).unwrap();

        Fixture {
            registry,
            asker,
            db,
            gateway,
            api,
        }
    }

    fn full_account(id: &str) -> Account {
        Account {
            id: id.into(),
            channel_id: Some("UC-own".into()),
            title: Some("Someone".into()),
            state: AccountState::Active,
            last_error: None,
            watch_history_playlist_id: Some("HL1".into()),
            watch_later_playlist_id: Some("WL1".into()),
        }
    }

    #[tokio::test]
    async fn test_added_persists_full_account_for_current_identity() {
        let fx = fixture(StubIdentity::signed_in("u1")).await;
        fx.api.with_account(full_account("u1"));
        fx.gateway.add_account("u1").await.unwrap();

        let completion = {
            let bus = Arc::clone(fx.registry.bus());
            tokio::spawn(async move {
                bus.await_once(topics::synchronization::ACCOUNT_ADDED, Duration::from_secs(2))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let reply = fx
            .asker
            .ask(
                topics::storage::ACCOUNT_ADDED,
                Payload::Resource { id: "u1".into() },
                DEFAULT_ASK_TIMEOUT,
            )
            .await
            .unwrap();
        assert_eq!(reply.text(), Some(STATUS_ADDED));

        let txn = fx.db.transaction().await;
        let account = txn.find_account("u1").unwrap();
        assert_eq!(account.title.as_deref(), Some("Someone"));
        assert_eq!(account.state, AccountState::Active);

        let payload = completion.await.unwrap().unwrap();
        assert!(matches!(payload, Payload::Account(a) if a.id == "u1"));
    }

    #[tokio::test]
    async fn test_added_persists_placeholder_for_foreign_identity() {
        let fx = fixture(StubIdentity::signed_in("someone-else")).await;
        fx.gateway.add_account("u1").await.unwrap();

        let reply = fx
            .asker
            .ask(
                topics::storage::ACCOUNT_ADDED,
                Payload::Resource { id: "u1".into() },
                DEFAULT_ASK_TIMEOUT,
            )
            .await
            .unwrap();
        assert_eq!(reply.text(), Some(STATUS_ADDED));

        let txn = fx.db.transaction().await;
        let account = txn.find_account("u1").unwrap();
        assert_eq!(account.state, AccountState::Unauthorized);
        assert_eq!(account.title, None);
    }

    #[tokio::test]
    async fn test_added_answers_rejection_on_authorization_failure() {
        let fx = fixture(StubIdentity::signed_in("u1")).await;
        fx.api.deny_account("u1");
        fx.gateway.add_account("u1").await.unwrap();

        let reply = fx
            .asker
            .ask(
                topics::storage::ACCOUNT_ADDED,
                Payload::Resource { id: "u1".into() },
                DEFAULT_ASK_TIMEOUT,
            )
            .await
            .unwrap();
        assert_eq!(reply.text(), Some(STATUS_AUTHORIZATION_REJECTED));

        let txn = fx.db.transaction().await;
        let account = txn.find_account("u1").unwrap();
        assert_eq!(account.state, AccountState::Unauthorized);
        assert!(account.last_error.is_some());
    }

    #[tokio::test]
    async fn test_added_applies_disabled_override() {
        let fx = fixture(StubIdentity::signed_in("u1")).await;
        fx.api.with_account(full_account("u1"));
        fx.gateway.add_account("u1").await.unwrap();
        fx.gateway.disable_accounts(&["u1".into()]).await.unwrap();

        fx.asker
            .ask(
                topics::storage::ACCOUNT_ADDED,
                Payload::Resource { id: "u1".into() },
                DEFAULT_ASK_TIMEOUT,
            )
            .await
            .unwrap();

        let txn = fx.db.transaction().await;
        assert_eq!(txn.find_account("u1").unwrap().state, AccountState::Disabled);
    }

    #[tokio::test]
    async fn test_added_ignores_stale_event() {
        let fx = fixture(StubIdentity::signed_in("u1")).await;
        // the account never made it into the synchronized store

        fx.registry
            .bus()
            .fire(
                topics::storage::ACCOUNT_ADDED,
                Payload::Resource { id: "u1".into() },
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let txn = fx.db.transaction().await;
        assert!(txn.find_account("u1").is_none());
    }

    #[tokio::test]
    async fn test_enabled_without_row_rejects() {
        let fx = fixture(StubIdentity::signed_in("u1")).await;

        let result = fx
            .asker
            .ask(
                topics::storage::ACCOUNT_ENABLED,
                Payload::Resource { id: "ghost".into() },
                Duration::from_secs(2),
            )
            .await;
        assert!(matches!(result, Err(BusError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_disabled_updates_state_and_videos() {
        let fx = fixture(StubIdentity::signed_in("u1")).await;
        {
            let mut txn = fx.db.transaction().await;
            txn.persist_account(full_account("u1"));
            txn.commit();
        }

        fx.registry
            .bus()
            .fire(
                topics::storage::ACCOUNT_DISABLED,
                Payload::Resource { id: "u1".into() },
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let txn = fx.db.transaction().await;
        assert_eq!(txn.find_account("u1").unwrap().state, AccountState::Disabled);
    }

    #[tokio::test]
    async fn test_removed_cascades() {
        let fx = fixture(StubIdentity::signed_in("u1")).await;
        {
            let mut txn = fx.db.transaction().await;
            txn.persist_account(full_account("u1"));
            txn.commit();
        }

        fx.registry
            .bus()
            .fire(
                topics::storage::ACCOUNT_REMOVED,
                Payload::Resource { id: "u1".into() },
            )
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let txn = fx.db.transaction().await;
        assert!(txn.find_account("u1").is_none());
    }
}
