//! OTP issue and verification.

use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;

use crate::challenge::store::{ChallengeStore, StoredChallenge};
use crate::models::candidate::CandidateRef;
use crate::notify::{DeliveryResult, NotificationDispatcher, Outcome};
use crate::storage::StorageError;

/// Result of a verification attempt. Only `Verified` consumes the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    NoChallenge,
    Expired,
    Mismatch,
}

impl VerifyOutcome {
    pub fn verified(self) -> bool {
        matches!(self, VerifyOutcome::Verified)
    }

    pub fn reason(self) -> Option<&'static str> {
        match self {
            VerifyOutcome::Verified => None,
            VerifyOutcome::NoChallenge => Some("No code found. Request a new one."),
            VerifyOutcome::Expired => Some("Code expired. Request a new one."),
            VerifyOutcome::Mismatch => Some("Invalid code"),
        }
    }
}

pub struct OtpService {
    store: Arc<dyn ChallengeStore>,
    dispatcher: Arc<NotificationDispatcher>,
    code_length: usize,
    validity: Duration,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn ChallengeStore>,
        dispatcher: Arc<NotificationDispatcher>,
        code_length: usize,
        ttl_secs: i64,
    ) -> Self {
        Self {
            store,
            dispatcher,
            code_length,
            validity: Duration::seconds(ttl_secs),
        }
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::rng();
        (0..self.code_length)
            .map(|_| char::from(b'0' + rng.random_range(0..10)))
            .collect()
    }

    /// Issues a fresh code for the identity, overwriting any prior live code,
    /// and dispatches it in exactly one outbound message. The code is stored
    /// before dispatch: a delivery failure is reported to the caller but the
    /// challenge stays valid (fail-open toward manual retrieval).
    pub async fn request(
        &self,
        candidate: &CandidateRef,
        name: &str,
    ) -> Result<DeliveryResult, StorageError> {
        let code = self.generate_code();
        self.store
            .put(
                candidate,
                StoredChallenge {
                    code: code.clone(),
                    expires_at: Utc::now() + self.validity,
                },
            )
            .await?;

        let delivery = self
            .dispatcher
            .notify(
                candidate.as_str(),
                &Outcome::OtpCode {
                    name: name.to_string(),
                    code,
                    ttl_minutes: self.validity.num_minutes(),
                },
            )
            .await;

        Ok(delivery)
    }

    /// Single-use verification. Fails closed when no challenge exists, when
    /// the challenge has expired (evicting it), and on mismatch (challenge
    /// kept). An exact match consumes the challenge; the consume is a
    /// take-and-recheck, so racing verifies succeed at most once.
    pub async fn verify(
        &self,
        candidate: &CandidateRef,
        submitted: &str,
    ) -> Result<VerifyOutcome, StorageError> {
        let Some(entry) = self.store.get(candidate).await? else {
            return Ok(VerifyOutcome::NoChallenge);
        };

        if Utc::now() > entry.expires_at {
            self.store.take(candidate).await?;
            return Ok(VerifyOutcome::Expired);
        }

        if entry.code != submitted {
            return Ok(VerifyOutcome::Mismatch);
        }

        match self.store.take(candidate).await? {
            Some(taken) if taken.code == submitted => Ok(VerifyOutcome::Verified),
            _ => Ok(VerifyOutcome::NoChallenge),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::store::InMemoryChallengeStore;
    use crate::notify::{DisabledMailer, MailError, MailTransport};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingMailer {
        bodies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MailTransport for RecordingMailer {
        async fn send(&self, _to: &str, _subject: &str, body: &str) -> Result<(), MailError> {
            self.bodies.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    fn service(
        store: Arc<InMemoryChallengeStore>,
        transport: Arc<dyn MailTransport>,
    ) -> OtpService {
        OtpService::new(
            store,
            Arc::new(NotificationDispatcher::new(transport)),
            6,
            300,
        )
    }

    fn candidate() -> CandidateRef {
        CandidateRef::parse("a@x.com").unwrap()
    }

    async fn stored_code(store: &InMemoryChallengeStore, candidate: &CandidateRef) -> String {
        store.get(candidate).await.unwrap().unwrap().code
    }

    #[tokio::test]
    async fn test_request_stores_code_of_configured_length() {
        let store = Arc::new(InMemoryChallengeStore::new());
        let svc = service(
            store.clone(),
            Arc::new(RecordingMailer {
                bodies: Mutex::new(Vec::new()),
            }),
        );
        let delivery = svc.request(&candidate(), "Ada").await.unwrap();
        assert!(delivery.ok);
        let code = stored_code(&store, &candidate()).await;
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_request_dispatches_the_stored_code() {
        let store = Arc::new(InMemoryChallengeStore::new());
        let mailer = Arc::new(RecordingMailer {
            bodies: Mutex::new(Vec::new()),
        });
        let svc = service(store.clone(), mailer.clone());
        svc.request(&candidate(), "Ada").await.unwrap();
        let code = stored_code(&store, &candidate()).await;
        let bodies = mailer.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].contains(&code));
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_code_valid() {
        let store = Arc::new(InMemoryChallengeStore::new());
        let svc = service(store.clone(), Arc::new(DisabledMailer));
        let delivery = svc.request(&candidate(), "Ada").await.unwrap();
        assert!(!delivery.ok);
        let code = stored_code(&store, &candidate()).await;
        let outcome = svc.verify(&candidate(), &code).await.unwrap();
        assert!(outcome.verified());
    }

    #[tokio::test]
    async fn test_verify_is_single_use() {
        let store = Arc::new(InMemoryChallengeStore::new());
        let svc = service(store.clone(), Arc::new(DisabledMailer));
        svc.request(&candidate(), "Ada").await.unwrap();
        let code = stored_code(&store, &candidate()).await;

        assert_eq!(
            svc.verify(&candidate(), "000000").await.unwrap(),
            VerifyOutcome::Mismatch
        );
        assert_eq!(
            svc.verify(&candidate(), &code).await.unwrap(),
            VerifyOutcome::Verified
        );
        // The successful verify consumed the challenge.
        assert_eq!(
            svc.verify(&candidate(), &code).await.unwrap(),
            VerifyOutcome::NoChallenge
        );
    }

    #[tokio::test]
    async fn test_mismatch_does_not_consume_challenge() {
        let store = Arc::new(InMemoryChallengeStore::new());
        let svc = service(store.clone(), Arc::new(DisabledMailer));
        svc.request(&candidate(), "Ada").await.unwrap();
        let code = stored_code(&store, &candidate()).await;

        svc.verify(&candidate(), "wrong!").await.unwrap();
        assert_eq!(
            svc.verify(&candidate(), &code).await.unwrap(),
            VerifyOutcome::Verified
        );
    }

    #[tokio::test]
    async fn test_expired_challenge_fails_and_evicts() {
        let store = Arc::new(InMemoryChallengeStore::new());
        let svc = service(store.clone(), Arc::new(DisabledMailer));
        store
            .put(
                &candidate(),
                StoredChallenge {
                    code: "123456".to_string(),
                    expires_at: Utc::now() - Duration::seconds(1),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            svc.verify(&candidate(), "123456").await.unwrap(),
            VerifyOutcome::Expired
        );
        // Expiry detection evicted the entry.
        assert!(store.get(&candidate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reissue_overwrites_prior_code() {
        let store = Arc::new(InMemoryChallengeStore::new());
        let svc = service(store.clone(), Arc::new(DisabledMailer));
        svc.request(&candidate(), "Ada").await.unwrap();
        let first = stored_code(&store, &candidate()).await;
        svc.request(&candidate(), "Ada").await.unwrap();
        let second = stored_code(&store, &candidate()).await;

        // The first code is dead as soon as the second is issued, even if
        // the codes happen to collide the entry was replaced.
        let outcome = svc.verify(&candidate(), &second).await.unwrap();
        assert!(outcome.verified());
        if first != second {
            assert_eq!(
                svc.verify(&candidate(), &first).await.unwrap(),
                VerifyOutcome::NoChallenge
            );
        }
    }
}
