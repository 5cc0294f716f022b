// OTP challenge: short-lived numeric codes gating exam access.
// The store is injected state, never a module-level global.

pub mod handlers;
pub mod service;
pub mod store;

pub use service::{OtpService, VerifyOutcome};
pub use store::{ChallengeStore, InMemoryChallengeStore, RedisChallengeStore, StoredChallenge};
