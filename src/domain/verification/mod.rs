//! Verification engine
//!
//! Owns the code/link verification state machine:
//!
//! ```text
//! (none) --initiate--> PENDING --correct code, before expiry--> USED (terminal)
//!            |             |--wrong code--> PENDING (counter++)
//!            |             |--expired--> EXPIRED (terminal)
//!            |             |--resend--> PENDING (new code, new expiry)
//! ```
//!
//! Account creation happens inside one transaction with the consumption
//! of the verification record; see [`engine`].

pub mod code;
pub mod engine;
pub mod reaper;
pub mod signed_token;

pub use engine::{
    InitiateRequest, SignupCompleted, VerificationEngine, VerificationSettings,
    VerificationStarted,
};
