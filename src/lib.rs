pub mod auth;
pub mod coordinator;
pub mod credential;
pub mod io;
pub mod report;
pub mod ssh;
pub mod stats;
pub mod stream;

#[cfg(test)]
pub(crate) mod mock;

pub mod prelude {
    pub use crate::auth::{Authenticator, Session, Target, Transport, TrialOutcome};
    pub use crate::coordinator::{RunSummary, TrialConfig, TrialCoordinator};
    pub use crate::credential::Credential;
    pub use crate::stream::{CredentialStream, MalformedLinePolicy};
}
