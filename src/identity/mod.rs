//! Operator identity, authorization directory and the session store that owns both.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod clock;
mod directory;
mod loader;
mod provider;
mod authorizer;
mod session;

pub use principal::{Identity, normalize_email};
pub use clock::{Clock, SystemClock, ManualClock};
pub use directory::{AuthDirectory, Blacklist, DirectoryDocument, WILDCARD_ENTRY};
pub use loader::{
    DirectoryError, DirectoryLoader, DirectorySettings, DirectorySource, FileDirectorySource,
    HttpDirectorySource, WildcardPolicy, decode_document,
};
pub use provider::{CacheLocation, IdentityProvider, LocalProvider, ProviderConfig, provider_instance};
pub use authorizer::{AccessState, AccessView, evaluate};
pub use session::{SessionSettings, SessionStore, SessionStoreBuilder};
