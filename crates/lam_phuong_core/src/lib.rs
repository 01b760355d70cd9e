pub mod cache;
pub mod clock;
pub mod domain;
pub mod guard;
pub mod memory;
pub mod ports;
pub mod resources;
pub mod session;
pub mod session_store;
pub mod validation;

pub use cache::{LocalResponseCache, CACHE_SCHEMA_VERSION};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{Credentials, ResourceKind, Session, SignInResponse, User};
pub use guard::{AuthRoutes, EdgeGate, GateDecision, GatePolicy, GuardOutcome, Location, RouteGuard};
pub use memory::{MemoryStore, RecordingNavigator};
pub use ports::{
    AuthApi, KeyValueStore, Navigation, NavigationMode, Navigator, PortError, PortResult,
    ResourceApi,
};
pub use resources::{ResourceLoader, TokenRejected};
pub use session::{AuthError, AuthSessionManager, AuthState, SessionStatus};
pub use session_store::{ChannelPresence, SessionChannel, TokenUserStore};
pub use validation::{validate_credentials, ValidationErrors};
