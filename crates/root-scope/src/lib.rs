//! Root-scoped path authorization.
//!
//! Decides, for every path a remote caller asks about, whether it lies inside the
//! allowed roots: the server's [`RootRegistry`] merged per request with any roots
//! the connected client asserts. Paths are compared in canonical form, so `..`
//! segments and symlinks cannot be used to step outside a root, and a
//! [`SensitiveExtensions`] denylist blocks key material even inside a root.

mod authorizer;
mod registry;
mod resolver;
mod root;
mod sensitive;

pub use authorizer::{AuthorizationRequest, Denial, DenialKind, ExpectedKind, PathAuthorizer};
pub use registry::RootRegistry;
pub use resolver::{
    ClientRoots, ClientRootsError, DEFAULT_CLIENT_ROOTS_TIMEOUT, EffectiveScope, RootResolver,
    client_root_from_uri,
};
pub use root::{Root, RootError, RootSource, canonicalize, expand_tilde, uri_to_path};
pub use sensitive::{DEFAULT_SENSITIVE_EXTENSIONS, SensitiveExtensions};
