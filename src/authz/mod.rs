//! Authorization module - scope registry, verifier and route guard
//!
//! Every protected route:
//! - extracts a [`Requester`] from the `requesting_uuid` (or legacy `api_key`) header, 401 when absent
//! - resolves the requester's scopes from its active roles
//! - asks the [`PolicyEvaluator`] whether any acceptable scope is held, 403 when not
//!
//! The `admin` scope satisfies every non-empty check.

mod evaluator;
mod guard;
mod principal;
pub mod scopes;

pub use evaluator::{DefaultPolicyEvaluator, PolicyEvaluator};
pub use guard::{authorize, resolve, verify, Requester, API_KEY_HEADER, REQUESTING_UUID_HEADER};
pub use principal::{Identity, Principal};
pub use scopes::{Scope, ScopeArea, ScopeDefinition, ScopeSet, REGISTRY};
