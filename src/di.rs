//! Compile-time dependency injection.
//!
//! - `FromRef<T>`: extract a value from a reference to `T`
//! - `#[derive(Context)]`: makes each field of the root context extractable
//! - `#[derive(FromContext)]`: builds a struct by extracting each field
//!
//! ```ignore
//! use crm_graph::di::FromRef;
//! use crm_graph::repositories::{ContactReadRepository, Repositories};
//!
//! let ctx = Context::connect(Config::load()?).await?;
//! let contacts = ContactReadRepository::from_ref(&ctx);
//! let repos = Repositories::from_ref(&ctx);
//! ```

/// Extracts a value from a reference to another type.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

/// Any `Clone` type can be extracted from itself.
impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

pub use crm_graph_macros::{Context, FromContext};
