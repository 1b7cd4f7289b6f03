//! Derive macros for compile-time dependency injection in `crm-graph`.
//!
//! - `#[derive(Context)]` turns every field of a root context into a
//!   dependency that can be resolved with `FromRef`.
//! - `#[derive(FromContext)]` builds a struct (a repository, the repository
//!   aggregate) by resolving each of its fields from the context.
//!
//! Generated code refers to `crate::FromRef`, so the consuming crate must
//! expose the trait at its root.

use proc_macro::TokenStream;

mod attrs;
mod context;
mod from_context;

/// Derive macro for the root dependency context.
///
/// Generates `impl FromRef<Ctx> for FieldType` for each named field. Fields
/// marked `#[context(skip)]` are not exposed, which is needed when two fields
/// share a type.
///
/// ```ignore
/// #[derive(Context, Clone)]
/// pub struct Context {
///     pub graph: AppGraph,
///     pub config: Arc<Config>,
/// }
/// ```
#[proc_macro_derive(Context, attributes(context))]
pub fn derive_context(input: TokenStream) -> TokenStream {
    context::derive_context_impl(input)
}

/// Derive macro for types assembled from a context.
///
/// Each field is resolved with `<FieldType as FromRef<Ctx>>::from_ref(ctx)`.
/// Marker fields such as `PhantomData` take `#[from_context(default)]` and are
/// filled with `Default::default()`. The context type defaults to `Context`
/// and can be overridden with `#[from_context(Context = "path::To")]`.
///
/// ```ignore
/// #[derive(FromContext, Clone)]
/// pub struct EntityRepository<K: EntityKind> {
///     graph: AppGraph,
///     #[from_context(default)]
///     kind: PhantomData<K>,
/// }
/// ```
#[proc_macro_derive(FromContext, attributes(from_context))]
pub fn derive_from_context(input: TokenStream) -> TokenStream {
    from_context::derive_from_context_impl(input)
}
