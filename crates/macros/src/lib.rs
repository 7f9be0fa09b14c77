mod derive_operation;

use proc_macro::TokenStream;
use syn::parse_macro_input;

use crate::derive_operation::DeriveOperation;

/// Derives `opbind_sdk::operation::Operation`, generating the binding table.
///
/// Fields are constructor parameters in declaration order, named in
/// camelCase. `#[param(default)]`, `#[param(default = expr)]`,
/// `#[param(rename = "...")]` and `#[param(ty = "...")]` adjust a parameter.
/// Fields marked `#[setter]` are filled after construction through a
/// `set<Property>` setter instead.
#[proc_macro_derive(Operation, attributes(operation, param, setter))]
pub fn operation(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveOperation);
    TokenStream::from(input.expand())
}
