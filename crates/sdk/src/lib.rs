//! # opbind SDK
//!
//! Typed CQRS operations bound from untyped HTTP input.
//!
//! ## Overview
//!
//! An API route maps to a business operation (a command or a query). This
//! crate turns the request's path variables and filters into that
//! operation:
//!
//! 1. Each operation declares its binding table (via `#[derive(Operation)]`)
//! 2. The [`Binder`](binder::Binder) fills constructor parameters from an
//!    [`InputBag`](bag::InputBag), converting values through an ordered
//!    [`ConverterRegistry`](converter::ConverterRegistry)
//! 3. Leftover values are applied through setters, or dropped
//! 4. The [`OperationBus`](bus::OperationBus) dispatches the operation to
//!    its handler and the [`OperationProvider`](provider::OperationProvider)
//!    reshapes the result for the API
//!
//! ## Example
//!
//! ```rust,ignore
//! use opbind_sdk::prelude::*;
//! use serde::Serialize;
//!
//! /// Gets attribute for editing.
//! #[derive(Operation)]
//! #[operation(query, domain = "AttributeGroup")]
//! pub struct GetAttributeForEditing {
//!     attribute_id: i64,
//! }
//!
//! #[derive(Serialize)]
//! pub struct EditableAttribute {
//!     attribute_id: i64,
//!     color: String,
//! }
//!
//! struct GetAttributeForEditingHandler;
//!
//! impl Handler<GetAttributeForEditing> for GetAttributeForEditingHandler {
//!     type Output = EditableAttribute;
//!
//!     async fn handle(&self, query: GetAttributeForEditing) -> Result<EditableAttribute, OperationError> {
//!         Ok(EditableAttribute {
//!             attribute_id: query.attribute_id,
//!             color: "#ff0000".to_string(),
//!         })
//!     }
//! }
//!
//! let provider = OperationProvider::new(
//!     Arc::new(ConverterRegistry::with_defaults()),
//!     Arc::new(OperationBus::new().with::<GetAttributeForEditing, _>(GetAttributeForEditingHandler)),
//! );
//!
//! let attribute: serde_json::Value = provider
//!     .provide::<GetAttributeForEditing, _, _, _, _, _>([("attributeId", "5")], [])
//!     .await?;
//! ```

pub use opbind_sdk_macros::Operation;

// Lets the derive's `::opbind_sdk` paths resolve in this crate's tests.
extern crate self as opbind_sdk;

pub mod bag;
pub mod binder;
pub mod bus;
pub mod catalog;
pub mod converter;
pub mod error;
pub mod operation;
pub mod provider;
pub mod value;

pub mod prelude {
    pub use crate::bag::*;
    pub use crate::binder::*;
    pub use crate::bus::*;
    pub use crate::catalog::*;
    pub use crate::converter::*;
    pub use crate::error::*;
    pub use crate::operation::*;
    pub use crate::provider::*;
    pub use crate::value::*;
    pub use opbind_sdk_macros::Operation;
}

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
