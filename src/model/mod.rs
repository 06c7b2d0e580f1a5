//! Instance tree and evaluation value types

pub mod node;
pub mod types;
pub mod value;

pub use node::{PrimitiveValue, ResourceNode};
pub use types::LiteralKind;
pub use value::{Collection, Value, display_collection};
