//! Filter expression algebra and `$filter` compilation
//!
//! Filters are immutable trees built from lookups and combined with
//! [`and`], [`or`] and [`not`]. Combining two nodes under the same
//! connector flattens them into one group, unless one side is negated.
//! Trees are rendered into OData `$filter` syntax by [`compile_filter`],
//! which parenthesizes a child group only when its connector differs
//! from its parent's.
//!
//! # Lookup keys
//!
//! ```text
//! field                       field eq value
//! field__operator             e.g. width__gt
//! field__operator__annotation e.g. owner__eq__guid
//! ```
//!
//! Operators: `eq` (default), `ne`, `gt`, `ge`, `lt`, `le`, `in`.
//! Annotations: `guid`, `date`.
//!
//! # Examples
//!
//! ```
//! use odata_client::filter::{Q, and, not, or};
//!
//! let a = Q::lookup("a", 1).unwrap();
//! let b = Q::lookup("b", 2).unwrap();
//! let c = Q::lookup("c", 3).unwrap();
//! let filter = and(&a, &not(&or(&b, &c)));
//! assert_eq!(filter.to_string(), "a eq 1 and not (b eq 2 or c eq 3)");
//! ```

pub mod compiler;
pub mod error;
pub mod lookup;
pub mod node;

pub use compiler::{compile_filter, compile_lookup, render_value};
pub use error::FilterError;
pub use lookup::{Annotation, Lookup, Operator, Value};
pub use node::{Connector, Group, Node, Q, and, not, or};
