//! Multi-valued logic: net values, guard expressions, actions and encodings.
pub mod action;
pub mod encoding;
pub mod expression;
pub mod value;

pub use action::{Assignment, Choice, Parallel};
pub use encoding::{Cube, Encoding};
pub use expression::Expression;
pub use value::Value;
