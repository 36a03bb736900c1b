//! Data nodes: literals, strings and arithmetic.

mod concat;
mod constant;
mod math;

pub use concat::ConcatNode;
pub use constant::ConstantNode;
pub use math::{MathNode, MathOperation};
