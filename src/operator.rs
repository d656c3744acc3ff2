//! Expression evaluation layer for operators.
//!
//! Operators evaluate expressions against pages through
//! [`ExpressionEvaluator`]s. An evaluator is bound to one [`DriverContext`]
//! and is used by one driver at a time; drivers running in parallel each get
//! their own evaluator from a shared [`ExpressionEvaluatorFactory`].

use crate::block::{BlockRef, Page};
use crate::expression::EvalResult;
use std::fmt;

pub mod driver_context;
pub mod evaluators;

pub use driver_context::DriverContext;
pub use evaluators::{
    ChannelEvaluator, ChannelEvaluatorFactory, LiteralEvaluator, LiteralEvaluatorFactory,
};

/// Evaluates an expression against pages.
pub trait ExpressionEvaluator: fmt::Display + Send {
    /// Evaluate the expression for every position of `page`.
    ///
    /// The returned reference is owned by the caller, who must release it.
    fn eval(&self, page: &Page) -> EvalResult<BlockRef>;
}

/// Builds evaluators bound to a driver context.
///
/// Factories are immutable and shared between drivers.
pub trait ExpressionEvaluatorFactory: fmt::Display + Send + Sync {
    fn get(&self, context: &DriverContext) -> Box<dyn ExpressionEvaluator>;
}

impl fmt::Debug for dyn ExpressionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Debug for dyn ExpressionEvaluatorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Write `items` as a bracketed, comma separated list.
pub(crate) fn fmt_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str("]")
}
