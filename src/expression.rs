//! Expression evaluation for query execution.
//!
//! This module provides:
//! - The scalar CIDR predicate and IP address encoding
//! - The vectorized `CIDR_MATCH` evaluator and its per-driver factory
//! - Error types shared by all evaluators

pub mod cidr;
pub mod cidr_match;
pub mod error;

pub use cidr::{encode_ip, parse_ip, Cidr};
pub use cidr_match::{CidrMatchEvaluator, CidrMatchEvaluatorFactory};
pub use error::{CidrError, EvalError, EvalResult};

pub(crate) use error::with_release;
