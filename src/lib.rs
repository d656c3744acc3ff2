pub mod block;
pub mod driver;
pub mod expression;
pub mod operator;
pub mod release;
