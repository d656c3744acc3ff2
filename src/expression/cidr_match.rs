//! Vectorized evaluation of `CIDR_MATCH(ip, cidr, ...)`.
//!
//! Each evaluation picks one of two paths. When the ip column and every cidr
//! column have a vector view, the vector path applies the predicate to every
//! position without any checks. Otherwise the block path runs, producing null
//! for any position where an operand is null or multi-valued.

use crate::block::{BlockRef, BytesRefBlock, BytesRefVector, Page};
use crate::expression::{cidr, with_release, EvalError, EvalResult};
use crate::operator::{fmt_list, DriverContext, ExpressionEvaluator, ExpressionEvaluatorFactory};
use crate::release::{close_all, Releasable, Releasables};
use log::{debug, trace};
use std::fmt;

const NAME: &str = "CidrMatchEvaluator";

/// Evaluates whether an ip operand falls in any of a list of cidr operands.
#[derive(Debug)]
pub struct CidrMatchEvaluator {
    ip: Box<dyn ExpressionEvaluator>,
    cidrs: Box<[Box<dyn ExpressionEvaluator>]>,
    context: DriverContext,
}

impl CidrMatchEvaluator {
    pub fn new(
        ip: Box<dyn ExpressionEvaluator>,
        cidrs: Vec<Box<dyn ExpressionEvaluator>>,
        context: DriverContext,
    ) -> Self {
        Self {
            ip,
            cidrs: cidrs.into_boxed_slice(),
            context,
        }
    }

    /// Block path: positions with a null or multi-valued operand are null.
    pub fn eval_block(
        &self,
        position_count: usize,
        ip_block: &BytesRefBlock,
        cidrs_blocks: &[&BytesRefBlock],
    ) -> EvalResult<BlockRef> {
        let mut result = self
            .context
            .block_factory()
            .new_boolean_block_builder(position_count);
        let mut cidrs_values: Vec<&[u8]> = Vec::with_capacity(cidrs_blocks.len());
        'position: for p in 0..position_count {
            if ip_block.is_null(p) || ip_block.get_value_count(p) != 1 {
                result.append_null();
                continue 'position;
            }
            for cidrs_block in cidrs_blocks {
                if cidrs_block.is_null(p) || cidrs_block.get_value_count(p) != 1 {
                    result.append_null();
                    continue 'position;
                }
            }
            cidrs_values.clear();
            cidrs_values.extend(
                cidrs_blocks
                    .iter()
                    .map(|block| block.get_bytes_ref(block.get_first_value_index(p))),
            );
            let ip = ip_block.get_bytes_ref(ip_block.get_first_value_index(p));
            result.append_boolean(cidr::matches(ip, &cidrs_values)?);
        }
        Ok(result.build())
    }

    /// Vector path: every operand has exactly one value at every position.
    pub fn eval_vector(
        &self,
        position_count: usize,
        ip_vector: &BytesRefVector,
        cidrs_vectors: &[BytesRefVector],
    ) -> EvalResult<BlockRef> {
        let mut result = self
            .context
            .block_factory()
            .new_boolean_vector_builder(position_count);
        let mut cidrs_values: Vec<&[u8]> = Vec::with_capacity(cidrs_vectors.len());
        for p in 0..position_count {
            cidrs_values.clear();
            cidrs_values.extend(cidrs_vectors.iter().map(|vector| vector.get_bytes_ref(p)));
            result.append_boolean(cidr::matches(ip_vector.get_bytes_ref(p), &cidrs_values)?);
        }
        Ok(result.build())
    }

    /// Evaluate the cidr operands into `cidrs_refs` and pick a path.
    ///
    /// Every reference obtained is pushed before anything can fail, so the
    /// caller releases all of them on every outcome.
    fn eval_operands(
        &self,
        page: &Page,
        ip_ref: &BlockRef,
        cidrs_refs: &mut Releasables<BlockRef>,
    ) -> EvalResult<BlockRef> {
        for cidr in self.cidrs.iter() {
            cidrs_refs.push(cidr.eval(page)?);
        }

        let position_count = page.position_count();
        let ip_block = operand_block(ip_ref, self.ip.as_ref(), position_count)?;
        let cidrs_blocks = cidrs_refs
            .iter()
            .zip(self.cidrs.iter())
            .map(|(block_ref, cidr)| operand_block(block_ref, cidr.as_ref(), position_count))
            .collect::<EvalResult<Vec<_>>>()?;

        let Some(ip_vector) = ip_block.as_vector() else {
            trace!("{}: ip is not a vector, evaluating blocks", NAME);
            return self.eval_block(position_count, ip_block, &cidrs_blocks);
        };
        let Some(cidrs_vectors) = cidrs_blocks
            .iter()
            .map(|block| block.as_vector())
            .collect::<Option<Vec<_>>>()
        else {
            trace!("{}: a cidr is not a vector, evaluating blocks", NAME);
            return self.eval_block(position_count, ip_block, &cidrs_blocks);
        };
        trace!("{}: evaluating vectors", NAME);
        self.eval_vector(position_count, &ip_vector, &cidrs_vectors)
    }
}

impl ExpressionEvaluator for CidrMatchEvaluator {
    fn eval(&self, page: &Page) -> EvalResult<BlockRef> {
        let mut ip_ref = self.ip.eval(page)?;
        let mut cidrs_refs = Releasables::with_capacity(self.cidrs.len());
        let result = self.eval_operands(page, &ip_ref, &mut cidrs_refs);
        let released = close_all([&mut ip_ref as &mut dyn Releasable, &mut cidrs_refs]);
        with_release(result, released)
    }
}

impl fmt::Display for CidrMatchEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[ip={}, cidrs=", NAME, self.ip)?;
        fmt_list(f, &self.cidrs)?;
        f.write_str("]")
    }
}

/// The byte-string block behind `block_ref`, checked against the page size.
fn operand_block<'a>(
    block_ref: &'a BlockRef,
    operand: &dyn ExpressionEvaluator,
    position_count: usize,
) -> EvalResult<&'a BytesRefBlock> {
    let block = block_ref.block().as_bytes_ref()?;
    if block.position_count() != position_count {
        return Err(EvalError::PositionCountMismatch {
            operand: operand.to_string(),
            expected: position_count,
            actual: block.position_count(),
        });
    }
    Ok(block)
}

/// Builds a [`CidrMatchEvaluator`] per driver context.
#[derive(Debug)]
pub struct CidrMatchEvaluatorFactory {
    ip: Box<dyn ExpressionEvaluatorFactory>,
    cidrs: Box<[Box<dyn ExpressionEvaluatorFactory>]>,
}

impl CidrMatchEvaluatorFactory {
    pub fn new(
        ip: Box<dyn ExpressionEvaluatorFactory>,
        cidrs: Vec<Box<dyn ExpressionEvaluatorFactory>>,
    ) -> Self {
        Self {
            ip,
            cidrs: cidrs.into_boxed_slice(),
        }
    }

    /// Create a factory for an expression declaring `declared_cidrs` cidr
    /// operands, failing if a different number of factories was supplied.
    pub fn try_new(
        ip: Box<dyn ExpressionEvaluatorFactory>,
        cidrs: Vec<Box<dyn ExpressionEvaluatorFactory>>,
        declared_cidrs: usize,
    ) -> EvalResult<Self> {
        if cidrs.len() != declared_cidrs {
            return Err(EvalError::OperandCountMismatch {
                evaluator: NAME,
                declared: declared_cidrs,
                actual: cidrs.len(),
            });
        }
        Ok(Self::new(ip, cidrs))
    }

    pub fn cidr_count(&self) -> usize {
        self.cidrs.len()
    }
}

impl ExpressionEvaluatorFactory for CidrMatchEvaluatorFactory {
    fn get(&self, context: &DriverContext) -> Box<dyn ExpressionEvaluator> {
        debug!("Creating {}", self);
        let cidrs = self.cidrs.iter().map(|cidr| cidr.get(context)).collect();
        Box::new(CidrMatchEvaluator::new(
            self.ip.get(context),
            cidrs,
            context.clone(),
        ))
    }
}

impl fmt::Display for CidrMatchEvaluatorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[ip={}, cidrs=", NAME, self.ip)?;
        fmt_list(f, &self.cidrs)?;
        f.write_str("]")
    }
}
