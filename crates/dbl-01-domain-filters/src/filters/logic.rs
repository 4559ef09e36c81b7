//! Boolean combinators
//!
//! - `Not`: complement of one filter
//! - `And`: stops at the first child that does not block
//! - `Or`: stops at the first child that blocks, in order
//! - `ParallelOr`: races children on the rayon pool, first block found wins

use rayon::prelude::*;

use crate::domain::{
    DecisionFor, DomainFilter, Domains, FilterNode, FilterOrigin, FilterShape, FilterValue,
    SharedFilter,
};
use crate::error::FilterError;

fn join_names<T: FilterValue + ?Sized>(op: &str, children: &[SharedFilter<T>]) -> String {
    let names: Vec<String> = children.iter().map(|c| c.name()).collect();
    format!("{op}({})", names.join(", "))
}

fn child_nodes<T: FilterValue + ?Sized>(children: &[SharedFilter<T>]) -> Vec<FilterNode> {
    children.iter().map(|c| T::into_node(c.clone())).collect()
}

// =============================================================================
// NOT
// =============================================================================

pub struct Not<T: FilterValue + ?Sized> {
    inner: SharedFilter<T>,
    origin: FilterOrigin,
}

impl<T: FilterValue + ?Sized> Not<T> {
    pub fn new(inner: SharedFilter<T>) -> Self {
        let origin = FilterOrigin::new(None, format!("not({})", inner.name()));
        Self { inner, origin }
    }
}

impl<T: FilterValue + ?Sized> DomainFilter<T> for Not<T> {
    fn is_blocked(&self, value: &T) -> DecisionFor<T> {
        let mut decision = self.inner.is_blocked(value);
        decision.blocked = !decision.blocked;
        decision.origin = self.origin.clone();
        decision
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn domains(&self) -> Result<Domains<'_, T::Owned>, FilterError> {
        Err(FilterError::NotEnumerable(self.name()))
    }

    fn name(&self) -> String {
        self.origin.name().to_string()
    }

    fn child_filters(&self) -> Vec<FilterNode> {
        vec![T::into_node(self.inner.clone())]
    }

    fn shape(&self) -> FilterShape<T> {
        FilterShape::Negation(self.inner.clone())
    }
}

// =============================================================================
// AND
// =============================================================================

pub struct And<T: FilterValue + ?Sized> {
    children: Vec<SharedFilter<T>>,
    origin: FilterOrigin,
}

impl<T: FilterValue + ?Sized> And<T> {
    pub fn new(children: Vec<SharedFilter<T>>) -> Self {
        let origin = FilterOrigin::new(None, join_names("and", &children));
        Self { children, origin }
    }
}

impl<T: FilterValue + ?Sized> DomainFilter<T> for And<T> {
    fn is_blocked(&self, value: &T) -> DecisionFor<T> {
        let mut last = None;
        for child in &self.children {
            let decision = child.is_blocked(value);
            if !decision.blocked {
                return decision;
            }
            last = Some(decision);
        }
        last.unwrap_or_else(|| {
            DecisionFor::<T>::passed(value.to_owned_value(), self.origin.clone())
        })
    }

    fn size(&self) -> usize {
        self.children.iter().map(|c| c.size()).sum()
    }

    fn domains(&self) -> Result<Domains<'_, T::Owned>, FilterError> {
        Err(FilterError::NotEnumerable(self.name()))
    }

    fn name(&self) -> String {
        self.origin.name().to_string()
    }

    fn child_filters(&self) -> Vec<FilterNode> {
        child_nodes(&self.children)
    }
}

// =============================================================================
// OR
// =============================================================================

pub struct Or<T: FilterValue + ?Sized> {
    children: Vec<SharedFilter<T>>,
    origin: FilterOrigin,
}

impl<T: FilterValue + ?Sized> Or<T> {
    pub fn new(children: Vec<SharedFilter<T>>) -> Self {
        let origin = FilterOrigin::new(None, join_names("or", &children));
        Self { children, origin }
    }
}

/// Concatenation of every child's entries.
fn chained_domains<'a, T: FilterValue + ?Sized>(
    children: &'a [SharedFilter<T>],
) -> Result<Domains<'a, T::Owned>, FilterError> {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        parts.push(child.domains()?);
    }
    Ok(Box::new(parts.into_iter().flatten()))
}

impl<T: FilterValue + ?Sized> DomainFilter<T> for Or<T> {
    fn is_blocked(&self, value: &T) -> DecisionFor<T> {
        let mut last = None;
        for child in &self.children {
            let decision = child.is_blocked(value);
            if decision.blocked {
                return decision;
            }
            last = Some(decision);
        }
        last.unwrap_or_else(|| {
            DecisionFor::<T>::passed(value.to_owned_value(), self.origin.clone())
        })
    }

    fn size(&self) -> usize {
        self.children.iter().map(|c| c.size()).sum()
    }

    fn domains(&self) -> Result<Domains<'_, T::Owned>, FilterError> {
        chained_domains(&self.children)
    }

    fn name(&self) -> String {
        self.origin.name().to_string()
    }

    fn child_filters(&self) -> Vec<FilterNode> {
        child_nodes(&self.children)
    }
}

// =============================================================================
// PARALLEL OR
// =============================================================================

/// Unordered OR. When several children block the same value, whichever
/// the pool finds first is reported.
pub struct ParallelOr<T: FilterValue + ?Sized> {
    children: Vec<SharedFilter<T>>,
    origin: FilterOrigin,
}

impl<T: FilterValue + ?Sized> ParallelOr<T> {
    pub fn new(children: Vec<SharedFilter<T>>) -> Self {
        let origin = FilterOrigin::new(None, join_names("parallel-or", &children));
        Self { children, origin }
    }
}

impl<T: FilterValue + ?Sized> DomainFilter<T> for ParallelOr<T> {
    fn is_blocked(&self, value: &T) -> DecisionFor<T> {
        self.children
            .par_iter()
            .map(|child| child.is_blocked(value))
            .find_any(|decision| decision.blocked)
            .unwrap_or_else(|| {
                DecisionFor::<T>::passed(value.to_owned_value(), self.origin.clone())
            })
    }

    fn size(&self) -> usize {
        self.children.iter().map(|c| c.size()).sum()
    }

    fn domains(&self) -> Result<Domains<'_, T::Owned>, FilterError> {
        chained_domains(&self.children)
    }

    fn name(&self) -> String {
        self.origin.name().to_string()
    }

    fn child_filters(&self) -> Vec<FilterNode> {
        child_nodes(&self.children)
    }
}
