//! Constant filters

use std::marker::PhantomData;

use crate::domain::{DecisionFor, DomainFilter, Domains, FilterOrigin, FilterShape, FilterValue};
use crate::error::FilterError;

/// A filter answering the same verdict for every value.
///
/// A list id may be attached so a constant can stand in for a list whose
/// contents are not available locally.
pub struct StaticFilter<T: ?Sized> {
    blocked: bool,
    list_id: Option<i32>,
    origin: FilterOrigin,
    _value: PhantomData<fn(&T)>,
}

impl<T: FilterValue + ?Sized> StaticFilter<T> {
    pub fn new(blocked: bool) -> Self {
        Self::with_list_id(blocked, None)
    }

    pub fn with_list_id(blocked: bool, list_id: Option<i32>) -> Self {
        Self {
            blocked,
            list_id,
            origin: FilterOrigin::new(list_id, Self::describe(blocked)),
            _value: PhantomData,
        }
    }

    pub fn always_blocked() -> Self {
        Self::new(true)
    }

    pub fn never_blocked() -> Self {
        Self::new(false)
    }

    fn describe(blocked: bool) -> String {
        format!("static({blocked})")
    }
}

impl<T: FilterValue + ?Sized> DomainFilter<T> for StaticFilter<T> {
    fn is_blocked(&self, value: &T) -> DecisionFor<T> {
        DecisionFor::<T>::new(value.to_owned_value(), self.blocked, self.origin.clone())
    }

    fn size(&self) -> usize {
        0
    }

    fn domains(&self) -> Result<Domains<'_, T::Owned>, FilterError> {
        if self.blocked {
            // "everything" has no finite enumeration
            return Err(FilterError::NotEnumerable(self.name()));
        }
        Ok(Box::new(std::iter::empty()))
    }

    fn name(&self) -> String {
        Self::describe(self.blocked)
    }

    fn list_id(&self) -> Option<i32> {
        self.list_id
    }

    fn shape(&self) -> FilterShape<T> {
        FilterShape::Constant(self.blocked)
    }
}
