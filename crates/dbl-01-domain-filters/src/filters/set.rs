//! In-memory set filter

use std::collections::HashSet;

use crate::domain::{DecisionFor, DomainFilter, Domains, FilterOrigin, FilterValue};
use crate::error::FilterError;

/// Exact-match filter over a hash set held in memory.
pub struct SetFilter<T: FilterValue + ?Sized> {
    list_id: Option<i32>,
    name: String,
    entries: HashSet<T::Owned>,
    origin: FilterOrigin,
}

impl<T: FilterValue + ?Sized> SetFilter<T> {
    pub fn new(list_id: Option<i32>, name: impl Into<String>, entries: HashSet<T::Owned>) -> Self {
        let name = name.into();
        Self {
            origin: FilterOrigin::new(list_id, format!("set({name})")),
            list_id,
            name,
            entries,
        }
    }

    pub fn from_entries<I, V>(list_id: Option<i32>, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<T::Owned>,
    {
        Self::new(list_id, name, entries.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, value: &T) -> bool {
        self.entries.contains(value)
    }
}

impl<T: FilterValue + ?Sized> DomainFilter<T> for SetFilter<T> {
    fn is_blocked(&self, value: &T) -> DecisionFor<T> {
        DecisionFor::<T>::new(
            value.to_owned_value(),
            self.contains(value),
            self.origin.clone(),
        )
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn domains(&self) -> Result<Domains<'_, T::Owned>, FilterError> {
        Ok(Box::new(self.entries.iter().cloned().map(Ok)))
    }

    fn name(&self) -> String {
        format!("set({})", self.name)
    }

    fn list_id(&self) -> Option<i32> {
        self.list_id
    }
}
