//! Bounded mapping type

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::limits::LimitPolicy;
use crate::sizing::{approx_size_of, entries_size, Visited};
use crate::value::{Key, Value};

const TOO_LARGE: &str = "this dict is too large";

struct MapInner {
    data: BTreeMap<Key, Value>,
    approx_len: usize,
}

/// Growth-checked mapping. Cloning the handle aliases the same mapping.
#[derive(Clone)]
pub struct BoundedMap {
    policy: Rc<LimitPolicy>,
    inner: Rc<RefCell<MapInner>>,
}

impl BoundedMap {
    pub fn new(policy: Rc<LimitPolicy>) -> Self {
        Self::with(policy, BTreeMap::new(), 0)
    }

    /// Wrap native entries, computing the cached size in one cycle-safe pass.
    pub fn from_entries(policy: Rc<LimitPolicy>, entries: Vec<(Key, Value)>) -> Self {
        let approx_len = entries_size(&entries, &mut Visited::default());
        Self::with(policy, entries.into_iter().collect(), approx_len)
    }

    fn with(policy: Rc<LimitPolicy>, data: BTreeMap<Key, Value>, approx_len: usize) -> Self {
        Self {
            policy,
            inner: Rc::new(RefCell::new(MapInner { data, approx_len })),
        }
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    /// Cached size estimate maintained across mutations.
    pub fn approx_len(&self) -> usize {
        self.inner.borrow().approx_len
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().data.is_empty()
    }

    pub fn get(&self, key: &Key) -> Option<Value> {
        self.inner.borrow().data.get(key).cloned()
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.inner.borrow().data.contains_key(key)
    }

    pub fn keys(&self) -> Vec<Key> {
        self.inner.borrow().data.keys().cloned().collect()
    }

    /// Borrowed view of the entries.
    pub fn entries(&self) -> Ref<'_, BTreeMap<Key, Value>> {
        Ref::map(self.inner.borrow(), |inner| &inner.data)
    }

    /// Single-key assignment.
    ///
    /// Overwriting an existing key is treated as pure addition: the new
    /// value's size is added without netting out the replaced value's.
    pub fn insert(&self, key: Key, value: Value) -> Result<()> {
        let other_len = approx_size_of(&value);
        let projected = self.approx_len().saturating_add(other_len);
        self.policy.check(projected, TOO_LARGE)?;
        let mut inner = self.inner.borrow_mut();
        inner.data.insert(key, value);
        inner.approx_len += other_len;
        Ok(())
    }

    /// Bulk update from a batch of entries.
    pub fn update(&self, entries: &[(Key, Value)]) -> Result<()> {
        let other_len = entries_size(entries, &mut Visited::default());
        let projected = self.approx_len().saturating_add(other_len);
        self.policy.check(projected, TOO_LARGE)?;
        let mut inner = self.inner.borrow_mut();
        for (key, value) in entries {
            inner.data.insert(key.clone(), value.clone());
        }
        inner.approx_len += other_len;
        Ok(())
    }

    pub fn remove(&self, key: &Key) -> Option<Value> {
        let mut inner = self.inner.borrow_mut();
        let value = inner.data.remove(key)?;
        inner.approx_len = inner.approx_len.saturating_sub(1);
        Some(value)
    }

    /// Shallow copy. Content is identical, so the cached size carries over.
    pub fn copy(&self) -> BoundedMap {
        let inner = self.inner.borrow();
        Self::with(Rc::clone(&self.policy), inner.data.clone(), inner.approx_len)
    }
}

impl PartialEq for BoundedMap {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
            || self.inner.borrow().data == other.inner.borrow().data
    }
}

impl fmt::Debug for BoundedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("BoundedMap")
            .field("len", &inner.data.len())
            .field("approx_len", &inner.approx_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounded::BoundedList;
    use crate::error::CofferError;

    fn policy(max_size: usize) -> Rc<LimitPolicy> {
        Rc::new(LimitPolicy::new(max_size))
    }

    #[test]
    fn test_insert_counts_value_size_only() {
        let map = BoundedMap::new(policy(10));
        map.insert(Key::from("key"), Value::Int(1)).unwrap();
        assert_eq!(map.approx_len(), 0);
        let list = BoundedList::from_values(policy(10), vec![Value::Int(1), Value::Int(2)]);
        map.insert(Key::Int(2), Value::List(list)).unwrap();
        assert_eq!(map.approx_len(), 2);
    }

    #[test]
    fn test_insert_over_ceiling() {
        let map = BoundedMap::new(policy(3));
        let list = BoundedList::from_values(
            policy(3),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        );
        map.insert(Key::Int(1), Value::List(list.copy())).unwrap();
        let err = map.insert(Key::Int(2), Value::List(list)).unwrap_err();
        assert!(matches!(err, CofferError::SizeLimitExceeded(_)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.approx_len(), 3);
    }

    #[test]
    fn test_overwrite_is_pure_addition() {
        let map = BoundedMap::new(policy(10));
        let a = BoundedList::from_values(policy(10), vec![Value::Int(1), Value::Int(2)]);
        let b = BoundedList::from_values(policy(10), vec![Value::Int(3), Value::Int(4)]);
        map.insert(Key::Int(0), Value::List(a)).unwrap();
        map.insert(Key::Int(0), Value::List(b)).unwrap();
        // the replaced value's size is not netted out
        assert_eq!(map.len(), 1);
        assert_eq!(map.approx_len(), 4);
    }

    #[test]
    fn test_update_batch() {
        let map = BoundedMap::new(policy(10));
        map.update(&[
            (Key::from("a"), Value::Int(1)),
            (Key::from("bc"), Value::Int(2)),
        ])
        .unwrap();
        assert_eq!(map.len(), 2);
        // 2 entries + key text sizes
        assert_eq!(map.approx_len(), 5);
    }

    #[test]
    fn test_rejected_update_leaves_map_unchanged() {
        let map = BoundedMap::from_entries(policy(4), vec![(Key::Int(1), Value::Int(1))]);
        let before = map.approx_len();
        let batch: Vec<(Key, Value)> = (0..9).map(|i| (Key::Int(i), Value::Int(i))).collect();
        assert!(map.update(&batch).is_err());
        assert_eq!(map.len(), 1);
        assert_eq!(map.approx_len(), before);
        assert_eq!(map.get(&Key::Int(1)), Some(Value::Int(1)));
    }

    #[test]
    fn test_remove_decrements_by_one() {
        let map = BoundedMap::from_entries(
            policy(10),
            vec![(Key::Int(1), Value::Int(1)), (Key::Int(2), Value::Int(2))],
        );
        assert_eq!(map.approx_len(), 2);
        assert_eq!(map.remove(&Key::Int(1)), Some(Value::Int(1)));
        assert_eq!(map.approx_len(), 1);
        assert_eq!(map.remove(&Key::Int(1)), None);
        assert_eq!(map.approx_len(), 1);
    }

    #[test]
    fn test_copy_is_independent() {
        let map = BoundedMap::from_entries(policy(10), vec![(Key::Int(1), Value::Int(1))]);
        let copy = map.copy();
        assert_eq!(copy, map);
        assert_eq!(copy.approx_len(), map.approx_len());
        copy.insert(Key::Int(2), Value::Int(2)).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_read_surface() {
        let map = BoundedMap::from_entries(
            policy(10),
            vec![(Key::from("a"), Value::Int(1)), (Key::from("b"), Value::Int(2))],
        );
        assert!(map.contains_key(&Key::from("a")));
        assert!(!map.contains_key(&Key::from("z")));
        assert_eq!(map.keys(), vec![Key::from("a"), Key::from("b")]);
        assert_eq!(map.entries().len(), 2);
    }
}
