//! Bounded set type

use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::limits::LimitPolicy;
use crate::sizing::keys_size;
use crate::value::Key;

const TOO_LARGE: &str = "this set is too large";

struct SetInner {
    data: BTreeSet<Key>,
    approx_len: usize,
}

/// Growth-checked set. Cloning the handle aliases the same set.
#[derive(Clone)]
pub struct BoundedSet {
    policy: Rc<LimitPolicy>,
    inner: Rc<RefCell<SetInner>>,
}

impl BoundedSet {
    pub fn new(policy: Rc<LimitPolicy>) -> Self {
        Self::with(policy, BTreeSet::new(), 0)
    }

    /// Wrap native members. Duplicates collapse before the size is taken.
    pub fn from_keys(policy: Rc<LimitPolicy>, keys: Vec<Key>) -> Self {
        let data: BTreeSet<Key> = keys.into_iter().collect();
        let approx_len = data.len() + data.iter().map(Key::approx_size).sum::<usize>();
        Self::with(policy, data, approx_len)
    }

    fn with(policy: Rc<LimitPolicy>, data: BTreeSet<Key>, approx_len: usize) -> Self {
        Self {
            policy,
            inner: Rc::new(RefCell::new(SetInner { data, approx_len })),
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

    pub fn contains(&self, key: &Key) -> bool {
        self.inner.borrow().data.contains(key)
    }

    /// Borrowed view of the members.
    pub fn members(&self) -> Ref<'_, BTreeSet<Key>> {
        Ref::map(self.inner.borrow(), |inner| &inner.data)
    }

    /// Add one member. An already-present member still counts toward the
    /// cached size; the estimate only ever overshoots.
    pub fn add(&self, key: Key) -> Result<()> {
        let projected = self.approx_len().saturating_add(1);
        self.policy.check(projected, TOO_LARGE)?;
        let mut inner = self.inner.borrow_mut();
        inner.data.insert(key);
        inner.approx_len += 1;
        Ok(())
    }

    /// Bulk update from argument batches.
    ///
    /// The delta is the summed estimate of every batch, overlap with
    /// existing members included.
    pub fn update(&self, batches: &[&[Key]]) -> Result<()> {
        let other_len: usize = batches.iter().map(|keys| keys_size(keys)).sum();
        let projected = self.approx_len().saturating_add(other_len);
        self.policy.check(projected, TOO_LARGE)?;
        let mut inner = self.inner.borrow_mut();
        for batch in batches {
            for key in *batch {
                inner.data.insert(key.clone());
            }
        }
        inner.approx_len += other_len;
        Ok(())
    }

    /// Union into a new bounded set; `self` is never mutated.
    ///
    /// The check runs before the union is materialized, so a rejection
    /// produces no new set at all.
    pub fn union(&self, batches: &[&[Key]]) -> Result<BoundedSet> {
        let other_len: usize = batches.iter().map(|keys| keys_size(keys)).sum();
        let projected = self.approx_len().saturating_add(other_len);
        self.policy.check(projected, TOO_LARGE)?;
        let mut data = self.inner.borrow().data.clone();
        for batch in batches {
            for key in *batch {
                data.insert(key.clone());
            }
        }
        Ok(Self::from_keys(
            Rc::clone(&self.policy),
            data.into_iter().collect(),
        ))
    }

    /// Remove and return the first member.
    pub fn pop(&self) -> Option<Key> {
        let mut inner = self.inner.borrow_mut();
        let key = inner.data.pop_first()?;
        inner.approx_len = inner.approx_len.saturating_sub(1);
        Some(key)
    }

    /// Remove a member; reports whether it was present.
    pub fn remove(&self, key: &Key) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.data.remove(key) {
            inner.approx_len = inner.approx_len.saturating_sub(1);
            true
        } else {
            false
        }
    }

    /// Remove a member if present.
    pub fn discard(&self, key: &Key) {
        self.remove(key);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.data.clear();
        inner.approx_len = 0;
    }

    /// Shallow copy. Content is identical, so the cached size carries over.
    pub fn copy(&self) -> BoundedSet {
        let inner = self.inner.borrow();
        Self::with(Rc::clone(&self.policy), inner.data.clone(), inner.approx_len)
    }
}

impl PartialEq for BoundedSet {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
            || self.inner.borrow().data == other.inner.borrow().data
    }
}

impl fmt::Debug for BoundedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("BoundedSet")
            .field("len", &inner.data.len())
            .field("approx_len", &inner.approx_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CofferError;

    fn policy(max_size: usize) -> Rc<LimitPolicy> {
        Rc::new(LimitPolicy::new(max_size))
    }

    #[test]
    fn test_add_up_to_ceiling() {
        let set = BoundedSet::new(policy(3));
        for i in 0..3 {
            set.add(Key::Int(i)).unwrap();
        }
        let err = set.add(Key::Int(3)).unwrap_err();
        assert!(matches!(err, CofferError::SizeLimitExceeded(_)));
        assert_eq!(set.len(), 3);
        assert_eq!(set.approx_len(), 3);
    }

    #[test]
    fn test_duplicate_add_still_counts() {
        let set = BoundedSet::new(policy(3));
        set.add(Key::Int(1)).unwrap();
        set.add(Key::Int(1)).unwrap();
        set.add(Key::Int(1)).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.approx_len(), 3);
        assert!(set.add(Key::Int(1)).is_err());
    }

    #[test]
    fn test_from_keys_collapses_duplicates() {
        let set = BoundedSet::from_keys(
            policy(10),
            vec![Key::Int(1), Key::Int(1), Key::from("ab")],
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.approx_len(), 4);
    }

    #[test]
    fn test_update_sums_batch_estimates() {
        let set = BoundedSet::new(policy(10));
        set.update(&[&[Key::Int(1), Key::Int(2)], &[Key::Int(2), Key::Int(3)]])
            .unwrap();
        assert_eq!(set.len(), 3);
        // overlap between batches is not netted out
        assert_eq!(set.approx_len(), 4);
    }

    #[test]
    fn test_rejected_update_leaves_set_unchanged() {
        let set = BoundedSet::from_keys(policy(4), vec![Key::Int(1)]);
        let batch: Vec<Key> = (0..9).map(Key::Int).collect();
        assert!(set.update(&[&batch]).is_err());
        assert_eq!(set.len(), 1);
        assert_eq!(set.approx_len(), 1);
    }

    #[test]
    fn test_union_builds_new_set() {
        let set = BoundedSet::from_keys(policy(10), vec![Key::Int(1), Key::Int(2)]);
        let union = set.union(&[&[Key::Int(2), Key::Int(3)]]).unwrap();
        assert_eq!(union.len(), 3);
        assert_eq!(union.approx_len(), 3);
        // the original is untouched
        assert_eq!(set.len(), 2);
        assert_eq!(set.approx_len(), 2);
    }

    #[test]
    fn test_rejected_union_produces_nothing() {
        let set = BoundedSet::from_keys(policy(4), vec![Key::Int(1), Key::Int(2)]);
        let batch: Vec<Key> = (10..15).map(Key::Int).collect();
        let err = set.union(&[&batch]).unwrap_err();
        assert!(matches!(err, CofferError::SizeLimitExceeded(_)));
        assert_eq!(set.len(), 2);
        assert_eq!(set.approx_len(), 2);
    }

    #[test]
    fn test_shrinking_updates_cache() {
        let set = BoundedSet::from_keys(policy(10), vec![Key::Int(1), Key::Int(2), Key::Int(3)]);
        assert_eq!(set.pop(), Some(Key::Int(1)));
        assert_eq!(set.approx_len(), 2);
        assert!(set.remove(&Key::Int(2)));
        assert_eq!(set.approx_len(), 1);
        assert!(!set.remove(&Key::Int(99)));
        assert_eq!(set.approx_len(), 1);
        set.discard(&Key::Int(3));
        assert_eq!(set.approx_len(), 0);
        set.discard(&Key::Int(3));
        assert_eq!(set.approx_len(), 0);
        assert_eq!(set.pop(), None);
    }

    #[test]
    fn test_copy_is_independent() {
        let set = BoundedSet::from_keys(policy(10), vec![Key::Int(1)]);
        let copy = set.copy();
        assert_eq!(copy, set);
        copy.add(Key::Int(2)).unwrap();
        assert_eq!(set.len(), 1);
    }
}
