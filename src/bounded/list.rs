//! Bounded sequence type

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::limits::LimitPolicy;
use crate::sizing::{values_size, Visited};
use crate::value::Value;

const TOO_LONG: &str = "this list is too long";

struct ListInner {
    data: Vec<Value>,
    approx_len: usize,
}

/// Growth-checked sequence. Cloning the handle aliases the same sequence.
#[derive(Clone)]
pub struct BoundedList {
    policy: Rc<LimitPolicy>,
    inner: Rc<RefCell<ListInner>>,
}

impl BoundedList {
    pub fn new(policy: Rc<LimitPolicy>) -> Self {
        Self::with(policy, Vec::new(), 0)
    }

    /// Wrap native data, computing the cached size in one cycle-safe pass.
    pub fn from_values(policy: Rc<LimitPolicy>, values: Vec<Value>) -> Self {
        let approx_len = values_size(&values, &mut Visited::default());
        Self::with(policy, values, approx_len)
    }

    fn with(policy: Rc<LimitPolicy>, data: Vec<Value>, approx_len: usize) -> Self {
        Self {
            policy,
            inner: Rc::new(RefCell::new(ListInner { data, approx_len })),
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

    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.borrow().data.get(index).cloned()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.inner.borrow().data.contains(value)
    }

    /// Borrowed view of the elements.
    pub fn values(&self) -> Ref<'_, [Value]> {
        Ref::map(self.inner.borrow(), |inner| inner.data.as_slice())
    }

    pub fn append(&self, value: Value) -> Result<()> {
        let projected = self.approx_len().saturating_add(1);
        self.policy.check(projected, TOO_LONG)?;
        let mut inner = self.inner.borrow_mut();
        inner.data.push(value);
        inner.approx_len += 1;
        Ok(())
    }

    pub fn extend(&self, values: &[Value]) -> Result<()> {
        let other_len = values_size(values, &mut Visited::default());
        let projected = self.approx_len().saturating_add(other_len);
        self.policy.check(projected, TOO_LONG)?;
        let mut inner = self.inner.borrow_mut();
        inner.data.extend_from_slice(values);
        inner.approx_len += other_len;
        Ok(())
    }

    /// Replicate into a new bounded list.
    ///
    /// Replication cannot remove elements, so the new cached size is
    /// assigned directly as `approx_len * n` with no recomputation.
    pub fn repeat(&self, n: usize) -> Result<BoundedList> {
        let inner = self.inner.borrow();
        let projected = inner.approx_len.saturating_mul(n);
        self.policy.check(projected, TOO_LONG)?;
        let mut data = Vec::with_capacity(inner.data.len().saturating_mul(n));
        for _ in 0..n {
            data.extend_from_slice(&inner.data);
        }
        Ok(Self::with(Rc::clone(&self.policy), data, projected))
    }

    /// Concatenate into a new bounded list.
    pub fn concat(&self, other: &BoundedList) -> Result<BoundedList> {
        let projected = self.approx_len().saturating_add(other.approx_len());
        self.policy.check(projected, TOO_LONG)?;
        let mut data = self.inner.borrow().data.clone();
        data.extend_from_slice(&other.inner.borrow().data);
        Ok(Self::from_values(Rc::clone(&self.policy), data))
    }

    /// Sub-sequence as a new bounded list. Out-of-range bounds clamp.
    pub fn slice(&self, start: usize, end: usize) -> BoundedList {
        let inner = self.inner.borrow();
        let end = end.min(inner.data.len());
        let start = start.min(end);
        Self::from_values(Rc::clone(&self.policy), inner.data[start..end].to_vec())
    }

    /// Shallow copy. Content is identical, so the cached size carries over.
    pub fn copy(&self) -> BoundedList {
        let inner = self.inner.borrow();
        Self::with(Rc::clone(&self.policy), inner.data.clone(), inner.approx_len)
    }

    pub fn pop(&self) -> Option<Value> {
        let mut inner = self.inner.borrow_mut();
        let value = inner.data.pop()?;
        inner.approx_len = inner.approx_len.saturating_sub(1);
        Some(value)
    }

    /// Remove the first element structurally equal to `value`.
    pub fn remove(&self, value: &Value) -> bool {
        let index = {
            let inner = self.inner.borrow();
            inner.data.iter().position(|item| item == value)
        };
        match index {
            Some(index) => {
                let mut inner = self.inner.borrow_mut();
                inner.data.remove(index);
                inner.approx_len = inner.approx_len.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.data.clear();
        inner.approx_len = 0;
    }
}

impl PartialEq for BoundedList {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
            || self.inner.borrow().data == other.inner.borrow().data
    }
}

impl fmt::Debug for BoundedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("BoundedList")
            .field("len", &inner.data.len())
            .field("approx_len", &inner.approx_len)
            .finish()
    }
}
