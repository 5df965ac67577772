//! Single-pass forward cursors and the iterator that drives them.
//!
//! An [`Enumerable`] is a factory: every call to
//! [`Enumerable::enumerator`] starts an independent [`Enumerator`]. The
//! enumerator itself is a plain cursor with `advance` / `current`. Most
//! callers never touch it directly and go through [`EnumIter`] instead.

use crate::error::{Error, Result};
use std::fmt;
use std::iter::FusedIterator;
use std::mem;

/// A mutable forward cursor.
///
/// `current` is only meaningful after `advance` returned `Ok(true)`. Once
/// `advance` has returned `Ok(false)` it keeps doing so.
pub trait Enumerator {
    type Item;

    fn advance(&mut self) -> Result<bool>;

    fn current(&self) -> Result<Self::Item>;
}

impl<E: Enumerator + ?Sized> Enumerator for Box<E> {
    type Item = E::Item;

    fn advance(&mut self) -> Result<bool> {
        (**self).advance()
    }

    fn current(&self) -> Result<Self::Item> {
        (**self).current()
    }
}

pub type BoxEnumerator<'a, T> = Box<dyn Enumerator<Item = T> + 'a>;

pub trait Enumerable {
    type Item;
    type Enumerator<'a>: Enumerator<Item = Self::Item>
    where
        Self: 'a;

    fn enumerator(&self) -> Result<Self::Enumerator<'_>>;

    fn iter(&self) -> Result<EnumIter<Self::Enumerator<'_>>> {
        EnumIter::new(self.enumerator()?)
    }

    fn collect_vec(&self) -> Result<Vec<Self::Item>> {
        self.iter()?.collect()
    }
}

enum Slot<T> {
    Item(T),
    Failed(Error),
    End,
}

/// Drives an [`Enumerator`] as an [`Iterator`].
///
/// The first element is fetched when the iterator is built, so
/// [`EnumIter::is_end`] is accurate right away. A failure while fetching
/// the element after the one just returned is reported by the following
/// `next` call, after which the iterator is finished.
pub struct EnumIter<E: Enumerator> {
    enumerator: E,
    slot: Slot<E::Item>,
}

impl<E: Enumerator> EnumIter<E> {
    pub fn new(enumerator: E) -> Result<Self> {
        let mut iter = Self {
            enumerator,
            slot: Slot::End,
        };
        match iter.fetch() {
            Slot::Failed(err) => Err(err),
            slot => {
                iter.slot = slot;
                Ok(iter)
            }
        }
    }

    fn fetch(&mut self) -> Slot<E::Item> {
        match self.enumerator.advance() {
            Ok(true) => match self.enumerator.current() {
                Ok(item) => Slot::Item(item),
                Err(err) => Slot::Failed(err),
            },
            Ok(false) => Slot::End,
            Err(err) => Slot::Failed(err),
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self.slot, Slot::End)
    }

    pub fn peek(&self) -> Option<&E::Item> {
        match &self.slot {
            Slot::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_inner(self) -> E {
        self.enumerator
    }
}

impl<E: Enumerator> Iterator for EnumIter<E> {
    type Item = Result<E::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        match mem::replace(&mut self.slot, Slot::End) {
            Slot::Item(item) => {
                self.slot = self.fetch();
                Some(Ok(item))
            }
            Slot::Failed(err) => Some(Err(err)),
            Slot::End => None,
        }
    }
}

impl<E: Enumerator> FusedIterator for EnumIter<E> {}

impl<E: Enumerator> fmt::Debug for EnumIter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.slot {
            Slot::Item(_) => "positioned",
            Slot::Failed(_) => "failed",
            Slot::End => "end",
        };
        f.debug_struct("EnumIter").field("state", &state).finish()
    }
}

/// The protocol over elements that already live in memory.
#[derive(Debug, Clone, Copy)]
pub struct ContainerEnumerable<'c, T> {
    items: &'c [T],
}

impl<'c, T> ContainerEnumerable<'c, T> {
    pub fn new(items: &'c [T]) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'c, T> From<&'c [T]> for ContainerEnumerable<'c, T> {
    fn from(items: &'c [T]) -> Self {
        Self::new(items)
    }
}

impl<'c, T> From<&'c Vec<T>> for ContainerEnumerable<'c, T> {
    fn from(items: &'c Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<'c, T: Clone> Enumerable for ContainerEnumerable<'c, T> {
    type Item = T;
    type Enumerator<'a>
        = SliceEnumerator<'c, T>
    where
        Self: 'a;

    fn enumerator(&self) -> Result<Self::Enumerator<'_>> {
        Ok(SliceEnumerator::new(self.items))
    }
}

#[derive(Debug)]
pub struct SliceEnumerator<'c, T> {
    items: &'c [T],
    next: usize,
    current: Option<usize>,
}

impl<'c, T> SliceEnumerator<'c, T> {
    pub fn new(items: &'c [T]) -> Self {
        Self {
            items,
            next: 0,
            current: None,
        }
    }
}

impl<T: Clone> Enumerator for SliceEnumerator<'_, T> {
    type Item = T;

    fn advance(&mut self) -> Result<bool> {
        if self.next < self.items.len() {
            self.current = Some(self.next);
            self.next += 1;
            Ok(true)
        } else {
            self.current = None;
            self.next = self.items.len();
            Ok(false)
        }
    }

    fn current(&self) -> Result<T> {
        self.current
            .and_then(|index| self.items.get(index))
            .cloned()
            .ok_or(Error::NotPositioned)
    }
}
