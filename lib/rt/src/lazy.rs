use crate::enumerate::{Enumerable, Enumerator};
use crate::error::{Error, Result};
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// A fixed-size sequence whose elements are loaded on access.
///
/// Nothing is cached: every [`get`](Self::get) and every step of every
/// iteration calls the loader again. Pages, subfiles and bookmarks are
/// exposed this way, with the loader crossing into the engine.
pub struct IndexedLazySequence<T, F> {
    len: usize,
    load: F,
    _item: PhantomData<fn() -> T>,
}

impl<T, F> IndexedLazySequence<T, F>
where
    F: Fn(usize) -> Result<T>,
{
    pub fn new(len: usize, load: F) -> Self {
        Self {
            len,
            load,
            _item: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(Error::OutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                len: self.len,
            });
        }
        (self.load)(index)
    }

    /// [`get`](Self::get) for signed indices coming from the engine.
    pub fn get_checked(&self, index: i64) -> Result<T> {
        match usize::try_from(index) {
            Ok(index) => self.get(index),
            Err(_) => Err(Error::OutOfRange {
                index,
                len: self.len,
            }),
        }
    }

    pub fn iter(&self) -> LazyIter<'_, T, F> {
        LazyIter {
            seq: self,
            front: 0,
        }
    }
}

impl<T, F> fmt::Debug for IndexedLazySequence<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedLazySequence")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<'s, T, F> IntoIterator for &'s IndexedLazySequence<T, F>
where
    F: Fn(usize) -> Result<T>,
{
    type Item = Result<T>;
    type IntoIter = LazyIter<'s, T, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending pass over an [`IndexedLazySequence`].
pub struct LazyIter<'s, T, F> {
    seq: &'s IndexedLazySequence<T, F>,
    front: usize,
}

impl<T, F> Iterator for LazyIter<'_, T, F>
where
    F: Fn(usize) -> Result<T>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.seq.len {
            return None;
        }
        let index = self.front;
        self.front += 1;
        Some(self.seq.get(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.seq.len.saturating_sub(self.front);
        (remaining, Some(remaining))
    }
}

impl<T, F> ExactSizeIterator for LazyIter<'_, T, F> where F: Fn(usize) -> Result<T> {}

impl<T, F> FusedIterator for LazyIter<'_, T, F> where F: Fn(usize) -> Result<T> {}

pub struct LazyEnumerator<'s, T, F> {
    seq: &'s IndexedLazySequence<T, F>,
    position: Option<usize>,
}

impl<T, F> Enumerator for LazyEnumerator<'_, T, F>
where
    F: Fn(usize) -> Result<T>,
{
    type Item = T;

    fn advance(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p.saturating_add(1));
        self.position = Some(next.min(self.seq.len));
        Ok(next < self.seq.len)
    }

    fn current(&self) -> Result<T> {
        match self.position {
            Some(index) if index < self.seq.len => self.seq.get(index),
            _ => Err(Error::NotPositioned),
        }
    }
}

impl<T, F> Enumerable for IndexedLazySequence<T, F>
where
    F: Fn(usize) -> Result<T>,
{
    type Item = T;
    type Enumerator<'a>
        = LazyEnumerator<'a, T, F>
    where
        Self: 'a;

    fn enumerator(&self) -> Result<Self::Enumerator<'_>> {
        Ok(LazyEnumerator {
            seq: self,
            position: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    #[test]
    fn bounds_are_checked() {
        let seq = IndexedLazySequence::new(3, |i| Ok(i * 10));
        assert_eq!(seq.get(0).ok(), Some(0));
        assert_eq!(seq.get(2).ok(), Some(20));
        assert!(matches!(
            seq.get(3),
            Err(Error::OutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            seq.get(4),
            Err(Error::OutOfRange { index: 4, len: 3 })
        ));
        assert!(matches!(
            seq.get_checked(-1),
            Err(Error::OutOfRange { index: -1, len: 3 })
        ));
        assert_eq!(seq.get_checked(1).ok(), Some(10));
    }

    #[test]
    fn every_access_loads() -> anyhow::Result<()> {
        let calls = Cell::new(0);
        let seq = IndexedLazySequence::new(4, |i| {
            calls.set(calls.get() + 1);
            Ok(i)
        });
        assert_eq!(calls.get(), 0);

        seq.get(1)?;
        seq.get(1)?;
        assert_eq!(calls.get(), 2);

        let first: Vec<usize> = seq.iter().collect::<Result<_>>()?;
        let second: Vec<usize> = seq.iter().collect::<Result<_>>()?;
        assert_eq!(first, vec![0, 1, 2, 3]);
        assert_eq!(first, second);
        assert_eq!(calls.get(), 10);
        Ok(())
    }

    #[test]
    fn out_of_range_never_loads() {
        let seq = IndexedLazySequence::new(0, |_| -> Result<u8> {
            panic!("loader must not run")
        });
        assert!(seq.is_empty());
        assert!(seq.get(0).is_err());
        assert_eq!(seq.iter().len(), 0);
    }

    #[test]
    fn load_errors_propagate() {
        let seq = IndexedLazySequence::new(2, |i| {
            if i == 1 {
                Err(Error::InvalidArgument("page 1 is damaged"))
            } else {
                Ok(i)
            }
        });
        let results: Vec<_> = (&seq).into_iter().collect();
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn exact_size() {
        let seq = IndexedLazySequence::new(5, Ok);
        let mut iter = seq.iter();
        assert_eq!(iter.len(), 5);
        iter.next();
        assert_eq!(iter.len(), 4);
    }

    #[test]
    fn enumerable_view() -> anyhow::Result<()> {
        let seq = IndexedLazySequence::new(3, |i| Ok(format!("page {i}")));
        assert_eq!(seq.collect_vec()?, vec!["page 0", "page 1", "page 2"]);

        let mut cursor = seq.enumerator()?;
        assert!(matches!(cursor.current(), Err(Error::NotPositioned)));
        assert!(cursor.advance()?);
        assert_eq!(cursor.current()?, "page 0");
        assert!(cursor.advance()?);
        assert!(cursor.advance()?);
        assert!(!cursor.advance()?);
        assert!(!cursor.advance()?);
        assert!(matches!(cursor.current(), Err(Error::NotPositioned)));
        Ok(())
    }
}
