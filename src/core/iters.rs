//! Adaptors over sorted streams of fallible keyed items.

use crate::domain::model::Keyed;
use crate::utils::error::{KvError, Result};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::iter::Peekable;

pub fn empty<'a, T: 'a>() -> Box<dyn Iterator<Item = Result<T>> + 'a> {
    Box::new(std::iter::empty())
}

/// Yields items while their key is strictly below `bound`.
pub fn until<I, T>(iter: I, bound: Vec<u8>) -> Until<I>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
    Until {
        iter,
        bound,
        done: false,
    }
}

/// Keeps the first item of every run of equal keys.
pub fn collapse_equals<I, T>(iter: I) -> CollapseEquals<I>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
    CollapseEquals {
        iter: iter.peekable(),
    }
}

/// K-way merge of key-sorted sources. On equal keys the lower source index wins the tie.
pub fn merge<I, T>(sources: Vec<I>) -> Merge<I, T>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
    let mut merge = Merge {
        sources,
        heads: BinaryHeap::new(),
        errors: VecDeque::new(),
    };
    for source in 0..merge.sources.len() {
        merge.advance(source);
    }
    merge
}

pub struct Until<I> {
    iter: I,
    bound: Vec<u8>,
    done: bool,
}

impl<I, T> Iterator for Until<I>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.iter.next() {
            Some(Ok(item)) if item.key() < self.bound.as_slice() => Some(Ok(item)),
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

pub struct CollapseEquals<I: Iterator> {
    iter: Peekable<I>,
}

impl<I, T> Iterator for CollapseEquals<I>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self.iter.next()? {
            Ok(item) => item,
            Err(e) => return Some(Err(e)),
        };

        // Skip to the next distinct key
        loop {
            match self.iter.peek() {
                Some(Ok(next)) if next.key() == item.key() => {}
                _ => break,
            }
            self.iter.next();
        }

        Some(Ok(item))
    }
}

struct Head<T> {
    item: T,
    source: usize,
}

impl<T: Keyed> Ord for Head<T> {
    // Reversed so the max-heap pops the smallest key, then the lowest source.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .item
            .key()
            .cmp(self.item.key())
            .then_with(|| other.source.cmp(&self.source))
    }
}

impl<T: Keyed> PartialOrd for Head<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Keyed> PartialEq for Head<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Keyed> Eq for Head<T> {}

pub struct Merge<I, T> {
    sources: Vec<I>,
    heads: BinaryHeap<Head<T>>,
    errors: VecDeque<KvError>,
}

impl<I, T> Merge<I, T>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
    fn advance(&mut self, source: usize) {
        match self.sources[source].next() {
            Some(Ok(item)) => self.heads.push(Head { item, source }),
            Some(Err(e)) => self.errors.push_back(e),
            None => {}
        }
    }
}

impl<I, T> Iterator for Merge<I, T>
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.errors.pop_front() {
            return Some(Err(e));
        }

        let Head { item, source } = self.heads.pop()?;
        self.advance(source);
        Some(Ok(item))
    }
}

pub trait KeyedIterExt<T: Keyed>: Iterator<Item = Result<T>> + Sized {
    fn until(self, bound: impl Into<Vec<u8>>) -> Until<Self> {
        until(self, bound.into())
    }

    fn collapse_equals(self) -> CollapseEquals<Self> {
        collapse_equals(self)
    }
}

impl<I, T> KeyedIterExt<T> for I
where
    I: Iterator<Item = Result<T>>,
    T: Keyed,
{
}
