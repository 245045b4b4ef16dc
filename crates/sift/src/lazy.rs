//! Lazy, chunked, and short-circuiting drivers.
//!
//! Every driver here shares one [`CompiledPredicate`] and differs only in
//! how it walks the source. Lazy drivers pull from their source on demand,
//! consume it exactly once, and stop as soon as the caller stops asking.
//! Ordering and limits need the full result and are not applied here.

use std::borrow::Borrow;
use std::future;
use std::iter::FusedIterator;

use futures_util::{Stream, StreamExt};

use crate::compile::CompiledPredicate;
use crate::error::{FilterError, Result};

/// Rejects zero sizes and counts before any traversal starts.
pub fn ensure_positive(argument: &str, n: usize) -> Result<()> {
    if n == 0 {
        return Err(FilterError::validation(
            argument,
            format!("{} must be a positive integer, got 0", argument),
        ));
    }
    Ok(())
}

/// Iterator over the items of a source that pass a predicate.
///
/// Items may be owned records or anything that borrows as one (`&T`,
/// `Box<T>`, ...).
pub struct FilterIter<I, T> {
    source: I,
    predicate: CompiledPredicate<T>,
}

impl<I, T> FilterIter<I, T> {
    pub fn new(source: I, predicate: CompiledPredicate<T>) -> Self {
        FilterIter { source, predicate }
    }
}

impl<I, T> Iterator for FilterIter<I, T>
where
    I: Iterator,
    I::Item: Borrow<T>,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        let predicate = &self.predicate;
        self.source.find(|item| predicate.test(item.borrow()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.source.size_hint().1)
    }
}

impl<I, T> FusedIterator for FilterIter<I, T>
where
    I: FusedIterator,
    I::Item: Borrow<T>,
{
}

/// Iterator yielding matches in batches of `size` as soon as each fills.
///
/// The final batch may be shorter; an empty batch is never yielded.
pub struct ChunkIter<I, T> {
    inner: FilterIter<I, T>,
    size: usize,
    done: bool,
}

impl<I, T> ChunkIter<I, T> {
    pub fn new(source: I, predicate: CompiledPredicate<T>, size: usize) -> Result<Self> {
        ensure_positive("chunk_size", size)?;
        Ok(ChunkIter {
            inner: FilterIter::new(source, predicate),
            size,
            done: false,
        })
    }
}

impl<I, T> Iterator for ChunkIter<I, T>
where
    I: Iterator,
    I::Item: Borrow<T>,
{
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Vec<I::Item>> {
        if self.done {
            return None;
        }
        let mut batch = Vec::with_capacity(self.size);
        while batch.len() < self.size {
            match self.inner.next() {
                Some(item) => batch.push(item),
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        (!batch.is_empty()).then_some(batch)
    }
}

/// Filters an asynchronous source.
///
/// Awaiting the next source element is the only suspension point; the
/// predicate itself runs synchronously.
pub fn filter_stream<S, T>(source: S, predicate: CompiledPredicate<T>) -> impl Stream<Item = S::Item>
where
    S: Stream,
    S::Item: Borrow<T>,
{
    source.filter(move |item| future::ready(predicate.test(item.borrow())))
}

/// Collects every match of `items` into batches of `size`.
pub fn chunked<'a, T>(items: &'a [T], predicate: &CompiledPredicate<T>, size: usize) -> Result<Vec<Vec<&'a T>>> {
    Ok(ChunkIter::new(items.iter(), predicate.clone(), size)?.collect())
}

/// The first `n` matches, stopping the traversal once they are found.
pub fn first<'a, T>(items: &'a [T], predicate: &CompiledPredicate<T>, n: usize) -> Result<Vec<&'a T>> {
    ensure_positive("count", n)?;
    Ok(FilterIter::new(items.iter(), predicate.clone()).take(n).collect())
}

/// Whether any item matches, stopping at the first match.
pub fn exists<T>(items: &[T], predicate: &CompiledPredicate<T>) -> bool {
    items.iter().any(|item| predicate.test(item))
}

/// The exact number of matches. Always visits every item.
pub fn count<T>(items: &[T], predicate: &CompiledPredicate<T>) -> usize {
    items.iter().filter(|item| predicate.test(item)).count()
}
