//! Lazy-stream combinators
//!
//! Cooperative transforms a consumer applies to an in-flight stream without
//! the producer's cooperation: external cancellation, narrowing filters, and
//! mapping. Cancellation is advisory: it takes effect at the next suspension
//! point the race observes, never by preempting work in progress.

use std::{future::Future, time::Duration};

use async_stream::stream;
use futures::{pin_mut, Stream, StreamExt};

/// Race `source` against a value-carrying cancellation signal.
///
/// While the signal is pending, elements pass through unchanged and the
/// source's own completion ends the stream as usual. If the signal resolves
/// first, its carried value is yielded as the final element and iteration
/// stops; the source's in-flight step is abandoned, not forcibly terminated.
/// When both are ready at a poll, the source wins.
pub fn cancelable_stream<S, F>(source: S, cancel: F) -> impl Stream<Item = S::Item>
where
    S: Stream,
    F: Future<Output = S::Item>,
{
    stream! {
        pin_mut!(source);
        pin_mut!(cancel);
        loop {
            tokio::select! {
                biased;
                item = source.next() => match item {
                    Some(value) => yield value,
                    None => break,
                },
                value = &mut cancel => {
                    yield value;
                    break;
                }
            }
        }
    }
}

/// Pass through only elements for which `filter` returns `Some`, already
/// narrowed to the output type. A rejected element is dropped and the source
/// is polled again immediately; nothing is buffered.
pub fn filter_stream<S, T, U, F>(source: S, mut filter: F) -> impl Stream<Item = U>
where
    S: Stream<Item = T>,
    F: FnMut(T) -> Option<U>,
{
    stream! {
        pin_mut!(source);
        while let Some(value) = source.next().await {
            if let Some(narrowed) = filter(value) {
                yield narrowed;
            }
        }
    }
}

/// Apply `map` to every element; completion passes through unchanged.
pub fn map_stream<S, T, U, F>(source: S, mut map: F) -> impl Stream<Item = U>
where
    S: Stream<Item = T>,
    F: FnMut(T) -> U,
{
    stream! {
        pin_mut!(source);
        while let Some(value) = source.next().await {
            yield map(value);
        }
    }
}

/// A cancellation signal that resolves with `value` once `deadline` elapses.
pub fn deadline_signal<T>(deadline: Duration, value: T) -> impl Future<Output = T> {
    async move {
        tokio::time::sleep(deadline).await;
        value
    }
}

/// A cancellation signal that never resolves.
pub fn never_signal<T>() -> impl Future<Output = T> {
    futures::future::pending()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future;

    #[tokio::test]
    async fn cancelable_passes_source_through_when_signal_pends() {
        let source = futures::stream::iter(vec![1, 2, 3]);
        let out: Vec<_> = cancelable_stream(source, never_signal()).collect().await;
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn resolved_signal_stops_iteration_with_its_value() {
        // The source never produces, so the signal wins the race and its
        // carried value is the stream's final element.
        let source = futures::stream::pending::<i32>();
        let out: Vec<_> = cancelable_stream(source, future::ready(-1)).collect().await;
        assert_eq!(out, vec![-1]);
    }

    #[tokio::test]
    async fn deadline_signal_cancels_a_stalled_source() {
        tokio::time::pause();
        let stalled = futures::stream::pending::<&str>();
        let guarded = cancelable_stream(stalled, deadline_signal(Duration::from_secs(5), "timeout"));
        let out: Vec<_> = guarded.collect().await;
        assert_eq!(out, vec!["timeout"]);
    }

    #[tokio::test]
    async fn filter_narrows_and_drops() {
        let source = futures::stream::iter(vec![Ok(1), Err("bad"), Ok(2)]);
        let out: Vec<i32> = filter_stream(source, |item| item.ok()).collect().await;
        assert_eq!(out, vec![1, 2]);
    }

    #[tokio::test]
    async fn map_transforms_every_element() {
        let source = futures::stream::iter(vec![1, 2, 3]);
        let out: Vec<_> = map_stream(source, |n| n * 10).collect().await;
        assert_eq!(out, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn combinators_compose() {
        let source = futures::stream::iter(0..6);
        let evens = filter_stream(source, |n| (n % 2 == 0).then_some(n));
        let doubled = map_stream(evens, |n| n * 2);
        let out: Vec<_> = cancelable_stream(doubled, never_signal()).collect().await;
        assert_eq!(out, vec![0, 4, 8]);
    }
}
