//! Cancellation and deadlines.
//!
//! The resolver checks its context before every fetch and races each fetch
//! against it, so even a source that never answers cannot hold a
//! resolution past its deadline.

use std::sync::Arc;
use std::time::Duration;

use dagpath_resolver::{ResolveError, Resolver};
use dagpath_tests::{CountingSource, HangingSource, chain, store};
use dagpath_types::{
    BlockError, BlockSource, BoxFuture, CancellationToken, Codec, ContentAddress, HashFn,
    ResolveContext,
};

fn some_address() -> ContentAddress {
    ContentAddress::compute(Codec::DagNode, HashFn::Blake3, b"somewhere")
}

#[tokio::test]
async fn cancelled_before_start_fetches_nothing() {
    let (store, b) = store();
    let links = chain(&b, 3);
    let source = Arc::new(CountingSource::new(store));
    let resolver = Resolver::new(source.clone());

    let token = CancellationToken::new();
    token.cancel();
    let ctx = ResolveContext::background().with_cancellation(token);

    let err = resolver
        .resolve_path(&ctx, &links[0].address, &["next", "next"])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled { .. }));
    assert_eq!(err.address(), Some(&links[0].address));
    assert!(err.consumed().is_empty());
    assert_eq!(source.total(), 0);
}

#[tokio::test]
async fn cancelled_before_start_even_with_no_segments() {
    let (store, _b) = store();
    let resolver = Resolver::new(store);
    let token = CancellationToken::new();
    token.cancel();
    let ctx = ResolveContext::background().with_cancellation(token);

    let err = resolver
        .resolve_to_last_node(&ctx, &some_address(), &[] as &[&str])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled { .. }));
}

/// Answers fetches from `inner`, then cancels `token`.
struct CancelAfterFetch<S> {
    inner: S,
    token: CancellationToken,
}

impl<S: BlockSource> BlockSource for CancelAfterFetch<S> {
    fn get<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        address: &'a ContentAddress,
    ) -> BoxFuture<'a, Result<Vec<u8>, BlockError>> {
        Box::pin(async move {
            let block = self.inner.get(ctx, address).await;
            self.token.cancel();
            block
        })
    }
}

#[tokio::test]
async fn cancelled_between_fetches_stops_before_the_next() {
    let (store, b) = store();
    let links = chain(&b, 3);
    let token = CancellationToken::new();
    let source = Arc::new(CountingSource::new(CancelAfterFetch {
        inner: store,
        token: token.clone(),
    }));
    let resolver = Resolver::new(source.clone());
    let ctx = ResolveContext::background().with_cancellation(token);

    let err = resolver
        .resolve_path(&ctx, &links[0].address, &["next", "next"])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled { .. }), "got {err:?}");
    assert_eq!(err.consumed(), ["next"]);
    assert_eq!(err.address(), Some(&links[1].address));
    assert_eq!(source.total(), 1);
}

#[tokio::test(start_paused = true)]
async fn deadline_interrupts_hanging_fetch() {
    let resolver = Resolver::new(HangingSource);
    let ctx = ResolveContext::background().with_timeout(Duration::from_millis(50));

    let err = resolver
        .resolve_path(&ctx, &some_address(), &["a", "b"])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::DeadlineExceeded { .. }));
    assert_eq!(err.address(), Some(&some_address()));
    assert!(err.is_transient());
}

#[tokio::test(start_paused = true)]
async fn cancel_from_another_task_interrupts_hanging_fetch() {
    let resolver = Resolver::new(HangingSource);
    let token = CancellationToken::new();
    let ctx = ResolveContext::background().with_cancellation(token.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    let err = resolver
        .resolve_to_last_node(&ctx, &some_address(), &["x"])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled { .. }));
}

#[tokio::test(start_paused = true)]
async fn cancellation_wins_over_expired_deadline() {
    let resolver = Resolver::new(HangingSource);
    let token = CancellationToken::new();
    token.cancel();
    let ctx = ResolveContext::background()
        .with_cancellation(token)
        .with_timeout(Duration::ZERO);

    let err = resolver
        .resolve_path(&ctx, &some_address(), &["x"])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled { .. }));
}

#[tokio::test]
async fn generous_deadline_does_not_interfere() {
    let (store, b) = store();
    let links = chain(&b, 4);
    let resolver = Resolver::new(store);
    let ctx = ResolveContext::background().with_timeout(Duration::from_secs(60));

    let last = resolver
        .resolve_to_last_node(&ctx, &links[0].address, &["next"; 4])
        .await
        .unwrap();
    assert_eq!(last.link.address, links[4].address);
}
