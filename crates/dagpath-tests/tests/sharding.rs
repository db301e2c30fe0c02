//! Sharded directories and chunked files through the file-system reifier.
//!
//! A sharded directory must resolve every name exactly as the flat
//! directory with the same entries does, whatever the fanout. Chunked
//! files must read back byte-for-byte.

use std::sync::Arc;

use dagpath_resolver::{NoopReifier, ResolveError, Resolver, ResolverConfig};
use dagpath_tests::{CountingSource, Store, leaves, store};
use dagpath_types::hamt::{ShardLayout, ShardLinkName};
use dagpath_types::{Link, Node, ResolveContext, Step};

const NONE: [&str; 0] = [];

fn bg() -> ResolveContext {
    ResolveContext::background()
}

fn raw_resolver(store: &Store) -> Resolver<Store> {
    Resolver::with_config(
        store.clone(),
        ResolverConfig::default().with_reifier(NoopReifier),
    )
}

/// Child shards on `name`'s bucket chain below `root`, found by walking the
/// raw shard links.
async fn bucket_chain(store: &Store, root: &Link, fanout: u64, name: &str) -> usize {
    let layout = ShardLayout::new(fanout).unwrap();
    let raw = raw_resolver(store);
    let mut prefixes: Vec<String> = Vec::new();
    loop {
        let level = u32::try_from(prefixes.len()).unwrap();
        let shard = raw.resolve_path(&bg(), &root.address, &prefixes).await.unwrap();
        let prefix = layout.prefix(layout.bucket(name, level));
        if !matches!(shard.node.resolve_segment(&prefix), Step::Link(_)) {
            return prefixes.len();
        }
        prefixes.push(prefix);
    }
}

// ── Sharded directories ───────────────────────────────────────────────────────

#[tokio::test]
async fn sharded_and_flat_directories_agree() {
    let (store, b) = store();
    let entries = leaves(&b, 300);
    let flat = b.put_directory(entries.clone()).unwrap();
    let resolver = Resolver::new(store);

    for fanout in [2, 16, 256] {
        let sharded = b
            .put_sharded_directory(entries.clone(), Some(fanout))
            .unwrap();

        let flat_view = resolver.resolve_path(&bg(), &flat.address, &NONE).await.unwrap();
        let sharded_view = resolver
            .resolve_path(&bg(), &sharded.address, &NONE)
            .await
            .unwrap();
        assert_eq!(flat_view.node, sharded_view.node, "fanout {fanout}");

        for (name, link) in entries.iter().step_by(37) {
            let last = resolver
                .resolve_to_last_node(&bg(), &sharded.address, &[name.as_str()])
                .await
                .unwrap();
            assert_eq!(&last.link, link, "fanout {fanout}, entry {name}");
        }
    }
}

#[tokio::test]
async fn sharded_lookup_never_fetches_the_entry() {
    let (store, b) = store();
    let entries = leaves(&b, 500);
    let root = b.put_sharded_directory(entries.clone(), Some(4)).unwrap();
    let source = Arc::new(CountingSource::new(store.clone()));
    let resolver = Resolver::new(source.clone());

    let target = &entries["entry-0123"];
    let last = resolver
        .resolve_to_last_node(&bg(), &root.address, &["entry-0123"])
        .await
        .unwrap();
    assert_eq!(last.link.address, target.address);
    assert_eq!(source.fetches_of(&target.address), 0);
    // The root, then one shard per level down the name's bucket chain.
    let chain = bucket_chain(&store, &root, 4, "entry-0123").await;
    assert!(chain > 0);
    assert_eq!(source.total(), 1 + chain);
    assert!(entries.values().all(|l| source.fetches_of(&l.address) == 0));
}

#[tokio::test]
async fn unrelated_missing_shard_does_not_affect_lookup() {
    let (store, b) = store();
    let entries = leaves(&b, 500);
    let root = b.put_sharded_directory(entries.clone(), Some(4)).unwrap();
    let layout = ShardLayout::new(4).unwrap();
    let target = "entry-0123";
    let bucket = layout.bucket(target, 0);

    let raw = raw_resolver(&store)
        .resolve_path(&bg(), &root.address, &NONE)
        .await
        .unwrap();
    let Node::Dag(shard) = raw.node else {
        panic!("expected the raw shard node");
    };
    let mut removed = 0;
    for named in &shard.links {
        let parsed = layout.parse(&named.name).unwrap();
        if matches!(parsed, ShardLinkName::Child { bucket: other } if other != bucket) {
            store.remove(&named.link.address);
            removed += 1;
        }
    }
    assert!(removed > 0);

    let resolver = Resolver::new(store);
    let last = resolver
        .resolve_to_last_node(&bg(), &root.address, &[target])
        .await
        .unwrap();
    assert_eq!(last.link, entries[target]);
    let resolved = resolver.resolve_path(&bg(), &root.address, &[target]).await.unwrap();
    assert_eq!(resolved.node, Node::Bytes(b"leaf 123".to_vec()));
}

#[tokio::test]
async fn sharded_missing_name_is_not_found() {
    let (store, b) = store();
    let root = b.put_sharded_directory(leaves(&b, 40), Some(8)).unwrap();
    let resolver = Resolver::new(store);

    let err = resolver
        .resolve_path(&bg(), &root.address, &["entry-9999"])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { .. }));
    assert_eq!(err.address(), Some(&root.address));
}

#[tokio::test]
async fn without_reifier_shards_expose_raw_links() {
    let (store, b) = store();
    let root = b.put_sharded_directory(leaves(&b, 4), None).unwrap();

    let resolved = raw_resolver(&store)
        .resolve_path(&bg(), &root.address, &NONE)
        .await
        .unwrap();
    let Node::Dag(shard) = resolved.node else {
        panic!("expected the raw shard node");
    };
    // Link names are bare two-digit bucket prefixes or a prefix plus the name.
    assert!(!shard.links.is_empty());
    assert!(shard.links.iter().all(|l| {
        l.name.len() == 2
            || (l.name.len() == "00entry-0000".len() && l.name[2..].starts_with("entry-"))
    }));
}

// ── Chunked files ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn chunked_file_reads_back_whole() {
    let (store, b) = store();
    let b = b.chunk_size(64);
    let content: Vec<u8> = (0..1000u32).flat_map(u32::to_le_bytes).collect();
    let file = b.put_file(&content).unwrap();
    let small = b.put_file(b"tiny").unwrap();
    let dir = b
        .put_directory([("big".to_string(), file), ("small".to_string(), small)].into())
        .unwrap();
    let resolver = Resolver::new(store);

    let big = resolver.resolve_path(&bg(), &dir.address, &["big"]).await.unwrap();
    assert_eq!(big.node, Node::Bytes(content));
    let tiny = resolver.resolve_path(&bg(), &dir.address, &["small"]).await.unwrap();
    assert_eq!(tiny.node, Node::Bytes(b"tiny".to_vec()));

    let err = resolver
        .resolve_path(&bg(), &dir.address, &["small", "inside"])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::CannotTraverseLeaf { kind: "bytes", .. }));
}

#[tokio::test]
async fn traversing_into_a_file_fetches_no_chunks() {
    let (store, b) = store();
    let b = b.chunk_size(16);
    let file = b.put_file(&[7u8; 256]).unwrap();
    let dir = b
        .put_directory([("file".to_string(), file.clone())].into())
        .unwrap();
    let source = Arc::new(CountingSource::new(store));
    let resolver = Resolver::new(source.clone());

    let err = resolver
        .resolve_path(&bg(), &dir.address, &["file", "x"])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::CannotTraverseLeaf { kind: "bytes", .. }));
    assert_eq!(err.consumed(), ["file"]);
    assert_eq!(err.address(), Some(&file.address));
    assert_eq!(source.total(), 2);

    let err = resolver
        .resolve_path_components(&bg(), &dir.address, &["file", "x"])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::CannotTraverseLeaf { kind: "bytes", .. }));
    assert_eq!(source.total(), 4);
}
