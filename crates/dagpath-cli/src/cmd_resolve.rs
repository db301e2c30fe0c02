/// Implementation of `dagpath resolve`.
///
/// Splits `/<root>/<seg>/...` into a root address and segments, resolves
/// them against the directory store, and prints the result.
///
/// # Output format
///
/// ```text
/// $ dagpath resolve /f0170.../docs/readme.txt --store blocks
/// block: f0155...
/// bytes (5 bytes): hello
///
/// $ dagpath resolve /f0170.../meta/tags/0 --store blocks --last
/// link:      f0171...
/// remainder: tags/0
/// ```
///
/// Ctrl-C cancels a resolution in flight.
use std::time::Duration;

use anyhow::{Context, Result, bail};
use dagpath_resolver::{ReifyPolicy, Resolver, ResolverConfig};
use dagpath_types::{CancellationToken, ContentAddress, ResolveContext};
use serde_json::json;

use crate::ResolveArgs;
use crate::fs_store::FsBlockStore;
use crate::render::{link_to_json, node_summary, node_to_json};

/// Run the `dagpath resolve` command.
///
/// # Errors
///
/// Returns an error if the path is malformed, the store cannot be opened,
/// or resolution fails for any reason.
pub async fn run(args: &ResolveArgs) -> Result<()> {
    let (root, segments) = parse_path(&args.path)?;
    let store = FsBlockStore::open(&args.store)
        .with_context(|| format!("cannot open store {}", args.store.display()))?;
    let resolver = Resolver::with_config(store, config(args));

    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    let mut ctx = ResolveContext::background().with_cancellation(token);
    if let Some(ms) = args.timeout_ms {
        ctx = ctx.with_timeout(Duration::from_millis(ms));
    }

    if args.last {
        let last = resolver
            .resolve_to_last_node(&ctx, &root, &segments)
            .await
            .with_context(|| format!("cannot resolve {}", args.path))?;
        if args.json {
            println!(
                "{}",
                json!({ "link": link_to_json(&last.link), "remainder": last.remainder })
            );
        } else {
            println!("link:      {}", last.link.address);
            println!("remainder: {}", last.remainder.join("/"));
        }
    } else {
        let resolved = resolver
            .resolve_path(&ctx, &root, &segments)
            .await
            .with_context(|| format!("cannot resolve {}", args.path))?;
        if args.json {
            println!(
                "{}",
                json!({ "link": link_to_json(&resolved.link), "node": node_to_json(&resolved.node) })
            );
        } else {
            println!("block: {}", resolved.link.address);
            println!("{}", node_summary(&resolved.node));
        }
    }
    Ok(())
}

fn config(args: &ResolveArgs) -> ResolverConfig {
    let mut config = ResolverConfig::default().verify_blocks(!args.no_verify);
    if args.required_reify {
        config = config.with_reify_policy(ReifyPolicy::Required);
    }
    if let Some(depth) = args.max_depth {
        config = config.with_max_depth(depth);
    }
    config
}

/// Split `/<root>/<seg>/...` into its root address and segments.
///
/// The leading slash is optional. Empty segments, as left by doubled or
/// trailing slashes, are dropped.
fn parse_path(path: &str) -> Result<(ContentAddress, Vec<String>)> {
    let mut parts = path
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty());
    let Some(root) = parts.next() else {
        bail!("path {path:?} names no root address");
    };
    let root = root
        .parse::<ContentAddress>()
        .with_context(|| format!("invalid root address {root:?}"))?;
    Ok((root, parts.map(str::to_owned).collect()))
}
