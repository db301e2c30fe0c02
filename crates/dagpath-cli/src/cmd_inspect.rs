/// Implementation of `dagpath inspect`.
///
/// Prints the address header, the stored block size, and the decoded node
/// of a single block. With `--reify`, the node is shown as the resolver
/// would present it: directories and shards as one flat directory, files
/// as their bytes.
///
/// # Output format
///
/// ```text
/// Address: f01701e20...
///   codec=dag-node hash=blake3 stored=112 bytes
/// dag-node: 2 links, 3 data bytes
///   "a.txt" -> f01551e20...
///   "b.txt" -> f01551e20...
/// ```
use anyhow::{Context, Result};
use dagpath_decoder::{BlockDecoder, Decoder};
use dagpath_resolver::Resolver;
use dagpath_types::{BlockSource, ContentAddress, Prototype, ResolveContext};

use crate::InspectArgs;
use crate::fs_store::FsBlockStore;
use crate::render::node_summary;

const NO_SEGMENTS: [&str; 0] = [];

/// Run the `dagpath inspect` command.
///
/// # Errors
///
/// Returns an error if the address is malformed, the block is missing, or
/// it fails to decode.
pub async fn run(args: &InspectArgs) -> Result<()> {
    let address = args
        .address
        .parse::<ContentAddress>()
        .with_context(|| format!("invalid address {:?}", args.address))?;
    let store = FsBlockStore::open(&args.store)
        .with_context(|| format!("cannot open store {}", args.store.display()))?;
    let ctx = ResolveContext::background();

    let block = store
        .get(&ctx, &address)
        .await
        .with_context(|| format!("cannot read block {address}"))?;
    println!("Address: {address}");
    println!(
        "  codec={} hash={} stored={} bytes",
        address.codec().name(),
        address.hash_fn().name(),
        block.len()
    );

    let node = if args.reify {
        Resolver::new(store)
            .resolve_path(&ctx, &address, &NO_SEGMENTS)
            .await
            .with_context(|| format!("cannot reify {address}"))?
            .node
    } else {
        BlockDecoder::new()
            .decode(&block, &address, Prototype::Any)
            .with_context(|| format!("cannot decode {address}"))?
    };
    println!("{}", node_summary(&node));
    Ok(())
}
