use std::collections::BTreeMap;

use dagpath_types::hamt::ShardLayout;
use dagpath_types::{BlockSink, DagNode, Link, NamedLink, NodeData};

use crate::builder::DagBuilder;
use crate::error::EncodeError;

impl<S: BlockSink> DagBuilder<S> {
    /// Write one shard at `level` and, recursively, every child shard.
    ///
    /// Entries are grouped by bucket. A bucket holding a single entry stores
    /// it directly as `<prefix><name>`; a crowded bucket gets a child shard
    /// linked as `<prefix>`. Once the hash bits run out, crowded buckets
    /// keep all their entries inline.
    pub(crate) fn put_shard(
        &self,
        layout: ShardLayout,
        entries: Vec<(String, Link)>,
        level: u32,
    ) -> Result<Link, EncodeError> {
        let mut buckets: BTreeMap<u64, Vec<(String, Link)>> = BTreeMap::new();
        for (name, link) in entries {
            buckets
                .entry(layout.bucket(&name, level))
                .or_default()
                .push((name, link));
        }

        let mut links = Vec::new();
        for (bucket, group) in buckets {
            let prefix = layout.prefix(bucket);
            if group.len() > 1 && level < layout.max_level() {
                let child = self.put_shard(layout, group, level + 1)?;
                links.push(NamedLink::new(prefix, child));
            } else {
                links.extend(
                    group
                        .into_iter()
                        .map(|(name, link)| NamedLink::new(format!("{prefix}{name}"), link)),
                );
            }
        }

        tracing::trace!(level, links = links.len(), "built shard");
        self.put_dag(&DagNode {
            links,
            data: Some(NodeData::hamt_shard(layout.fanout()).encode()),
        })
    }
}
