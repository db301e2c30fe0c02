/// Implementation of `dagpath put`.
///
/// Parses a JSON manifest describing a tree of blocks, stores every block
/// into the directory store bottom-up, and prints the root address.
///
/// # Manifest format
///
/// ```json
/// {
///   "root": {
///     "type": "directory",
///     "sharded": true,
///     "entries": {
///       "readme.txt": { "type": "file", "content": "hello" },
///       "logo.bin":   { "type": "raw",  "content_file": "logo.bin" },
///       "meta":       { "type": "value",
///                       "value": { "tags": ["a", "b"],
///                                  "prev": { "$link": { "type": "raw", "content": "v1" } } } }
///     }
///   }
/// }
/// ```
///
/// `content_file` paths are relative to the manifest's directory.
///
/// # Entry types
///
/// ```text
/// ┌────────────┬──────────────────────────────────────────────────────────┐
/// │ Type       │ Fields                                                   │
/// ├────────────┼──────────────────────────────────────────────────────────┤
/// │ raw        │ content | content_file                                   │
/// │ file       │ content | content_file (chunked above --chunk-size)      │
/// │ value      │ value: JSON; {"$link": entry} objects become links       │
/// │ directory  │ entries: {name: entry}, sharded (bool), fanout (int)     │
/// │ dag        │ links: [{name, entry}], data (string, optional)          │
/// └────────────┴──────────────────────────────────────────────────────────┘
/// ```
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use dagpath_encoder::DagBuilder;
use dagpath_types::{DagNode, HashFn, Link, NamedLink, Value};

use crate::PutArgs;
use crate::fs_store::FsBlockStore;

// ── Manifest serde types ──────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct Manifest {
    root: Entry,
}

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Entry {
    Raw {
        content: Option<String>,
        content_file: Option<String>,
    },
    File {
        content: Option<String>,
        content_file: Option<String>,
    },
    Value {
        value: serde_json::Value,
    },
    Directory {
        entries: BTreeMap<String, Entry>,
        #[serde(default)]
        sharded: bool,
        fanout: Option<u64>,
    },
    Dag {
        #[serde(default)]
        links: Vec<ManifestLink>,
        data: Option<String>,
    },
}

#[derive(serde::Deserialize)]
struct ManifestLink {
    #[serde(default)]
    name: String,
    entry: Entry,
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Run the `dagpath put` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or parsed, if an entry
/// references a missing `content_file`, if a value holds a number that is
/// not a 64-bit integer, or if a block cannot be written to the store.
pub fn run(args: &PutArgs) -> Result<()> {
    let source = fs::read_to_string(&args.manifest)
        .with_context(|| format!("cannot read {}", args.manifest.display()))?;
    let manifest: Manifest = serde_json::from_str(&source)
        .with_context(|| format!("failed to parse manifest {}", args.manifest.display()))?;
    let manifest_dir = args.manifest.parent().unwrap_or_else(|| Path::new("."));

    let store = FsBlockStore::open(&args.store)
        .with_context(|| format!("cannot open store {}", args.store.display()))?;

    let mut builder = DagBuilder::new(&store).compression(!args.no_compress);
    if args.sha2 {
        builder = builder.hash_fn(HashFn::Sha2_256);
    }
    if let Some(size) = args.chunk_size {
        builder = builder.chunk_size(size);
    }

    let root = put_entry(&builder, &manifest.root, manifest_dir, "/")?;
    println!("{}", root.address);
    Ok(())
}

// ── Entry builders ────────────────────────────────────────────────────────────

fn put_entry(
    builder: &DagBuilder<&FsBlockStore>,
    entry: &Entry,
    dir: &Path,
    at: &str,
) -> Result<Link> {
    let link = match entry {
        Entry::Raw {
            content,
            content_file,
        } => builder.put_raw(&read_content(content, content_file, dir)?),
        Entry::File {
            content,
            content_file,
        } => builder.put_file(&read_content(content, content_file, dir)?),
        Entry::Value { value } => {
            let value = json_to_value(builder, value, dir, at)?;
            builder.put_value(&value)
        }
        Entry::Directory {
            entries,
            sharded,
            fanout,
        } => {
            let mut links = BTreeMap::new();
            for (name, child) in entries {
                let link = put_entry(builder, child, dir, &join(at, name))?;
                links.insert(name.clone(), link);
            }
            if *sharded || fanout.is_some() {
                builder.put_sharded_directory(links, *fanout)
            } else {
                builder.put_directory(links)
            }
        }
        Entry::Dag { links, data } => {
            let mut named = Vec::with_capacity(links.len());
            for l in links {
                let link = put_entry(builder, &l.entry, dir, &join(at, &l.name))?;
                named.push(NamedLink::new(l.name.clone(), link));
            }
            builder.put_dag(&DagNode {
                links: named,
                data: data.as_ref().map(|d| d.as_bytes().to_vec()),
            })
        }
    };
    link.with_context(|| format!("cannot store {at}"))
}

fn read_content(content: &Option<String>, content_file: &Option<String>, dir: &Path) -> Result<Vec<u8>> {
    match (content, content_file) {
        (Some(text), None) => Ok(text.as_bytes().to_vec()),
        (None, Some(file)) => {
            let path = dir.join(file);
            fs::read(&path).with_context(|| format!("cannot read content_file {}", path.display()))
        }
        (Some(_), Some(_)) => bail!("content and content_file are mutually exclusive"),
        (None, None) => bail!("entry needs content or content_file"),
    }
}

/// Convert manifest JSON into a [`Value`], storing `{"$link": entry}`
/// sub-entries as separate blocks along the way.
fn json_to_value(
    builder: &DagBuilder<&FsBlockStore>,
    json: &serde_json::Value,
    dir: &Path,
    at: &str,
) -> Result<Value> {
    use serde_json::Value as Json;

    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Int(
            n.as_i64()
                .ok_or_else(|| anyhow!("{at}: {n} is not a 64-bit integer"))?,
        ),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| json_to_value(builder, item, dir, &join(at, &i.to_string())))
                .collect::<Result<_>>()?,
        ),
        Json::Object(fields) => {
            if let (1, Some(target)) = (fields.len(), fields.get("$link")) {
                let entry: Entry = serde_json::from_value(target.clone())
                    .with_context(|| format!("{at}: invalid $link entry"))?;
                return Ok(Value::Link(put_entry(builder, &entry, dir, at)?));
            }
            let mut map = BTreeMap::new();
            for (key, item) in fields {
                map.insert(key.clone(), json_to_value(builder, item, dir, &join(at, key))?);
            }
            Value::Map(map)
        }
    })
}

fn join(at: &str, segment: &str) -> String {
    if at.ends_with('/') {
        format!("{at}{segment}")
    } else {
        format!("{at}/{segment}")
    }
}
