use dagpath_types::{ContentAddress, LinkContext, Prototype};

/// Picks the prototype a block is decoded into, before it is decoded.
///
/// The choice may depend on the address and on where the link was found.
/// It must be deterministic: the same address and context always yield
/// the same prototype.
///
/// Any `Fn(&ContentAddress, &LinkContext) -> Prototype` is a chooser:
///
/// ```rust
/// use dagpath_resolver::PrototypeChooser;
/// use dagpath_types::{Codec, ContentAddress, HashFn, LinkContext, Prototype};
///
/// fn raw_everywhere(_: &ContentAddress, _: &LinkContext<'_>) -> Prototype {
///     Prototype::Raw
/// }
///
/// let address = ContentAddress::compute(Codec::DagNode, HashFn::Blake3, b"x");
/// assert_eq!(raw_everywhere.choose(&address, &LinkContext::root()), Prototype::Raw);
/// ```
pub trait PrototypeChooser: Send + Sync {
    fn choose(&self, address: &ContentAddress, ctx: &LinkContext<'_>) -> Prototype;
}

impl<F> PrototypeChooser for F
where
    F: Fn(&ContentAddress, &LinkContext<'_>) -> Prototype + Send + Sync,
{
    fn choose(&self, address: &ContentAddress, ctx: &LinkContext<'_>) -> Prototype {
        self(address, ctx)
    }
}

/// Typed-link hint first, codec default otherwise.
///
/// ```text
/// ┌──────────────────────────────┬────────────────────────────────┐
/// │ Link context                 │ Prototype                      │
/// ├──────────────────────────────┼────────────────────────────────┤
/// │ link carries a target hint   │ the hint                       │
/// │ untyped link, or the root    │ Prototype::natural(codec)      │
/// └──────────────────────────────┴────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultChooser;

impl PrototypeChooser for DefaultChooser {
    fn choose(&self, address: &ContentAddress, ctx: &LinkContext<'_>) -> Prototype {
        ctx
            .link
            .and_then(|link| link.target)
            .unwrap_or_else(|| Prototype::natural(address.codec()))
    }
}
