//! Structural subtyping between schema nodes.
//!
//! The relation is shape-based, defined only between nodes of the same
//! kind (plus the scalar-vs-raw-tag special case). Recursive schema graphs
//! are handled coinductively: a `(left, right)` pair already on the visit
//! stack is assumed to hold, so traversal terminates on cycles.
//!
//! Scalar direction: `A.is_subtype_of(B)` holds when every candidate
//! declared on **B** is covered by some candidate in **A** — A accepts at
//! least everything B names. Struct fields and list/dict elements use the
//! value-producing direction instead: every candidate A may produce must be
//! acceptable to B.

use std::collections::HashSet;

use crate::coalesce::{Tag, TypeRef};
use crate::schema::SchemaNode;

pub(crate) type Seen = HashSet<(*const SchemaNode, *const SchemaNode)>;

pub(crate) fn is_subtype(a: &SchemaNode, b: &SchemaNode, seen: &mut Seen) -> bool {
    let pair = (a as *const _, b as *const _);
    // In-progress pairs are assumed to hold; a confirmed positive stays
    // memoized, a negative is unmarked so it is never read as a positive.
    if !seen.insert(pair) {
        return true;
    }
    let holds = subtype_inner(a, b, seen);
    if !holds {
        seen.remove(&pair);
    }
    holds
}

fn subtype_inner(a: &SchemaNode, b: &SchemaNode, seen: &mut Seen) -> bool {
    match (a, b) {
        (SchemaNode::Struct(sa), SchemaNode::Struct(sb)) => {
            // Width and depth: every field of B has a same-named field in A
            // whose candidates B's field accepts; extra A fields are free.
            sb.fields.iter().all(|fb| {
                sa.fields.iter().any(|fa| {
                    fa.name() == fb.name()
                        && all_covered(fa.candidates(), fb.candidates(), seen)
                })
            })
        }
        (SchemaNode::List(sa), SchemaNode::List(sb)) => {
            all_covered(&sa.types, &sb.types, seen)
        }
        (SchemaNode::Dict(sa), SchemaNode::Dict(sb)) => {
            all_covered(&sa.types, &sb.types, seen)
        }
        (SchemaNode::Scalar(sa), SchemaNode::Scalar(sb)) => sb
            .types
            .iter()
            .all(|tb| sa.types.iter().any(|ta| covers(ta, tb, seen))),
        (SchemaNode::Select(sa), SchemaNode::Select(sb)) => {
            sa.arms.iter().all(|(key, ta_list)| {
                sb.arms
                    .get(key)
                    .is_some_and(|tb_list| all_covered(ta_list, tb_list, seen))
            })
        }
        _ => false,
    }
}

/// Scalar-vs-raw-tag comparison: the tag is treated as a singleton
/// candidate set on the right-hand side.
pub(crate) fn scalar_covers_tag(node: &SchemaNode, tag: &Tag) -> bool {
    let SchemaNode::Scalar(s) = node else {
        return false;
    };
    let singleton = TypeRef::tag(tag.clone());
    s.types
        .iter()
        .any(|ta| covers(ta, &singleton, &mut Seen::default()))
}

/// Every candidate in `sub_list` is covered by some candidate in
/// `sup_list`. An empty `sub_list` is vacuously covered; a non-empty one is
/// never covered by an empty `sup_list`.
fn all_covered(sub_list: &[TypeRef], sup_list: &[TypeRef], seen: &mut Seen) -> bool {
    sub_list
        .iter()
        .all(|ta| sup_list.iter().any(|tb| covers(tb, ta, seen)))
}

/// Whether `sup` accepts every value `sub` accepts.
fn covers(sup: &TypeRef, sub: &TypeRef, seen: &mut Seen) -> bool {
    match (resolve(sup), resolve(sub)) {
        (Resolved::Tag(Tag::Raw, _), _) => true,
        (Resolved::Tag(ta, oa), Resolved::Tag(tb, ob)) => {
            if ta != tb {
                return false;
            }
            let with_ok = match (&oa.with, &ob.with) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(na), Some(nb)) => is_subtype(nb.as_ref(), na.as_ref(), seen),
            };
            let of_ok = match (&oa.of, &ob.of) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(of_a), Some(of_b)) => all_covered(of_b, of_a, seen),
            };
            with_ok && of_ok
        }
        (Resolved::Node(na), Resolved::Node(nb)) => is_subtype(nb.as_ref(), na.as_ref(), seen),
        _ => false,
    }
}

enum Resolved<'a> {
    Tag(&'a Tag, &'a crate::coalesce::CoalesceOpts),
    Node(std::sync::Arc<SchemaNode>),
    Dead,
}

fn resolve(t: &TypeRef) -> Resolved<'_> {
    match t {
        TypeRef::Tag(tag, opts) => Resolved::Tag(tag, opts),
        TypeRef::Node(node) => Resolved::Node(node.clone()),
        TypeRef::Link(weak) => match weak.upgrade() {
            Some(node) => Resolved::Node(node),
            None => Resolved::Dead,
        },
    }
}
