//! Namespace-aware lookups over `roxmltree` nodes.
//!
//! `ns` is the namespace URI the element must carry, or `None` for elements
//! outside any namespace.

use roxmltree::Node;

fn is_named(node: &Node, ns: Option<&str>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == ns
}

pub(crate) fn child<'a, 'i>(node: Node<'a, 'i>, ns: Option<&str>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| is_named(n, ns, name))
}

pub(crate) fn children<'a, 'i: 'a>(
    node: Node<'a, 'i>,
    ns: Option<&'a str>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    node.children().filter(move |n| is_named(n, ns, name))
}

/// Descendants (excluding `node` itself) with the given name.
pub(crate) fn descendants<'a, 'i: 'a>(
    node: Node<'a, 'i>,
    ns: Option<&'a str>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    node.descendants().skip(1).filter(move |n| is_named(n, ns, name))
}

/// Follow a chain of child element names.
pub(crate) fn path<'a, 'i>(node: Node<'a, 'i>, ns: Option<&str>, names: &[&str]) -> Option<Node<'a, 'i>> {
    names.iter().try_fold(node, |n, name| child(n, ns, name))
}

/// Trimmed text at `names`, or empty when any step is missing.
pub(crate) fn path_text(node: Node, ns: Option<&str>, names: &[&str]) -> String {
    path(node, ns, names)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// First non-empty text among several candidate paths.
pub(crate) fn first_text(node: Node, ns: Option<&str>, candidates: &[&[&str]]) -> String {
    candidates
        .iter()
        .map(|names| path_text(node, ns, names))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}
