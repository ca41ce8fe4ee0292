//! Mutable HTML document model for the transformation passes.
//!
//! Markup is parsed with `scraper` (html5ever) and the passes edit the parsed
//! `ego_tree` in place. Output goes through html5ever's serializer, so
//! serializing, re-parsing and serializing again yields the same bytes, which
//! is what makes the passes idempotent across runs.

mod serialize;

use ego_tree::NodeRef;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, StrTendril};
use tracing::trace;

pub use ego_tree::NodeId;
pub use serialize::{escape_attr, escape_text};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Where to graft new nodes relative to an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// As siblings immediately before the anchor.
    Before(NodeId),
    /// As siblings immediately after the anchor.
    After(NodeId),
    /// As the last children of the anchor.
    Append(NodeId),
    /// As the first children of the anchor.
    Prepend(NodeId),
}

/// A parsed document. Detached nodes stay in the tree's arena but are never serialized.
///
/// Every method taking a [`NodeId`] expects an id produced by this tree; a
/// foreign id reads as a missing node.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    html: Html,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl DocumentTree {
    /// Parse a full HTML document. html5ever never fails; malformed markup is repaired.
    pub fn parse(html: &str) -> Self {
        let html = Html::parse_document(html);
        trace!(nodes = html.tree.nodes().count(), "document parsed");
        Self { html }
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.html.tree.root().id()
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id)?.value().as_element()
    }

    /// Parse `markup` as a body fragment and return its top-level nodes, detached.
    pub fn parse_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        let fragment = Html::parse_fragment(markup);
        let fragment_root = self.html.tree.extend_tree(fragment.tree).id();

        // html5ever wraps fragment content in a synthetic <html> element.
        let nodes: Vec<NodeId> = self
            .node(fragment_root)
            .and_then(|root| root.children().find(|c| c.value().is_element()))
            .map(|holder| holder.children().map(|c| c.id()).collect())
            .unwrap_or_default();

        for &node in &nodes {
            self.detach(node);
        }
        nodes
    }

    // -----------------------------------------------------------------------
    // Node construction
    // -----------------------------------------------------------------------

    /// Create a detached HTML element.
    pub fn create_element(&mut self, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        let name = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(name.to_ascii_lowercase().as_str()),
        );
        let attrs = attrs
            .iter()
            .map(|(key, value)| Attribute {
                name: attr_name(key),
                value: StrTendril::from_slice(value),
            })
            .collect();
        self.html
            .tree
            .orphan(Node::Element(Element::new(name, attrs)))
            .id()
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.html
            .tree
            .orphan(Node::Text(Text {
                text: StrTendril::from_slice(text),
            }))
            .id()
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Remove `node` from its parent. The node and its subtree stay in the arena.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(node) {
            node.detach();
        }
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(child).is_none() {
            return;
        }
        if let Some(mut parent) = self.html.tree.get_mut(parent) {
            parent.append_id(child);
        }
    }

    /// Insert `child` as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(child).is_none() {
            return;
        }
        if let Some(mut parent) = self.html.tree.get_mut(parent) {
            parent.prepend_id(child);
        }
    }

    /// Insert `node` as the sibling immediately before `anchor`.
    /// Does nothing when `anchor` is detached.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        if self.can_insert_beside(anchor, node) {
            if let Some(mut anchor) = self.html.tree.get_mut(anchor) {
                anchor.insert_id_before(node);
            }
        }
    }

    /// Insert `node` as the sibling immediately after `anchor`.
    /// Does nothing when `anchor` is detached.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        if self.can_insert_beside(anchor, node) {
            if let Some(mut anchor) = self.html.tree.get_mut(anchor) {
                anchor.insert_id_after(node);
            }
        }
    }

    fn can_insert_beside(&self, anchor: NodeId, node: NodeId) -> bool {
        anchor != node && self.parent(anchor).is_some() && self.node(node).is_some()
    }

    /// Graft `nodes` (in order) at `placement`.
    pub fn insert(&mut self, placement: Placement, nodes: &[NodeId]) {
        match placement {
            Placement::Before(anchor) => {
                for &node in nodes {
                    self.insert_before(anchor, node);
                }
            }
            Placement::After(anchor) => {
                let mut cursor = anchor;
                for &node in nodes {
                    self.insert_after(cursor, node);
                    cursor = node;
                }
            }
            Placement::Append(parent) => {
                for &node in nodes {
                    self.append_child(parent, node);
                }
            }
            Placement::Prepend(parent) => {
                for &node in nodes.iter().rev() {
                    self.prepend_child(parent, node);
                }
            }
        }
    }

    /// Parse `markup` and graft the result at `placement`. Returns the new top-level nodes.
    pub fn insert_markup(&mut self, placement: Placement, markup: &str) -> Vec<NodeId> {
        let nodes = self.parse_fragment(markup);
        self.insert(placement, &nodes);
        nodes
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The node's parent, if attached.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent().map(|p| p.id())
    }

    /// The node's children in document order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| n.children().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    /// Lowercase tag name, or `None` for non-elements.
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(Element::name)
    }

    /// True if `node` is an element named `tag`.
    pub fn is_tag(&self, node: NodeId, tag: &str) -> bool {
        self.tag_name(node).is_some_and(|n| n.eq_ignore_ascii_case(tag))
    }

    /// Value of an unprefixed attribute. `href` does not match `xlink:href`.
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attrs
            .iter()
            .find(|(key, _)| is_attr(key, name))
            .map(|(_, value)| &**value)
    }

    /// Set an unprefixed attribute, keeping its position if it already exists.
    /// Returns `true` if the stored value changed.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(mut node) = self.html.tree.get_mut(node) else {
            return false;
        };
        let Node::Element(element) = node.value() else {
            return false;
        };

        let mut attrs: Vec<Attribute> = element
            .attrs
            .iter()
            .map(|(key, value)| Attribute {
                name: key.clone(),
                value: value.clone(),
            })
            .collect();
        match attrs.iter_mut().find(|a| is_attr(&a.name, name)) {
            Some(attr) if &*attr.value == value => return false,
            Some(attr) => attr.value = StrTendril::from_slice(value),
            None => attrs.push(Attribute {
                name: attr_name(name),
                value: StrTendril::from_slice(value),
            }),
        }

        // Rebuilt rather than patched: `Element` caches its id and classes.
        *element = Element::new(element.name.clone(), attrs);
        true
    }

    /// True if the element's `class` attribute lists `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(node) = self.node(node) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|n| n.value().as_text())
            .map(|t| &**t)
            .collect()
    }

    /// Replace all children of `node` with a single text node.
    /// Returns `true` if the text content changed.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> bool {
        let children = self.children(node);
        let unchanged = match children.as_slice() {
            [] => text.is_empty(),
            [only] => self
                .node(*only)
                .and_then(|n| n.value().as_text())
                .is_some_and(|t| &**t == text),
            _ => false,
        };
        if unchanged {
            return false;
        }

        for child in children {
            self.detach(child);
        }
        if !text.is_empty() {
            let id = self.create_text(text);
            self.append_child(node, id);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All attached descendants of `scope` in document order (excluding `scope`).
    pub fn descendants(&self, scope: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(scope)
            .into_iter()
            .flat_map(|n| n.descendants().skip(1))
            .map(|n| n.id())
    }

    /// Siblings after `node`, in document order.
    pub fn following_siblings(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(node)
            .into_iter()
            .flat_map(|n| n.next_siblings())
            .map(|n| n.id())
    }

    /// First descendant element of `scope` named `tag`.
    pub fn find_first(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(scope).find(|&id| self.is_tag(id, tag))
    }

    /// Every descendant element of `scope` named `tag`.
    pub fn find_all(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope).filter(|&id| self.is_tag(id, tag)).collect()
    }

    /// First descendant element named `tag` whose text contains `needle`, ignoring case.
    pub fn find_containing(&self, scope: NodeId, tag: &str, needle: &str) -> Option<NodeId> {
        let needle = needle.to_lowercase();
        self.descendants(scope).find(|&id| {
            self.is_tag(id, tag) && self.text_content(id).to_lowercase().contains(&needle)
        })
    }

    /// First descendant element with the given `id` attribute.
    pub fn find_by_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.descendants(scope).find(|&n| self.attr(n, "id") == Some(id))
    }

    /// First descendant element carrying `class`.
    pub fn find_by_class(&self, scope: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(scope).find(|&n| self.has_class(n, class))
    }

    /// True if `ancestor` is a proper ancestor of `node`.
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.node(node)
            .is_some_and(|n| n.ancestors().any(|a| a.id() == ancestor))
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Serialize the whole document to markup.
    pub fn serialize(&self) -> String {
        serialize::to_markup(&self.html, serialize::TraversalScope::ChildrenOnly(None))
    }

    /// Serialize a single element (outer HTML). Empty for non-element nodes.
    pub fn outer_html(&self, node: NodeId) -> String {
        self.node(node)
            .and_then(ElementRef::wrap)
            .map(|el| serialize::to_markup(&el, serialize::TraversalScope::IncludeNode))
            .unwrap_or_default()
    }
}

/// Name for an unprefixed attribute in no namespace.
fn attr_name(name: &str) -> QualName {
    QualName::new(
        None,
        Namespace::from(""),
        LocalName::from(name.to_ascii_lowercase().as_str()),
    )
}

fn is_attr(key: &QualName, name: &str) -> bool {
    key.prefix.is_none() && key.ns.is_empty() && (*key.local).eq_ignore_ascii_case(name)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_path(name: &str) -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn load_fixture(name: &str) -> String {
        fs::read_to_string(fixture_path(name))
            .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
    }

    fn main_of(tree: &DocumentTree) -> NodeId {
        tree.find_first(tree.root(), "main").expect("main element")
    }

    // --- Parsing ---

    #[test]
    fn parse_builds_html_head_body() {
        let tree = DocumentTree::parse("<p>hi</p>");
        let root = tree.root();
        assert!(tree.find_first(root, "html").is_some());
        assert!(tree.find_first(root, "head").is_some());
        let p = tree.find_first(root, "p").unwrap();
        assert_eq!(tree.text_content(p), "hi");
    }

    #[test]
    fn parse_keeps_attribute_order() {
        let tree = DocumentTree::parse(r#"<a id="x" href="/a.json" class="btn">go</a>"#);
        let a = tree.find_first(tree.root(), "a").unwrap();
        assert_eq!(
            tree.outer_html(a),
            r#"<a id="x" href="/a.json" class="btn">go</a>"#
        );
    }

    // --- Serialization ---

    #[test]
    fn serialize_is_a_fixed_point() {
        let html = load_fixture("html/facebook-ads-para-google-sheets-n8n.html");
        let once = DocumentTree::parse(&html).serialize();
        let twice = DocumentTree::parse(&once).serialize();
        assert_eq!(once, twice);
    }

    #[test]
    fn serialize_keeps_namespaced_svg_attributes() {
        let html = r##"<html><head></head><body><svg xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 24 24"><use xlink:href="#icon"></use></svg></body></html>"##;
        let mut tree = DocumentTree::parse(html);
        let body = tree.find_first(tree.root(), "body").unwrap();
        tree.insert_markup(Placement::Append(body), "<p>added</p>");

        let out = tree.serialize();
        assert!(out.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#));
        assert!(out.contains(r##"<use xlink:href="#icon"></use>"##));
        assert!(out.contains(r#"viewBox="0 0 24 24""#));
        assert_eq!(DocumentTree::parse(&out).serialize(), out);

        let use_el = tree.find_first(tree.root(), "use").unwrap();
        assert_eq!(tree.attr(use_el, "href"), None);
    }

    #[test]
    fn serialize_escapes_text_and_attributes() {
        let mut tree = DocumentTree::parse("<main></main>");
        let main = main_of(&tree);
        let p = tree.create_element("p", vec![("title".into(), "a \"b\" & c".into())]);
        tree.append_child(main, p);
        tree.set_text(p, "1 < 2 & 3 > 2");

        let out = tree.serialize();
        assert!(out.contains(r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp; 3 &gt; 2</p>"#));
    }

    #[test]
    fn serialize_leaves_script_and_noscript_raw() {
        let html = concat!(
            "<html><head><script>if (a < b && c) {}</script></head>",
            r#"<body><noscript><iframe src="https://example.com/ns"></iframe></noscript></body></html>"#,
        );
        let out = DocumentTree::parse(html).serialize();
        assert!(out.contains("<script>if (a < b && c) {}</script>"));
        assert!(out.contains(r#"<noscript><iframe src="https://example.com/ns"></iframe></noscript>"#));
    }

    #[test]
    fn serialize_void_elements_without_close_tag() {
        let html = r#"<html><head><meta charset="utf-8"></head><body><br><img src="x.png"></body></html>"#;
        let out = DocumentTree::parse(html).serialize();
        assert!(out.contains(r#"<meta charset="utf-8">"#));
        assert!(!out.contains("</meta>"));
        assert!(!out.contains("</br>"));
        assert!(!out.contains("</img>"));
    }

    #[test]
    fn serialize_keeps_doctype_and_comments() {
        let html = "<!DOCTYPE html><html><head></head><body><!-- keep me --></body></html>";
        let out = DocumentTree::parse(html).serialize();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<!-- keep me -->"));
    }

    #[test]
    fn serialize_preserves_pre_leading_newline() {
        let html = "<html><body><pre>\n\nindented</pre></body></html>";
        let once = DocumentTree::parse(html).serialize();
        let twice = DocumentTree::parse(&once).serialize();
        assert_eq!(once, twice);
        let pre = DocumentTree::parse(&once);
        let node = pre.find_first(pre.root(), "pre").unwrap();
        assert_eq!(pre.text_content(node), "\nindented");
    }

    // --- Mutation ---

    #[test]
    fn insert_markup_after_keeps_order() {
        let mut tree = DocumentTree::parse("<main><h1>T</h1><p>end</p></main>");
        let h1 = tree.find_first(tree.root(), "h1").unwrap();
        tree.insert_markup(Placement::After(h1), "<h2>A</h2><h2>B</h2>");
        let main = main_of(&tree);
        let tags: Vec<_> = tree
            .children(main)
            .into_iter()
            .filter_map(|c| tree.tag_name(c))
            .collect();
        assert_eq!(tags, ["h1", "h2", "h2", "p"]);
        let h2s = tree.find_all(main, "h2");
        assert_eq!(tree.text_content(h2s[0]), "A");
        assert_eq!(tree.text_content(h2s[1]), "B");
    }

    #[test]
    fn insert_before_and_prepend() {
        let mut tree = DocumentTree::parse("<main><p>x</p></main>");
        let main = main_of(&tree);
        let p = tree.find_first(main, "p").unwrap();
        tree.insert_markup(Placement::Before(p), "<hr>");
        tree.insert_markup(Placement::Prepend(main), "<h1>top</h1>");
        assert_eq!(tree.outer_html(main), "<main><h1>top</h1><hr><p>x</p></main>");
    }

    #[test]
    fn inserting_beside_a_detached_node_is_ignored() {
        let mut tree = DocumentTree::parse("<main></main>");
        let loose = tree.create_element("p", Vec::new());
        let other = tree.create_element("p", Vec::new());
        tree.insert_after(loose, other);
        assert_eq!(tree.parent(other), None);
    }

    #[test]
    fn set_attr_reports_changes() {
        let mut tree = DocumentTree::parse(r#"<a href="/old">x</a>"#);
        let a = tree.find_first(tree.root(), "a").unwrap();
        assert!(tree.set_attr(a, "href", "/new"));
        assert!(!tree.set_attr(a, "href", "/new"));
        assert!(tree.set_attr(a, "rel", "noopener"));
        assert_eq!(tree.attr(a, "href"), Some("/new"));
        assert_eq!(tree.attr(a, "rel"), Some("noopener"));
        assert_eq!(tree.outer_html(a), r#"<a href="/new" rel="noopener">x</a>"#);
    }

    #[test]
    fn set_text_replaces_children() {
        let mut tree = DocumentTree::parse("<title>Old <b>x</b></title>");
        let title = tree.find_first(tree.root(), "title").unwrap();
        assert!(tree.set_text(title, "New"));
        assert!(!tree.set_text(title, "New"));
        assert_eq!(tree.text_content(title), "New");
    }

    #[test]
    fn detached_nodes_are_not_serialized() {
        let mut tree = DocumentTree::parse("<main><p>gone</p><p>kept</p></main>");
        let p = tree.find_first(tree.root(), "p").unwrap();
        tree.detach(p);
        let out = tree.serialize();
        assert!(!out.contains("gone"));
        assert!(out.contains("kept"));
    }

    // --- Queries ---

    #[test]
    fn find_containing_ignores_case() {
        let tree = DocumentTree::parse("<main><h2>Intro</h2><h2>Step by step guide</h2></main>");
        let found = tree.find_containing(tree.root(), "h2", "Step by step").unwrap();
        assert_eq!(tree.text_content(found), "Step by step guide");
        assert_eq!(tree.find_containing(tree.root(), "h2", "step BY Step"), Some(found));
        assert!(tree.find_containing(tree.root(), "h2", "outro").is_none());
    }

    #[test]
    fn find_by_id_and_class() {
        let tree = DocumentTree::parse(
            r#"<main><section class="box related-integrations"><a id="cta">x</a></section></main>"#,
        );
        let section = tree.find_by_class(tree.root(), "related-integrations").unwrap();
        let a = tree.find_by_id(tree.root(), "cta").unwrap();
        assert!(tree.is_descendant_of(a, section));
        assert!(!tree.is_descendant_of(section, a));
        assert!(tree.find_by_class(tree.root(), "related").is_none());
    }

    #[test]
    fn following_siblings_skip_earlier_nodes() {
        let tree = DocumentTree::parse("<main><p>a</p><h1>t</h1><p>b</p><p>c</p></main>");
        let h1 = tree.find_first(tree.root(), "h1").unwrap();
        let texts: Vec<_> = tree
            .following_siblings(h1)
            .filter(|&n| tree.is_tag(n, "p"))
            .map(|n| tree.text_content(n))
            .collect();
        assert_eq!(texts, ["b", "c"]);
    }

    #[test]
    fn collapse_whitespace_normalizes() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
