//! XML utility functions for navigating TEI trees and checking markup fragments.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;

/// Synthetic root used to test fragments for well-formedness
const FRAGMENT_ROOT: &str = "s";

/// Namespace bound to prefixes found in a fragment without their declaration
const FRAGMENT_NAMESPACE: &str = "urn:dataseer:fragment";

/// Qualified element or attribute names (`<mml:math`, ` xlink:href=`)
static QUALIFIED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:</?|\s)([A-Za-z_][A-Za-z0-9_.-]*):[A-Za-z_][A-Za-z0-9_.-]*")
        .expect("Invalid regex")
});

/// Get the tag name without namespace prefix.
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Find the first child element with the given tag name.
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find all child elements with the given tag name.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find a descendant element matching a slash-separated path of tag names.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use dataseer_parser::xml::find_by_path;
///
/// let xml = r#"<teiHeader><fileDesc><titleStmt><title>T</title></titleStmt></fileDesc></teiHeader>"#;
/// let doc = Document::parse(xml).unwrap();
/// let title = find_by_path(doc.root_element(), "fileDesc/titleStmt/title");
/// assert_eq!(title.unwrap().text(), Some("T"));
/// ```
pub fn find_by_path<'a, 'input>(node: Node<'a, 'input>, path: &str) -> Option<Node<'a, 'input>> {
    let mut current = node;
    for part in path.split('/') {
        current = find_child(current, part)?;
    }
    Some(current)
}

/// Concatenated text of all descendant text nodes.
pub fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Serialized inner content of an element, sliced from the original input.
///
/// Entity escapes are preserved, so the result can be parsed again as a
/// fragment.
pub fn inner_markup<'input>(input: &'input str, node: Node<'_, 'input>) -> &'input str {
    match (node.first_child(), node.last_child()) {
        (Some(first), Some(last)) => &input[first.range().start..last.range().end],
        _ => "",
    }
}

/// Collapse newlines and runs of whitespace into single spaces, trimmed.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a markup fragment parses once wrapped in a synthetic root element.
pub fn is_well_formed(fragment: &str) -> bool {
    roxmltree::Document::parse(&wrap_fragment(fragment)).is_ok()
}

/// Normalized plain text of a markup fragment, None if it does not parse.
///
/// # Examples
/// ```
/// use dataseer_parser::fragment_text;
///
/// let text = fragment_text(r#"Data from <ref type="bibr">Smith  2010</ref>."#);
/// assert_eq!(text.as_deref(), Some("Data from Smith 2010."));
/// assert!(fragment_text("<ref>open").is_none());
/// ```
pub fn fragment_text(fragment: &str) -> Option<String> {
    let wrapped = wrap_fragment(fragment);
    let doc = roxmltree::Document::parse(&wrapped).ok()?;
    Some(normalize_whitespace(&text_content(doc.root_element())))
}

/// Wrap a fragment in the synthetic root, declaring every prefix it uses
///
/// Paragraph markup is sliced out of its document, so prefixes declared on
/// an ancestor (`xmlns:mml` on the TEI root) are no longer in scope.
fn wrap_fragment(fragment: &str) -> String {
    let prefixes: BTreeSet<&str> = QUALIFIED_NAME
        .captures_iter(fragment)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|p| !matches!(*p, "xml" | "xmlns"))
        .collect();

    let declarations: String = prefixes
        .iter()
        .map(|p| format!(r#" xmlns:{p}="{FRAGMENT_NAMESPACE}:{p}""#))
        .collect();
    format!("<{FRAGMENT_ROOT}{declarations}>{fragment}</{FRAGMENT_ROOT}>")
}
