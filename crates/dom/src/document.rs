//! Document and element handles
//!
//! A [`Document`] is a cheap, clonable handle to one shared arena. An
//! [`Element`] is a document handle plus a node id. Handles do not own the
//! nodes they point at: the tree does. Every method takes the lock for the
//! duration of one operation only, so callbacks (event listeners,
//! `for_each` closures) are free to call back into the document.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::Arc;

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::events::{Event, Listener};
use crate::parser::parse_fragment;
use crate::selector::SelectorList;
use crate::serializer::DomSerializer;
use crate::types::NodeId;
use crate::utils::{format_style, parse_style};

struct DocumentInner {
    arena: RwLock<DomArena>,
    location: String,
}

/// Shared handle to a document tree
///
/// Nodes are never freed while the document is alive. Replacing content
/// (`set_inner_text`, `set_inner_html`, and the collection's `set_text` and
/// `set_html`) detaches the old children but keeps them in the arena, so a
/// long-lived document that is rewritten over and over keeps growing.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    /// Empty document at `location` (the `location.href` equivalent)
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(DocumentInner {
                arena: RwLock::new(DomArena::new()),
                location: location.into(),
            }),
        }
    }

    /// Parse markup into a new document at `about:blank`
    pub fn parse(html: &str) -> Self {
        Self::parse_with_location(html, "about:blank")
    }

    pub fn parse_with_location(html: &str, location: impl Into<String>) -> Self {
        let doc = Self::new(location);
        {
            let mut arena = doc.write();
            let root = arena.root_id();
            // Appending fresh nodes under the root cannot violate the hierarchy
            if let Err(e) = parse_fragment(&mut arena, root, html) {
                tracing::warn!("Failed to build document: {}", e);
            }
        }
        doc
    }

    pub fn location(&self) -> &str {
        &self.inner.location
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, DomArena> {
        self.inner.arena.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, DomArena> {
        self.inner.arena.write()
    }

    /// Handle for a node of this document
    pub fn element(&self, id: NodeId) -> Element {
        Element {
            doc: self.clone(),
            id,
        }
    }

    fn elements(&self, ids: Vec<NodeId>) -> Vec<Element> {
        ids.into_iter().map(|id| self.element(id)).collect()
    }

    pub fn same_document(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Top-level element children of the document
    pub fn children(&self) -> Vec<Element> {
        let ids = {
            let arena = self.read();
            arena.element_children(arena.root_id())
        };
        self.elements(ids.unwrap_or_default())
    }

    /// Create a detached element
    pub fn create_element(&self, tag_name: &str) -> Element {
        let id = self.write().create_element(tag_name);
        self.element(id)
    }

    /// Create a detached text node
    pub fn create_text_node(&self, data: &str) -> Element {
        let id = self.write().create_text(data);
        self.element(id)
    }

    /// All attached elements matching `selector`, in document order.
    /// The result is a snapshot, not a live list.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        let list = SelectorList::parse(selector)?;
        let ids = {
            let arena = self.read();
            list.query_all(&arena, arena.root_id())?
        };
        Ok(self.elements(ids))
    }

    /// First attached element matching `selector`
    pub fn query_selector(&self, selector: &str) -> Result<Option<Element>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        let found = self.read().find_by_id(id).ok().flatten();
        found.map(|node_id| self.element(node_id))
    }

    /// Markup of the whole document
    pub fn to_html(&self) -> String {
        let arena = self.read();
        DomSerializer::new()
            .inner_html(&arena, arena.root_id())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("location", &self.inner.location)
            .field("nodes", &self.read().len())
            .finish()
    }
}

/// Handle to a single node of a document
///
/// Equality is identity: two handles are equal when they point at the same
/// node of the same document (`isSameNode`), never by structure.
#[derive(Clone)]
pub struct Element {
    doc: Document,
    id: NodeId,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.doc.same_document(&other.doc)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .doc
            .read()
            .get(self.id)
            .map(|n| n.node_name.clone())
            .unwrap_or_default();
        write!(f, "Element({}, <{}>)", self.id, name)
    }
}

impl Element {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn is_same_node(&self, other: &Element) -> bool {
        self == other
    }

    fn check_document(&self, other: &Element) -> Result<()> {
        if self.doc.same_document(&other.doc) {
            Ok(())
        } else {
            Err(DomError::WrongDocument)
        }
    }

    /// Lowercase tag name, or the `#text`-style name for other node kinds
    pub fn tag_name(&self) -> String {
        self.doc
            .read()
            .get(self.id)
            .map(|n| n.node_name.clone())
            .unwrap_or_default()
    }

    pub fn is_element(&self) -> bool {
        self.doc
            .read()
            .get(self.id)
            .map(|n| n.is_element())
            .unwrap_or(false)
    }

    /// `parentElement`: `None` when detached or directly under the document
    pub fn parent_element(&self) -> Option<Element> {
        let parent = self.doc.read().parent_element_id(self.id).ok().flatten();
        parent.map(|id| self.doc.element(id))
    }

    /// Element children (`children`, text nodes excluded)
    pub fn children(&self) -> Vec<Element> {
        let ids = self.doc.read().element_children(self.id).unwrap_or_default();
        self.doc.elements(ids)
    }

    /// First child node of any kind (`firstChild`)
    pub fn first_child(&self) -> Option<Element> {
        let first = self
            .doc
            .read()
            .get(self.id)
            .ok()
            .and_then(|n| n.children_ids.first().copied());
        first.map(|id| self.doc.element(id))
    }

    /// Attribute value. Names match case-insensitively, as in HTML.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.doc
            .read()
            .get(self.id)
            .ok()
            .and_then(|n| n.attr(&name).map(str::to_string))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
        let mut arena = self.doc.write();
        let node = arena.element_mut(self.id)?;
        node.attributes.set(name.to_ascii_lowercase(), value);
        Ok(())
    }

    pub fn remove_attribute(&self, name: &str) -> Result<()> {
        let mut arena = self.doc.write();
        arena
            .element_mut(self.id)?
            .attributes
            .remove(&name.to_ascii_lowercase());
        Ok(())
    }

    /// Text content of the subtree
    pub fn inner_text(&self) -> String {
        self.doc.read().text_content(self.id).unwrap_or_default()
    }

    /// Replace all children with a single text node
    pub fn set_inner_text(&self, text: &str) -> Result<()> {
        let mut arena = self.doc.write();
        arena.element(self.id)?;
        arena.clear_children(self.id)?;
        if !text.is_empty() {
            let text_id = arena.create_text(text);
            arena.append_child(self.id, text_id)?;
        }
        Ok(())
    }

    pub fn inner_html(&self) -> String {
        DomSerializer::new()
            .inner_html(&self.doc.read(), self.id)
            .unwrap_or_default()
    }

    pub fn outer_html(&self) -> String {
        DomSerializer::new()
            .outer_html(&self.doc.read(), self.id)
            .unwrap_or_default()
    }

    /// Replace all children with the parsed markup
    pub fn set_inner_html(&self, html: &str) -> Result<()> {
        let mut arena = self.doc.write();
        arena.element(self.id)?;
        arena.clear_children(self.id)?;
        parse_fragment(&mut arena, self.id, html)
    }

    /// `value` property: the last value set, else the `value` attribute, else empty
    pub fn value(&self) -> String {
        self.doc
            .read()
            .get(self.id)
            .ok()
            .and_then(|n| n.value.clone().or_else(|| n.attr("value").map(str::to_string)))
            .unwrap_or_default()
    }

    pub fn set_value(&self, value: &str) -> Result<()> {
        self.doc.write().element_mut(self.id)?.value = Some(value.to_string());
        Ok(())
    }

    pub fn class_list_contains(&self, class_name: &str) -> bool {
        self.doc
            .read()
            .get(self.id)
            .map(|n| n.has_class(class_name))
            .unwrap_or(false)
    }

    /// Add classes that are not present yet, keeping existing order
    pub fn class_list_add<S: AsRef<str>>(&self, classes: &[S]) -> Result<()> {
        let mut arena = self.doc.write();
        let node = arena.element_mut(self.id)?;
        if classes.is_empty() && !node.attributes.contains("class") {
            return Ok(());
        }
        let mut names: Vec<String> = node.class_names().map(str::to_string).collect();
        for class in classes {
            let class = class.as_ref();
            if !names.iter().any(|n| n == class) {
                names.push(class.to_string());
            }
        }
        node.attributes.set("class", names.join(" "));
        Ok(())
    }

    pub fn class_list_remove<S: AsRef<str>>(&self, classes: &[S]) -> Result<()> {
        let mut arena = self.doc.write();
        let node = arena.element_mut(self.id)?;
        if !node.attributes.contains("class") {
            return Ok(());
        }
        let names: Vec<&str> = node
            .class_names()
            .filter(|n| !classes.iter().any(|c| c.as_ref() == *n))
            .collect();
        let joined = names.join(" ");
        node.attributes.set("class", joined);
        Ok(())
    }

    /// Inline style property (`el.style[name]`), empty when unset
    pub fn style_property(&self, name: &str) -> String {
        let style = self.attribute("style").unwrap_or_default();
        parse_style(&style)
            .into_iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
            .unwrap_or_default()
    }

    /// Set an inline style property. An empty value removes the declaration.
    pub fn set_style_property(&self, name: &str, value: &str) -> Result<()> {
        let mut arena = self.doc.write();
        let node = arena.element_mut(self.id)?;
        let name = name.to_ascii_lowercase();
        let mut decls = parse_style(node.attr("style").unwrap_or(""));
        let existing = decls.iter().position(|(n, _)| *n == name);
        match (existing, value.is_empty()) {
            (Some(i), false) => decls[i].1 = value.to_string(),
            (Some(i), true) => {
                decls.remove(i);
            }
            (None, false) => decls.push((name, value.to_string())),
            (None, true) => {}
        }
        if decls.is_empty() {
            node.attributes.remove("style");
        } else {
            node.attributes.set("style", format_style(&decls));
        }
        Ok(())
    }

    /// `disabled` property, reflected from the boolean attribute
    pub fn is_disabled(&self) -> bool {
        self.has_attribute("disabled")
    }

    pub fn set_disabled(&self, disabled: bool) -> Result<()> {
        if disabled {
            self.set_attribute("disabled", "")
        } else {
            self.remove_attribute("disabled")
        }
    }

    /// Move (or insert) `child` as the last child
    pub fn append_child(&self, child: &Element) -> Result<()> {
        self.check_document(child)?;
        self.doc.write().append_child(self.id, child.id)
    }

    /// Insert `child` before `reference`, or at the end when `reference` is `None`
    pub fn insert_before(&self, child: &Element, reference: Option<&Element>) -> Result<()> {
        self.check_document(child)?;
        if let Some(r) = reference {
            self.check_document(r)?;
        }
        self.doc
            .write()
            .insert_before(self.id, child.id, reference.map(|r| r.id))
    }

    pub fn remove_child(&self, child: &Element) -> Result<()> {
        self.check_document(child)?;
        self.doc.write().remove_child(self.id, child.id)
    }

    /// Detach from the parent. The node stays usable and can be inserted again.
    pub fn remove(&self) -> Result<()> {
        self.doc.write().detach(self.id)
    }

    /// `cloneNode(deep)`: a new detached node in the same document
    pub fn clone_node(&self, deep: bool) -> Result<Element> {
        let id = self.doc.write().clone_node(self.id, deep)?;
        Ok(self.doc.element(id))
    }

    pub fn add_event_listener(&self, event_type: &str, listener: &Listener) -> Result<()> {
        self.doc
            .write()
            .get_mut(self.id)?
            .listeners
            .add(event_type, listener);
        Ok(())
    }

    pub fn remove_event_listener(&self, event_type: &str, listener: &Listener) -> Result<()> {
        self.doc
            .write()
            .get_mut(self.id)?
            .listeners
            .remove(event_type, listener);
        Ok(())
    }

    /// Fire an event at this node and bubble it up through the ancestors.
    /// Returns how many listeners ran.
    pub fn dispatch_event(&self, event_type: &str) -> Result<usize> {
        // Snapshot the propagation path and listeners, then run them unlocked
        let path: Vec<(NodeId, Vec<Listener>)> = {
            let arena = self.doc.read();
            let mut path = Vec::new();
            let mut cursor = Some(self.id);
            while let Some(id) = cursor {
                let node = arena.get(id)?;
                path.push((id, node.listeners.get(event_type).to_vec()));
                cursor = node.parent_id;
            }
            path
        };

        let mut ran = 0;
        for (id, listeners) in path {
            let event = Event {
                event_type: event_type.to_string(),
                target: self.clone(),
                current_target: self.doc.element(id),
            };
            for listener in listeners {
                listener(&event);
                ran += 1;
            }
        }
        tracing::debug!(event_type, target = self.id, listeners = ran, "Dispatched event");
        Ok(ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::listener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_parse_and_query() {
        let doc = Document::parse_with_location(
            r#"<div id="a"><p class="x">one</p><p>two</p></div>"#,
            "https://site.test/page",
        );
        assert_eq!(doc.location(), "https://site.test/page");

        let ps = doc.query_selector_all("p").unwrap();
        assert_eq!(ps.len(), 2);
        assert_eq!(ps[0].inner_text(), "one");
        assert!(ps[0].class_list_contains("x"));
        assert_eq!(doc.query_selector("#a p.x").unwrap(), Some(ps[0].clone()));
        assert_eq!(doc.get_element_by_id("a").unwrap().tag_name(), "div");
        assert!(doc.query_selector("#missing").unwrap().is_none());
    }

    #[test]
    fn test_identity_not_structure() {
        let doc = Document::parse("<p></p><p></p>");
        let ps = doc.query_selector_all("p").unwrap();
        assert_ne!(ps[0], ps[1]);
        assert!(ps[0].is_same_node(&doc.element(ps[0].id())));

        let other = Document::parse("<p></p><p></p>");
        let other_ps = other.query_selector_all("p").unwrap();
        assert_eq!(ps[0].id(), other_ps[0].id());
        assert_ne!(ps[0], other_ps[0]);
        assert!(matches!(
            ps[0].append_child(&other_ps[0]),
            Err(DomError::WrongDocument)
        ));
    }

    #[test]
    fn test_inner_html_round_trip() {
        let doc = Document::parse("<div></div>");
        let div = &doc.children()[0];
        div.set_inner_html("<b>bold</b> &amp; <i>it</i>").unwrap();
        assert_eq!(div.children().len(), 2);
        assert_eq!(div.inner_html(), "<b>bold</b> &amp; <i>it</i>");
        assert_eq!(div.inner_text(), "bold & it");

        div.set_inner_text("<plain>").unwrap();
        assert!(div.children().is_empty());
        assert_eq!(div.inner_html(), "&lt;plain&gt;");
    }

    #[test]
    fn test_value_property_shadows_attribute() {
        let doc = Document::parse(r#"<input value="initial">"#);
        let input = &doc.children()[0];
        assert_eq!(input.value(), "initial");
        input.set_value("typed").unwrap();
        assert_eq!(input.value(), "typed");
        assert_eq!(input.attribute("value").as_deref(), Some("initial"));
    }

    #[test]
    fn test_style_and_disabled() {
        let doc = Document::parse(r#"<button style="color: red"></button>"#);
        let button = &doc.children()[0];
        button.set_style_property("display", "none").unwrap();
        assert_eq!(button.style_property("display"), "none");
        assert_eq!(
            button.attribute("style").as_deref(),
            Some("color: red; display: none;")
        );
        button.set_style_property("color", "").unwrap();
        assert_eq!(button.attribute("style").as_deref(), Some("display: none;"));

        assert!(!button.is_disabled());
        button.set_disabled(true).unwrap();
        assert!(button.is_disabled());
        assert_eq!(doc.to_html(), r#"<button style="display: none;" disabled=""></button>"#);
        button.set_disabled(false).unwrap();
        assert!(!button.is_disabled());
    }

    #[test]
    fn test_class_list() {
        let doc = Document::parse(r#"<p class="a b"></p>"#);
        let p = &doc.children()[0];
        p.class_list_add(&["b", "c"]).unwrap();
        assert_eq!(p.attribute("class").as_deref(), Some("a b c"));
        p.class_list_remove(&["a", "zzz"]).unwrap();
        assert_eq!(p.attribute("class").as_deref(), Some("b c"));
    }

    #[test]
    fn test_class_list_add_nothing_leaves_attribute_absent() {
        let doc = Document::parse("<div></div><p class=\"\"></p>");
        let top = doc.children();
        top[0].class_list_add::<&str>(&[]).unwrap();
        assert!(!top[0].has_attribute("class"));
        assert_eq!(top[0].outer_html(), "<div></div>");

        top[1].class_list_add::<&str>(&[]).unwrap();
        assert_eq!(top[1].attribute("class").as_deref(), Some(""));
        assert!(doc.query_selector("div[class]").unwrap().is_none());
    }

    #[test]
    fn test_attribute_names_are_case_insensitive() {
        let doc = Document::parse(r#"<p DATA-Role="lead"></p>"#);
        let p = &doc.children()[0];
        assert_eq!(p.attribute("data-role").as_deref(), Some("lead"));
        assert_eq!(p.attribute("Data-ROLE").as_deref(), Some("lead"));

        p.set_attribute("data-X", "v").unwrap();
        assert_eq!(p.attribute("data-X").as_deref(), Some("v"));
        assert!(p.has_attribute("DATA-x"));

        p.remove_attribute("DATA-X").unwrap();
        assert!(!p.has_attribute("data-x"));
        assert_eq!(p.outer_html(), r#"<p data-role="lead"></p>"#);
    }

    #[test]
    fn test_events_bubble_and_can_mutate() {
        let doc = Document::parse(r#"<div><button></button></div>"#);
        let div = &doc.children()[0];
        let button = &div.children()[0];
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let on_click = listener(move |event| {
            counter.fetch_add(1, Ordering::SeqCst);
            // Listener may touch the document while running
            event.current_target.set_attribute("data-seen", "1").unwrap();
        });
        button.add_event_listener("click", &on_click).unwrap();
        div.add_event_listener("click", &on_click).unwrap();

        assert_eq!(button.dispatch_event("click").unwrap(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(div.has_attribute("data-seen"));

        button.remove_event_listener("click", &on_click).unwrap();
        assert_eq!(button.dispatch_event("click").unwrap(), 1);
        assert_eq!(button.dispatch_event("focus").unwrap(), 0);
    }

    #[test]
    fn test_remove_and_reinsert() {
        let doc = Document::parse("<ul><li>a</li></ul><ol></ol>");
        let top = doc.children();
        let li = &top[0].children()[0];
        li.remove().unwrap();
        assert!(top[0].children().is_empty());
        assert!(li.parent_element().is_none());

        top[1].append_child(li).unwrap();
        assert_eq!(li.parent_element(), Some(top[1].clone()));
        assert!(top[1].first_child().is_some());
    }
}
