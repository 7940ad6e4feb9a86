//! Chainable element collections
//!
//! An [`ElementCollection`] is a transient, ordered view over element
//! handles. Membership is fixed at construction. Mutating operations apply to
//! every member and return `&Self` so calls can be chained; read operations
//! return plain data.
//!
//! A handful of operations only look at the first member (`siblings`,
//! `children`, `has_class`, `is_disabled`). They panic on an empty
//! collection, the same way indexing an empty slice does.

use serde::Deserialize;
use std::ops::Index;

use crate::document::Element;
use crate::error::Result;
use crate::events::Listener;
use crate::utils::split_class_csv;

/// Class names given either as one comma separated string or as a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ClassNames {
    Csv(String),
    List(Vec<String>),
}

impl ClassNames {
    /// Normalized, non-empty class names
    pub fn names(&self) -> Vec<String> {
        match self {
            ClassNames::Csv(csv) => split_class_csv(csv),
            ClassNames::List(list) => list.iter().filter(|c| !c.is_empty()).cloned().collect(),
        }
    }
}

impl From<&str> for ClassNames {
    fn from(value: &str) -> Self {
        ClassNames::Csv(value.to_string())
    }
}

impl From<String> for ClassNames {
    fn from(value: String) -> Self {
        ClassNames::Csv(value)
    }
}

impl From<Vec<String>> for ClassNames {
    fn from(value: Vec<String>) -> Self {
        ClassNames::List(value)
    }
}

impl From<Vec<&str>> for ClassNames {
    fn from(value: Vec<&str>) -> Self {
        ClassNames::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ClassNames {
    fn from(value: &[&str]) -> Self {
        ClassNames::List(value.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ClassNames {
    fn from(value: [&str; N]) -> Self {
        ClassNames::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Log and drop a per-element failure so the chain keeps going
fn warn_on_err(op: &str, element: &Element, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!(op, element = element.id(), "Skipped element: {}", e);
    }
}

/// Ordered, indexable collection of element handles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementCollection {
    elements: Vec<Element>,
}

impl ElementCollection {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn as_slice(&self) -> &[Element] {
        &self.elements
    }

    /// Run `callback(element, index)` on every member, in order
    pub fn for_each<F>(&self, mut callback: F) -> &Self
    where
        F: FnMut(&Element, usize),
    {
        for (index, element) in self.elements.iter().enumerate() {
            callback(element, index);
        }
        self
    }

    /// Collect `callback(element, index)` for every member, in order
    pub fn map<T, F>(&self, mut callback: F) -> Vec<T>
    where
        F: FnMut(&Element, usize) -> T,
    {
        self.elements
            .iter()
            .enumerate()
            .map(|(index, element)| callback(element, index))
            .collect()
    }

    /// Text of every member
    pub fn text(&self) -> Vec<String> {
        self.map(|el, _| el.inner_text())
    }

    /// Replace the content of every member with `text`
    pub fn set_text(&self, text: &str) -> &Self {
        self.for_each(|el, _| warn_on_err("set_text", el, el.set_inner_text(text)))
    }

    /// Inner markup of every member
    pub fn html(&self) -> Vec<String> {
        self.map(|el, _| el.inner_html())
    }

    pub fn set_html(&self, html: &str) -> &Self {
        self.for_each(|el, _| warn_on_err("set_html", el, el.set_inner_html(html)))
    }

    /// `value` of every member
    pub fn val(&self) -> Vec<String> {
        self.map(|el, _| el.value())
    }

    pub fn set_val(&self, value: &str) -> &Self {
        self.for_each(|el, _| warn_on_err("set_val", el, el.set_value(value)))
    }

    /// Attribute of every member, `None` where it is absent
    pub fn attr(&self, name: &str) -> Vec<Option<String>> {
        self.map(|el, _| el.attribute(name))
    }

    pub fn set_attr(&self, name: &str, value: &str) -> &Self {
        self.for_each(|el, _| warn_on_err("set_attr", el, el.set_attribute(name, value)))
    }

    /// Siblings of the first member, `None` when it has none
    pub fn siblings(&self) -> Option<ElementCollection> {
        let first = &self[0];
        let parent = first.parent_element()?;
        let siblings: Vec<Element> = parent
            .children()
            .into_iter()
            .filter(|child| !child.is_same_node(first))
            .collect();
        if siblings.is_empty() {
            None
        } else {
            Some(ElementCollection::new(siblings))
        }
    }

    /// Element children of the first member
    pub fn children(&self) -> ElementCollection {
        ElementCollection::new(self[0].children())
    }

    /// Parent of every member. A parent equal to the previous member's parent
    /// is skipped, so only runs of siblings collapse, not every duplicate.
    pub fn parent(&self) -> ElementCollection {
        let mut parents = Vec::new();
        let mut previous: Option<Element> = None;
        for element in &self.elements {
            let parent = element.parent_element();
            if let Some(p) = &parent {
                if previous.as_ref() != Some(p) {
                    parents.push(p.clone());
                }
            }
            previous = parent;
        }
        ElementCollection::new(parents)
    }

    pub fn show(&self) -> &Self {
        self.for_each(|el, _| warn_on_err("show", el, el.set_style_property("display", "block")))
    }

    pub fn hide(&self) -> &Self {
        self.for_each(|el, _| warn_on_err("hide", el, el.set_style_property("display", "none")))
    }

    /// Flip between `block` and `none`. Anything other than `block` counts as hidden.
    pub fn toggle(&self) -> &Self {
        self.for_each(|el, _| {
            let next = if el.style_property("display") == "block" {
                "none"
            } else {
                "block"
            };
            warn_on_err("toggle", el, el.set_style_property("display", next));
        })
    }

    /// Disabled state of the first member
    pub fn is_disabled(&self) -> bool {
        self[0].is_disabled()
    }

    pub fn enable(&self) -> &Self {
        self.for_each(|el, _| warn_on_err("enable", el, el.set_disabled(false)))
    }

    pub fn disable(&self) -> &Self {
        self.for_each(|el, _| warn_on_err("disable", el, el.set_disabled(true)))
    }

    /// Whether the first member has `class_name`
    pub fn has_class(&self, class_name: &str) -> bool {
        self[0].class_list_contains(class_name)
    }

    pub fn add_class(&self, classes: impl Into<ClassNames>) -> &Self {
        let names = classes.into().names();
        self.for_each(|el, _| warn_on_err("add_class", el, el.class_list_add(&names)))
    }

    pub fn remove_class(&self, classes: impl Into<ClassNames>) -> &Self {
        let names = classes.into().names();
        self.for_each(|el, _| warn_on_err("remove_class", el, el.class_list_remove(&names)))
    }

    /// Append `elements` to every member. The first member receives the nodes
    /// themselves; every later member receives deep clones.
    pub fn append(&self, elements: &ElementCollection) -> &Self {
        self.for_each(|parent, index| {
            elements.for_each(|child, _| {
                let result = if index > 0 {
                    child
                        .clone_node(true)
                        .and_then(|copy| parent.append_child(&copy))
                } else {
                    parent.append_child(child)
                };
                warn_on_err("append", parent, result);
            });
        })
    }

    /// Insert `elements` before the first child of every member, with the same
    /// move-then-clone rule as [`append`](Self::append). Each node goes in front
    /// of the current first child, so several nodes end up in reverse order.
    pub fn prepend(&self, elements: &ElementCollection) -> &Self {
        self.for_each(|parent, index| {
            elements.for_each(|child, _| {
                let first = parent.first_child();
                let result = if index > 0 {
                    child
                        .clone_node(true)
                        .and_then(|copy| parent.insert_before(&copy, first.as_ref()))
                } else {
                    parent.insert_before(child, first.as_ref())
                };
                warn_on_err("prepend", parent, result);
            });
        })
    }

    /// Detach every member from its parent
    pub fn remove(&self) -> &Self {
        self.for_each(|el, _| warn_on_err("remove", el, el.remove()))
    }

    pub fn on(&self, event_type: &str, listener: &Listener) -> &Self {
        self.for_each(|el, _| warn_on_err("on", el, el.add_event_listener(event_type, listener)))
    }

    pub fn off(&self, event_type: &str, listener: &Listener) -> &Self {
        self.for_each(|el, _| {
            warn_on_err("off", el, el.remove_event_listener(event_type, listener))
        })
    }
}

impl Index<usize> for ElementCollection {
    type Output = Element;

    fn index(&self, index: usize) -> &Element {
        &self.elements[index]
    }
}

impl From<Vec<Element>> for ElementCollection {
    fn from(elements: Vec<Element>) -> Self {
        Self::new(elements)
    }
}

impl From<Element> for ElementCollection {
    fn from(element: Element) -> Self {
        Self::new(vec![element])
    }
}

impl IntoIterator for ElementCollection {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a ElementCollection {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
