//! Collection factory: wrap a query, a list of elements or one element, or
//! create a new element from a tag name and an attribute spec.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::collection::{ClassNames, ElementCollection};
use crate::document::{Document, Element};
use crate::error::Result;

/// What [`Document::get`] should wrap
#[derive(Debug, Clone)]
pub enum Selector {
    /// CSS selector, evaluated against the whole document
    Query(String),
    Elements(Vec<Element>),
    Element(Element),
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Selector::Query(value.to_string())
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        Selector::Query(value)
    }
}

impl From<Vec<Element>> for Selector {
    fn from(value: Vec<Element>) -> Self {
        Selector::Elements(value)
    }
}

impl From<&[Element]> for Selector {
    fn from(value: &[Element]) -> Self {
        Selector::Elements(value.to_vec())
    }
}

impl From<Element> for Selector {
    fn from(value: Element) -> Self {
        Selector::Element(value)
    }
}

impl From<&Element> for Selector {
    fn from(value: &Element) -> Self {
        Selector::Element(value.clone())
    }
}

impl From<&ElementCollection> for Selector {
    fn from(value: &ElementCollection) -> Self {
        Selector::Elements(value.as_slice().to_vec())
    }
}

/// Attributes for a newly created element
///
/// `className` accepts a comma separated string or a list and goes through the
/// same path as [`ElementCollection::add_class`]. `text` becomes the element's
/// text. Every other key is set as an attribute; non-string values are
/// written in their JSON form.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AttributeSpec {
    #[serde(rename = "className", default)]
    pub class_name: Option<ClassNames>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl AttributeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class_name(mut self, classes: impl Into<ClassNames>) -> Self {
        self.class_name = Some(classes.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), Value::String(value.into()));
        self
    }
}

impl TryFrom<Value> for AttributeSpec {
    type Error = crate::error::DomError;

    fn try_from(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Document {
    /// Build a collection from a selector, an element list or one element.
    /// Queries return matches in document order; an invalid selector is an error.
    pub fn get(&self, selector: impl Into<Selector>) -> Result<ElementCollection> {
        match selector.into() {
            Selector::Query(query) => Ok(ElementCollection::new(self.query_selector_all(&query)?)),
            Selector::Elements(elements) => Ok(ElementCollection::new(elements)),
            Selector::Element(element) => Ok(ElementCollection::from(element)),
        }
    }

    /// Create a detached element and wrap it in a one-element collection
    pub fn create(&self, tag_name: &str, attributes: Option<AttributeSpec>) -> ElementCollection {
        let collection = ElementCollection::from(self.create_element(tag_name));
        let Some(spec) = attributes else {
            return collection;
        };

        if let Some(classes) = spec.class_name.filter(|c| !c.names().is_empty()) {
            collection.add_class(classes);
        }
        if let Some(text) = spec.text.filter(|t| !t.is_empty()) {
            collection.set_text(&text);
        }
        for (name, value) in &spec.attributes {
            collection.set_attr(name, &attribute_text(value));
        }
        collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomError;
    use serde_json::json;

    #[test]
    fn test_get_by_query() {
        let doc = Document::parse(r#"<p class="x">1</p><div><p class="x">2</p></div><p>3</p>"#);
        let found = doc.get(".x").unwrap();
        assert_eq!(found.len(), doc.query_selector_all(".x").unwrap().len());
        assert_eq!(found.text(), vec!["1", "2"]);
        assert!(doc.get("section").unwrap().is_empty());
        assert!(matches!(doc.get("p [x").unwrap_err(), DomError::InvalidSelector(_)));
    }

    #[test]
    fn test_get_wraps_elements() {
        let doc = Document::parse("<a></a><b></b>");
        let top = doc.children();

        let single = doc.get(&top[1]).unwrap();
        assert_eq!(single.len(), 1);
        assert!(single[0].is_same_node(&top[1]));

        let many = doc.get(top.clone()).unwrap();
        assert_eq!(many.as_slice(), top.as_slice());

        let rewrapped = doc.get(&many).unwrap();
        assert_eq!(rewrapped, many);
    }

    #[test]
    fn test_create_plain() {
        let doc = Document::new("about:blank");
        let created = doc.create("DIV", None);
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].tag_name(), "div");
        assert!(created[0].parent_element().is_none());
        assert_eq!(created[0].outer_html(), "<div></div>");
    }

    #[test]
    fn test_create_with_builder() {
        let doc = Document::new("about:blank");
        let spec = AttributeSpec::new()
            .class_name("a, b")
            .text("hi")
            .attr("data-x", "1");
        let created = doc.create("span", Some(spec));
        assert_eq!(
            created[0].outer_html(),
            r#"<span class="a b" data-x="1">hi</span>"#
        );
    }

    #[test]
    fn test_create_from_json() {
        let doc = Document::new("about:blank");
        let spec = AttributeSpec::try_from(json!({
            "className": ["btn", "primary"],
            "text": "",
            "type": "button",
            "tabindex": 3
        }))
        .unwrap();
        assert_eq!(spec.text.as_deref(), Some(""));

        let created = doc.create("button", Some(spec));
        let button = &created[0];
        assert!(button.class_list_contains("btn") && button.class_list_contains("primary"));
        assert_eq!(button.attribute("type").as_deref(), Some("button"));
        assert_eq!(button.attribute("tabindex").as_deref(), Some("3"));
        // Empty text leaves the element empty
        assert_eq!(button.inner_html(), "");
    }

    #[test]
    fn test_create_skips_empty_class_name() {
        let doc = Document::new("about:blank");
        for spec in [
            AttributeSpec::new().class_name(""),
            AttributeSpec::new().class_name(Vec::<String>::new()),
            AttributeSpec::try_from(json!({ "className": "" })).unwrap(),
        ] {
            let created = doc.create("div", Some(spec));
            assert_eq!(created[0].outer_html(), "<div></div>");
            assert!(!created[0].has_attribute("class"));
        }
    }

    #[test]
    fn test_create_rejects_bad_spec() {
        assert!(AttributeSpec::try_from(json!({ "text": 5 })).is_err());
        assert!(AttributeSpec::try_from(json!([1, 2])).is_err());
    }
}
