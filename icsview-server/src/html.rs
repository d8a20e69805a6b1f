//! Minimal owned HTML tree used to build the calendar pages.

use std::fmt::{self, Write};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: [&str; 4] = ["br", "input", "link", "meta"];

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl From<Element> for Node {
    fn from(e: Element) -> Self {
        Node::Element(e)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(e) => fmt::Display::fmt(e, f),
            Node::Text(t) => f.write_str(&escape(t)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    classes: Vec<String>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Element {
            tag,
            attrs: Vec::new(),
            classes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn div() -> Self {
        Element::new("div")
    }

    pub fn span() -> Self {
        Element::new("span")
    }

    /// An `<a>`; `target` is only set when given.
    pub fn link(href: impl Into<String>, target: Option<&str>) -> Self {
        let link = Element::new("a").attr("href", href);
        match target {
            Some(target) => link.attr("target", target),
            None => link,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    // Builder style

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.append_child(node);
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    // Attributes

    pub fn set_attr(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    // Children

    pub fn append_child(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    // Classes

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    /// Depth-first search for descendants (and self) carrying `class`.
    pub fn find_by_class<'a>(&'a self, class: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_by_class(class, &mut found);
        found
    }

    fn collect_by_class<'a>(&'a self, class: &str, found: &mut Vec<&'a Element>) {
        if self.has_class(class) {
            found.push(self);
        }
        for child in &self.children {
            if let Node::Element(e) = child {
                e.collect_by_class(class, found);
            }
        }
    }

    /// Concatenated text of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        if !self.classes.is_empty() {
            write!(f, " class=\"{}\"", escape(&self.classes.join(" ")))?;
        }
        for (name, value) in &self.attrs {
            write!(f, " {}=\"{}\"", name, escape(value))?;
        }
        f.write_char('>')?;

        if VOID_ELEMENTS.contains(&self.tag) {
            return Ok(());
        }

        for child in &self.children {
            fmt::Display::fmt(child, f)?;
        }
        write!(f, "</{}>", self.tag)
    }
}

/// Escape text for use in element content and quoted attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A `<table>` with a heading row and body rows.
#[derive(Debug, Clone)]
pub struct Table {
    classes: Vec<String>,
    headings: Vec<String>,
    rows: Vec<Element>,
}

impl Table {
    pub fn new<I, S>(headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table {
            classes: Vec::new(),
            headings: headings.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn append_row<I, N>(&mut self, cells: I)
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.rows.push(Self::make_row(cells));
    }

    fn make_row<I, N>(cells: I) -> Element
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        Element::new("tr").children(cells.into_iter().map(|c| Element::new("td").child(c)))
    }

    pub fn into_element(self) -> Element {
        let heading = Element::new("tr").children(
            self.headings
                .into_iter()
                .map(|h| Element::new("th").attr("scope", "col").child(h)),
        );

        let mut table = Element::new("table")
            .child(Element::new("thead").child(heading))
            .child(Element::new("tbody").children(self.rows));
        for class in &self.classes {
            table.add_class(class);
        }
        table
    }
}

impl From<Table> for Node {
    fn from(t: Table) -> Self {
        Node::Element(t.into_element())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_elements() {
        let el = Element::div()
            .class("calendar_event")
            .attr("id", "e1")
            .child(Element::span().child("Net"))
            .child(Element::new("br"));

        assert_eq!(
            el.to_string(),
            r#"<div class="calendar_event" id="e1"><span>Net</span><br></div>"#
        );
    }

    #[test]
    fn escapes_text_and_attributes() {
        let el = Element::link("?a=1&b=\"2\"", Some("_blank")).child("<Tom & Jerry's>");

        assert_eq!(
            el.to_string(),
            r#"<a href="?a=1&amp;b=&quot;2&quot;" target="_blank">&lt;Tom &amp; Jerry&#39;s&gt;</a>"#
        );
    }

    #[test]
    fn classes_are_not_duplicated() {
        let mut el = Element::div().class("a");

        el.add_class("a");
        el.add_class("b");

        assert!(el.has_class("b"));
        assert_eq!(el.to_string(), r#"<div class="a b"></div>"#);
    }

    #[test]
    fn table_rows() {
        let mut table = Table::new(["Su", "Mo"]).class("calendar_table");

        table.append_row(["1", "2"]);
        table.append_row([Element::span().child("3"), Element::span().child("4")]);

        assert_eq!(
            table.into_element().to_string(),
            "<table class=\"calendar_table\"><thead><tr><th scope=\"col\">Su</th><th scope=\"col\">Mo</th></tr></thead>\
             <tbody><tr><td>1</td><td>2</td></tr><tr><td><span>3</span></td><td><span>4</span></td></tr></tbody></table>"
        );
    }

    #[test]
    fn find_by_class_searches_descendants() {
        let el = Element::div()
            .class("calendar")
            .child(Element::div().class("calendar_event").child("one"))
            .child(Element::div().child(Element::div().class("calendar_event").child("two")));

        let found = el.find_by_class("calendar_event");

        assert_eq!(found.len(), 2);
        assert_eq!(found[1].text_content(), "two");
    }
}
