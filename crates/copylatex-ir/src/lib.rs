//! Document tree for markdown to LaTeX conversion.
//!
//! The tree mirrors the node types an mdast parser (with wiki-link, GFM and
//! math extensions) produces. Node types outside that set are kept as
//! [`Node::Other`] so every input renders to something.

/// A parsed document plus what the frontend could not represent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Node,
    pub losses: Vec<Loss>,
}

impl Document {
    pub fn with_losses(root: Node, losses: Vec<Loss>) -> Self {
        Self { root, losses }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Root(Vec<Node>),
    Paragraph(Vec<Node>),
    Text(String),
    Emphasis(Vec<Node>),
    Strong(Vec<Node>),
    Strikethrough(Vec<Node>),
    Footnote(Vec<Node>),
    List { ordered: bool, items: Vec<Node> },
    ListItem(Vec<Node>),
    Heading { depth: u8, content: Vec<Node> },
    /// Wiki-style `[[...]]` link.
    InternalLink(InternalLink),
    /// Bracket-style `[text](url)` link.
    ExternalLink { url: String, content: Vec<Node> },
    CodeBlock(CodeBlock),
    InlineCode(String),
    /// The parser does not keep the `$` / `$$` distinction for math spans,
    /// so the source span is carried to recover it.
    InlineMath { value: String, span: Option<Span> },
    DisplayMath(String),
    Image(Image),
    Blockquote(Vec<Node>),
    Table(Table),
    TableRow(Vec<Node>),
    TableCell(Vec<Node>),
    Other {
        kind: String,
        value: Option<String>,
        children: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InternalLink {
    pub value: String,
    /// Prose found before the citation inside an opening parenthesis.
    pub pre: Option<String>,
    /// Prose found after the citation up to the closing parenthesis.
    pub post: Option<String>,
}

impl InternalLink {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            pre: None,
            post: None,
        }
    }

    /// Citation key for `@key` links.
    pub fn citation_key(&self) -> Option<&str> {
        self.value.strip_prefix('@')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeBlock {
    pub lang: Option<String>,
    pub meta: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    /// Per-column alignment; `None` means the column had no marker.
    pub align: Vec<Option<Alignment>>,
    pub rows: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Byte offsets into the markdown source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn wiki_link(value: impl Into<String>) -> Self {
        Node::InternalLink(InternalLink::new(value))
    }

    /// `[[@key]]` citation link.
    pub fn citation(key: &str) -> Self {
        Node::InternalLink(InternalLink::new(format!("@{}", key)))
    }

    /// mdast type name of the node.
    pub fn kind_name(&self) -> &str {
        match self {
            Node::Root(_) => "root",
            Node::Paragraph(_) => "paragraph",
            Node::Text(_) => "text",
            Node::Emphasis(_) => "emphasis",
            Node::Strong(_) => "strong",
            Node::Strikethrough(_) => "delete",
            Node::Footnote(_) => "footnote",
            Node::List { .. } => "list",
            Node::ListItem(_) => "listItem",
            Node::Heading { .. } => "heading",
            Node::InternalLink(_) => "wikiLink",
            Node::ExternalLink { .. } => "link",
            Node::CodeBlock(_) => "code",
            Node::InlineCode(_) => "inlineCode",
            Node::InlineMath { .. } => "inlineMath",
            Node::DisplayMath(_) => "math",
            Node::Image(_) => "image",
            Node::Blockquote(_) => "blockquote",
            Node::Table(_) => "table",
            Node::TableRow(_) => "tableRow",
            Node::TableCell(_) => "tableCell",
            Node::Other { kind, .. } => kind,
        }
    }

    /// Child nodes of a container; leaves have none.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root(children)
            | Node::Paragraph(children)
            | Node::Emphasis(children)
            | Node::Strong(children)
            | Node::Strikethrough(children)
            | Node::Footnote(children)
            | Node::ListItem(children)
            | Node::Blockquote(children)
            | Node::TableRow(children)
            | Node::TableCell(children) => children,
            Node::List { items, .. } => items,
            Node::Heading { content, .. } => content,
            Node::ExternalLink { content, .. } => content,
            Node::Table(table) => &table.rows,
            Node::Other { children, .. } => children,
            Node::Text(_)
            | Node::InternalLink(_)
            | Node::CodeBlock(_)
            | Node::InlineCode(_)
            | Node::InlineMath { .. }
            | Node::DisplayMath(_)
            | Node::Image(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root(children)
            | Node::Paragraph(children)
            | Node::Emphasis(children)
            | Node::Strong(children)
            | Node::Strikethrough(children)
            | Node::Footnote(children)
            | Node::ListItem(children)
            | Node::Blockquote(children)
            | Node::TableRow(children)
            | Node::TableCell(children) => Some(children),
            Node::List { items, .. } => Some(items),
            Node::Heading { content, .. } => Some(content),
            Node::ExternalLink { content, .. } => Some(content),
            Node::Table(table) => Some(&mut table.rows),
            Node::Other { children, .. } => Some(children),
            Node::Text(_)
            | Node::InternalLink(_)
            | Node::CodeBlock(_)
            | Node::InlineCode(_)
            | Node::InlineMath { .. }
            | Node::DisplayMath(_)
            | Node::Image(_) => None,
        }
    }

    /// Literal value of a leaf node.
    pub fn value(&self) -> Option<&str> {
        match self {
            Node::Text(value)
            | Node::InlineCode(value)
            | Node::DisplayMath(value)
            | Node::InlineMath { value, .. } => Some(value.as_str()),
            Node::InternalLink(link) => Some(link.value.as_str()),
            Node::CodeBlock(code) => Some(code.value.as_str()),
            Node::Image(image) => image.alt.as_deref(),
            Node::Other { value, .. } => value.as_deref(),
            _ => None,
        }
    }

    /// Concatenated leaf values of the sub-tree, in document order.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<&Node> = vec![self];
        while let Some(node) = stack.pop() {
            if let Some(value) = node.value() {
                out.push_str(value);
            }
            stack.extend(node.children().iter().rev());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loss {
    pub kind: String,
    pub message: String,
}

impl Loss {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_walks_in_document_order() {
        let node = Node::Paragraph(vec![
            Node::text("a "),
            Node::Strong(vec![Node::text("b"), Node::Emphasis(vec![Node::text("c")])]),
            Node::text(" d"),
        ]);
        assert_eq!(node.plain_text(), "a bc d");
    }

    #[test]
    fn citation_key_strips_at() {
        let Node::InternalLink(link) = Node::citation("smith2020") else {
            panic!("expected internal link");
        };
        assert_eq!(link.citation_key(), Some("smith2020"));
        assert_eq!(InternalLink::new("^fig1").citation_key(), None);
    }

    #[test]
    fn span_length_saturates() {
        assert_eq!(Span::new(10, 4).len(), 0);
        assert_eq!(Span::new(4, 10).len(), 6);
    }

    #[test]
    fn other_reports_its_kind() {
        let node = Node::Other {
            kind: "thematicBreak".to_string(),
            value: None,
            children: Vec::new(),
        };
        assert_eq!(node.kind_name(), "thematicBreak");
        assert!(node.children().is_empty());
    }
}
