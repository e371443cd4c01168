//! The node tree.
//!
//! Every node shares one header (`kind`, `range`, `annotations`, `children`);
//! kind-specific data lives in the `NodeKind` variant arms rather than in
//! separate per-kind structs. The tree is single-owner: a `Node` owns its
//! `children` by value, there is no shared ownership and no cycles.

use crate::position::Range;
use serde::Serialize;

/// `punct` leaf kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PunctKind {
    Hyphen,
    EnDash,
    EmDash,
    QuoteOpen,
    QuoteClose,
    SquoteOpen,
    SquoteClose,
}

/// `emphasis` container kinds. `Underline` has no lexer-driven construction
/// path in this implementation — see DESIGN.md's Open Question resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EmphasisKind {
    Bold,
    Italic,
    Underline,
}

/// `change` container kinds. Like `EmphasisKind::Underline`, neither variant
/// is reachable from the current token dispatch — see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Added,
    Removed,
}

/// `heading` type. `head1`→subsubsection, `head2`→subsection,
/// `head3`→section — the opposite of how the source reads, since the
/// marker with the most `>` characters denotes the most deeply nested
/// heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeadingKind {
    Section,
    Subsection,
    Subsubsection,
}

/// `checkItem.checked`, derived from the checkbox marker's second byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckState {
    Checked,
    Unchecked,
}

/// Table column alignment, from the separator row's tee tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Default,
}

/// Table `row` type, cycling header → content → footer across separator rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RowKind {
    Header,
    Content,
    Footer,
}

/// The closed set of node kinds, one variant per kind. Fields hold only
/// the kind-specific data; `range`/`annotations`/`children` live on `Node`
/// itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeKind {
    // Leaf inlines
    Text { content: String },
    Space,
    LineBreak,
    Comment { content: String },
    Emoji { code: String },
    DateTime { date: Option<String>, time: Option<String> },
    Punct { punct: PunctKind },
    AccountTag { resource: String },
    HashTag { resource: String },

    // Inline containers
    Emphasis { emphasis: EmphasisKind },
    Highlight,
    Change { change: ChangeKind },

    // Resources
    Code { label: Option<String>, content: String },
    CodeBlock { label: Option<String>, content: String },
    Link { resource: Option<String>, headings: Vec<String>, label: Option<String> },
    View { resource: Option<String>, label: Option<String> },
    Footnote { desc: String },
    InText { id: String },
    Reference { id: String },
    ReferenceInfo { key: String },
    /// Also doubles as the document root: when used as the root, `content`
    /// holds the whole source buffer and `children` are the top-level
    /// blocks; when used as an include, `content` holds the included file's
    /// buffer, or is absent entirely for an unresolved/disabled include
    /// (only `path` is set).
    Document { path: Option<String>, content: Option<String> },

    // Block structural
    Paragraph,
    Heading { heading: HeadingKind },
    Subtitle,
    Title,
    Indent,
    Blockquote,
    Admonition { label: String },
    List,
    NumberedList,
    CheckList,
    Item,
    CheckItem { checked: CheckState },
    DefinitionList,
    DefinitionItem,
    DefinitionTerm,
    DefinitionDesc,
    Table { alignments: Vec<Alignment> },
    Row { row: RowKind },
    Cell,
    Dinkus,
    PageBreak,
}

impl NodeKind {
    /// The stable kind name used by backends.
    pub fn name(&self) -> &'static str {
        use NodeKind::*;
        match self {
            Text { .. } => "text",
            Space => "space",
            LineBreak => "lineBreak",
            Comment { .. } => "comment",
            Emoji { .. } => "emoji",
            DateTime { .. } => "dateTime",
            Punct { .. } => "punct",
            AccountTag { .. } => "accountTag",
            HashTag { .. } => "hashTag",
            Emphasis { .. } => "emphasis",
            Highlight => "highlight",
            Change { .. } => "change",
            Code { .. } => "code",
            CodeBlock { .. } => "codeBlock",
            Link { .. } => "link",
            View { .. } => "view",
            Footnote { .. } => "footnote",
            InText { .. } => "inText",
            Reference { .. } => "reference",
            ReferenceInfo { .. } => "referenceInfo",
            Document { .. } => "document",
            Paragraph => "paragraph",
            Heading { .. } => "heading",
            Subtitle => "subtitle",
            Title => "title",
            Indent => "indent",
            Blockquote => "blockquote",
            Admonition { .. } => "admonition",
            List => "list",
            NumberedList => "numberedList",
            CheckList => "checkList",
            Item => "item",
            CheckItem { .. } => "checkItem",
            DefinitionList => "definitionList",
            DefinitionItem => "definitionItem",
            DefinitionTerm => "definitionTerm",
            DefinitionDesc => "definitionDesc",
            Table { .. } => "table",
            Row { .. } => "row",
            Cell => "cell",
            Dinkus => "dinkus",
            PageBreak => "pageBreak",
        }
    }
}

/// A node in the document tree. Shared header plus a tagged `kind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub range: Range,
    /// Ordered key/value pairs; keys unique per node (later duplicates
    /// overwrite, enforced by `Node::set_annotation`).
    pub annotations: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, range: Range) -> Self {
        Self {
            kind,
            range,
            annotations: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, range: Range, children: Vec<Node>) -> Self {
        Self {
            kind,
            range,
            annotations: Vec::new(),
            children,
        }
    }

    pub fn push_child(&mut self, child: Node) {
        self.range = self.range.join(&child.range);
        self.children.push(child);
    }

    /// Insert or overwrite an annotation, preserving first-seen order for new
    /// keys.
    pub fn set_annotation(&mut self, key: String, value: String) {
        if let Some(existing) = self.annotations.iter_mut().find(|(k, _)| *k == key) {
            existing.1 = value;
        } else {
            self.annotations.push((key, value));
        }
    }

    /// True when every child's range is contained by `self`'s range
    /// checked recursively.
    pub fn ranges_well_formed(&self) -> bool {
        self.children
            .iter()
            .all(|c| self.range.contains(&c.range) && c.ranges_well_formed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn set_annotation_overwrites_existing_key_in_place() {
        let mut node = Node::new(NodeKind::Paragraph, Range::at(Position::start()));
        node.set_annotation("a".into(), "1".into());
        node.set_annotation("b".into(), "2".into());
        node.set_annotation("a".into(), "3".into());
        assert_eq!(
            node.annotations,
            vec![("a".to_string(), "3".to_string()), ("b".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn push_child_widens_parent_range() {
        let mut node = Node::new(NodeKind::Paragraph, Range::at(Position::new(1, 1)));
        node.push_child(Node::new(
            NodeKind::Text { content: "hi".into() },
            Range::new(Position::new(1, 1), Position::new(1, 2)),
        ));
        assert_eq!(node.range.end, Position::new(1, 2));
        assert!(node.ranges_well_formed());
    }
}
