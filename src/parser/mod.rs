//! The recursive-descent parser.
//!
//! One function per node kind, consuming tokens off a shared cursor and
//! returning `Option<Node>` (`None` means the construct didn't parse, and
//! the caller decides how to resynchronise). Parsing always runs to
//! completion rather than hanging or panicking on malformed input; see
//! `parse_paragraph`'s fallback `advance(1)` for the one place that matters.

use crate::ast::{Alignment, CheckState, EmphasisKind, HeadingKind, Node, NodeKind, PunctKind, RowKind};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Severity};
use crate::include::IncludeResolver;
use crate::lexer;
use crate::position::Range;
use crate::token::{Token, TokenKind};
use std::path::{Path, PathBuf};

enum ItemResult {
    Ok,
    Error,
    EarlyExit,
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    idx: usize,
    annotations: Vec<(String, String)>,
    base_dir: PathBuf,
    file_inclusion: bool,
    resolver: &'a dyn IncludeResolver,
    diagnostics: &'a mut dyn DiagnosticSink,
}

/// Parse a source buffer end to end: lex it, then drive the recursive
/// descent parser over the resulting token stream.
pub fn parse(
    source: &str,
    base_dir: PathBuf,
    file_inclusion: bool,
    resolver: &dyn IncludeResolver,
    diagnostics: &mut dyn DiagnosticSink,
) -> Node {
    let tokens = lexer::lex(source);
    let mut parser = Parser::new(tokens, base_dir, file_inclusion, resolver, diagnostics);
    parser.parse_document()
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: Vec<Token>,
        base_dir: PathBuf,
        file_inclusion: bool,
        resolver: &'a dyn IncludeResolver,
        diagnostics: &'a mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            tokens,
            idx: 0,
            annotations: Vec::new(),
            base_dir,
            file_inclusion,
            resolver,
            diagnostics,
        }
    }

    // --- cursor ----------------------------------------------------------

    fn is_bound(&self, offset: usize) -> bool {
        self.idx + offset < self.tokens.len()
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.idx + offset)
    }

    fn peek_kind(&self, offset: usize) -> Option<TokenKind> {
        self.peek(offset).map(|t| t.kind)
    }

    fn advance(&mut self, n: usize) {
        self.idx += n;
    }

    fn eat(&mut self) -> Token {
        let t = self.tokens[self.idx].clone();
        self.idx += 1;
        t
    }

    fn report_expect(&mut self, what: &str) {
        let (message, range) = match self.peek(0) {
            Some(t) => (
                format!("[ParsingError] unexpected {}, expect {}", t.kind.label(), what),
                t.range,
            ),
            None => (
                format!("[ParsingError] unexpected end of file, expect {}", what),
                self.tokens.last().map(|t| t.range).unwrap_or_default(),
            ),
        };
        self.diagnostics.report(Diagnostic::new(Severity::Error, message, range));
    }

    fn is_paragraph_token(&self, kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Comment
                | TokenKind::Text
                | TokenKind::Newline
                | TokenKind::Asterisk
                | TokenKind::Underscore
                | TokenKind::Backtick
                | TokenKind::Equal
                | TokenKind::SquareOpen
                | TokenKind::Exclamation
                | TokenKind::Caret
                | TokenKind::Emoji
                | TokenKind::DateTime
                | TokenKind::Hyphen
                | TokenKind::EnDash
                | TokenKind::EmDash
                | TokenKind::QuoteOpen
                | TokenKind::QuoteClose
                | TokenKind::SquoteOpen
                | TokenKind::SquoteClose
                | TokenKind::LineBreak
                | TokenKind::AccountTag
                | TokenKind::HashTag
                | TokenKind::Colon
                | TokenKind::ColonColon
        )
    }

    // --- driver ------------------------------------------------------------

    pub fn parse_document(&mut self) -> Node {
        let mut root = Node::new(NodeKind::Document { path: None, content: None }, Range::default());
        let mut first_annotation = true;

        while self.is_bound(0) {
            if self.peek_kind(0).map(|k| k.is_line_end()).unwrap_or(false) {
                if !self.annotations.is_empty() {
                    if first_annotation {
                        first_annotation = false;
                        root.annotations = std::mem::take(&mut self.annotations);
                    } else {
                        let range = self.peek(0).map(|t| t.range).unwrap_or_default();
                        let mut node = Node::new(NodeKind::Paragraph, range);
                        node.annotations = std::mem::take(&mut self.annotations);
                        root.push_child(node);
                    }
                }
                self.advance(1);
            }

            if !self.is_bound(0) {
                break;
            }

            if self.peek_kind(0) == Some(TokenKind::AnnotationKey) {
                self.parse_annotation();
                continue;
            }

            match self.parse_block() {
                None => self.advance(1),
                Some(mut node) => {
                    if !self.annotations.is_empty() {
                        node.annotations = std::mem::take(&mut self.annotations);
                    }
                    root.push_child(node);
                }
            }
        }

        root
    }

    fn parse_annotation(&mut self) {
        while self.peek_kind(0) == Some(TokenKind::AnnotationKey) {
            let key = self.eat().content;
            let mut value = String::new();
            if self.peek_kind(0) == Some(TokenKind::AnnotationValue) {
                value = self.eat().content;
            }
            if let Some(existing) = self.annotations.iter_mut().find(|(k, _)| *k == key) {
                existing.1 = value;
            } else {
                self.annotations.push((key, value));
            }
        }
    }

    // --- block dispatch -----------------------------------------------

    fn parse_block(&mut self) -> Option<Node> {
        let kind = self.peek_kind(0)?;
        match kind {
            TokenKind::Comment
            | TokenKind::Text
            | TokenKind::Asterisk
            | TokenKind::Underscore
            | TokenKind::Backtick
            | TokenKind::Equal
            | TokenKind::SquareOpen
            | TokenKind::Exclamation
            | TokenKind::Emoji
            | TokenKind::DateTime
            | TokenKind::Hyphen
            | TokenKind::EnDash
            | TokenKind::EmDash
            | TokenKind::QuoteOpen
            | TokenKind::QuoteClose
            | TokenKind::SquoteOpen
            | TokenKind::SquoteClose
            | TokenKind::LineBreak
            | TokenKind::AccountTag
            | TokenKind::HashTag
            | TokenKind::Colon => self.parse_paragraph(),

            TokenKind::Caret => {
                let is_reference = self.peek_kind(1) == Some(TokenKind::SquareOpen)
                    && self.peek_kind(2) == Some(TokenKind::Raw)
                    && self.peek_kind(3) == Some(TokenKind::SquareClose)
                    && self.peek_kind(4) == Some(TokenKind::Colon)
                    && self.peek_kind(5) == Some(TokenKind::Newline);
                if is_reference {
                    self.parse_reference()
                } else {
                    self.parse_paragraph()
                }
            }

            TokenKind::Head1 | TokenKind::Head2 | TokenKind::Head3 => self.parse_heading(),
            TokenKind::IndentOpen => self.parse_indent(),
            TokenKind::PageBreak => self.parse_page_break(),
            TokenKind::Dinkus => self.parse_dinkus(),
            TokenKind::Question => self.parse_include(),
            TokenKind::Bullet => self.parse_list(TokenKind::Bullet, NodeKind::List),
            TokenKind::Index => self.parse_list(TokenKind::Index, NodeKind::NumberedList),
            TokenKind::Checkbox => self.parse_check_list(),
            TokenKind::Pipe => self.parse_table(),
            TokenKind::FenceOpen => self.parse_code_block(),
            TokenKind::BlockquoteOpen => self.parse_blockquote(),
            TokenKind::Admon => self.parse_admon(),
            _ => None,
        }
    }

    // --- inline dispatch ----------------------------------------------

    fn parse_inline(&mut self) -> Option<Node> {
        let kind = self.peek_kind(0)?;
        match kind {
            TokenKind::Comment => {
                let t = self.eat();
                Some(Node::new(NodeKind::Comment { content: t.content }, t.range))
            }
            TokenKind::Text => {
                let t = self.eat();
                Some(Node::new(NodeKind::Text { content: t.content }, t.range))
            }
            TokenKind::Asterisk => self.parse_style(EmphasisKind::Bold),
            TokenKind::Underscore => self.parse_style(EmphasisKind::Italic),
            TokenKind::Equal => self.parse_highlight(),
            TokenKind::LineBreak => {
                let t = self.eat();
                Some(Node::new(NodeKind::LineBreak, t.range))
            }
            TokenKind::Backtick => self.parse_code(),
            TokenKind::SquareOpen => self.parse_link(),
            TokenKind::Exclamation => self.parse_view(),
            TokenKind::Caret => match self.peek_kind(1) {
                Some(TokenKind::ParenOpen) => self.parse_footnote(),
                Some(TokenKind::SquareOpen) => self.parse_citation(),
                _ => None,
            },
            TokenKind::Emoji => self.parse_emoji(),
            TokenKind::DateTime => self.parse_date_time(),
            TokenKind::Hyphen => self.parse_punct(PunctKind::Hyphen),
            TokenKind::EnDash => self.parse_punct(PunctKind::EnDash),
            TokenKind::EmDash => self.parse_punct(PunctKind::EmDash),
            TokenKind::QuoteOpen => self.parse_punct(PunctKind::QuoteOpen),
            TokenKind::QuoteClose => self.parse_punct(PunctKind::QuoteClose),
            TokenKind::SquoteOpen => self.parse_punct(PunctKind::SquoteOpen),
            TokenKind::SquoteClose => self.parse_punct(PunctKind::SquoteClose),
            TokenKind::AccountTag => {
                let t = self.eat();
                Some(Node::new(NodeKind::AccountTag { resource: t.content }, t.range))
            }
            TokenKind::HashTag => {
                let t = self.eat();
                Some(Node::new(NodeKind::HashTag { resource: t.content }, t.range))
            }
            TokenKind::Colon => {
                let t = self.eat();
                Some(Node::new(NodeKind::Text { content: ":".to_string() }, t.range))
            }
            _ => None,
        }
    }

    fn parse_punct(&mut self, kind: PunctKind) -> Option<Node> {
        let t = self.eat();
        Some(Node::new(NodeKind::Punct { punct: kind }, t.range))
    }

    fn parse_style(&mut self, kind: EmphasisKind) -> Option<Node> {
        let opener = self.eat();
        let closer_kind = opener.kind;
        let mut node = Node::new(NodeKind::Emphasis { emphasis: kind }, opener.range);

        while self.is_bound(0) && self.peek_kind(0) != Some(closer_kind) {
            let child = self.parse_inline()?;
            node.push_child(child);
        }

        if !self.is_bound(0) {
            self.report_expect(closer_kind.label());
            return None;
        }
        let closer = self.eat();
        node.range = node.range.join(&closer.range);
        Some(node)
    }

    fn parse_highlight(&mut self) -> Option<Node> {
        let opener = self.eat();
        let mut node = Node::new(NodeKind::Highlight, opener.range);

        while self.is_bound(0) && self.peek_kind(0) != Some(TokenKind::Equal) {
            let child = self.parse_inline()?;
            node.push_child(child);
        }

        if !self.is_bound(0) {
            self.report_expect("equal");
            return None;
        }
        let closer = self.eat();
        node.range = node.range.join(&closer.range);
        Some(node)
    }

    fn parse_code(&mut self) -> Option<Node> {
        let open = self.eat();
        let mut range = open.range;
        let mut content = String::new();
        if self.peek_kind(0) == Some(TokenKind::Raw) {
            let raw = self.eat();
            content = raw.content;
            range = range.join(&raw.range);
        }
        let mut label = None;
        if self.peek_kind(0) == Some(TokenKind::Backtick) {
            let close1 = self.eat();
            range = range.join(&close1.range);
            if self.peek_kind(0) == Some(TokenKind::Backtick)
                && self.peek_kind(1) == Some(TokenKind::Raw)
                && self.peek_kind(2) == Some(TokenKind::Backtick)
            {
                let open2 = self.eat();
                let raw2 = self.eat();
                let close2 = self.eat();
                label = Some(content);
                content = raw2.content;
                range = range.join(&open2.range).join(&raw2.range).join(&close2.range);
            }
        }
        Some(Node::new(NodeKind::Code { label, content }, range))
    }

    fn parse_link(&mut self) -> Option<Node> {
        let open = self.eat();
        let mut range = open.range;
        let mut resource = None;
        if self.peek_kind(0) == Some(TokenKind::Raw) {
            let r = self.eat();
            range = range.join(&r.range);
            resource = Some(r.content);
        }
        let mut label = None;
        if self.peek_kind(0) == Some(TokenKind::SquareClose) {
            let c = self.eat();
            range = range.join(&c.range);
            if self.peek_kind(0) == Some(TokenKind::ParenOpen) {
                if self.peek_kind(1) == Some(TokenKind::Raw) && self.peek_kind(2) == Some(TokenKind::ParenClose) {
                    let po = self.eat();
                    let lr = self.eat();
                    let pc = self.eat();
                    range = range.join(&po.range).join(&lr.range).join(&pc.range);
                    label = Some(lr.content);
                } else {
                    return None;
                }
            }
        }
        Some(Node::new(
            NodeKind::Link { resource, headings: Vec::new(), label },
            range,
        ))
    }

    fn parse_view(&mut self) -> Option<Node> {
        let bang = self.eat();
        let mut range = bang.range;
        if self.peek_kind(0) == Some(TokenKind::SquareOpen) {
            range = range.join(&self.eat().range);
        }
        let mut resource = None;
        if self.peek_kind(0) == Some(TokenKind::Raw) {
            let r = self.eat();
            range = range.join(&r.range);
            resource = Some(r.content);
        }
        let mut label = None;
        if self.peek_kind(0) == Some(TokenKind::SquareClose) {
            let c = self.eat();
            range = range.join(&c.range);
            if self.peek_kind(0) == Some(TokenKind::ParenOpen) {
                if self.peek_kind(1) == Some(TokenKind::Raw) && self.peek_kind(2) == Some(TokenKind::ParenClose) {
                    let po = self.eat();
                    let lr = self.eat();
                    let pc = self.eat();
                    range = range.join(&po.range).join(&lr.range).join(&pc.range);
                    label = Some(lr.content);
                } else {
                    return None;
                }
            }
        }
        Some(Node::new(NodeKind::View { resource, label }, range))
    }

    fn parse_citation(&mut self) -> Option<Node> {
        let caret = self.eat();
        let mut range = caret.range;
        if self.peek_kind(0) == Some(TokenKind::SquareOpen) {
            range = range.join(&self.eat().range);
        }
        let mut id = String::new();
        if self.peek_kind(0) == Some(TokenKind::Raw) {
            let r = self.eat();
            id = r.content;
            range = range.join(&r.range);
        }
        if self.peek_kind(0) == Some(TokenKind::SquareClose) {
            range = range.join(&self.eat().range);
        }
        Some(Node::new(NodeKind::InText { id }, range))
    }

    fn parse_footnote(&mut self) -> Option<Node> {
        let caret = self.eat();
        let mut range = caret.range;
        if self.peek_kind(0) == Some(TokenKind::ParenOpen) {
            range = range.join(&self.eat().range);
        }
        let desc = if self.peek_kind(0) == Some(TokenKind::Raw) {
            let r = self.eat();
            range = range.join(&r.range);
            Some(r.content)
        } else {
            None
        };
        if self.peek_kind(0) == Some(TokenKind::ParenClose) {
            range = range.join(&self.eat().range);
        }
        desc.map(|desc| Node::new(NodeKind::Footnote { desc }, range))
    }

    fn parse_emoji(&mut self) -> Option<Node> {
        let t = self.eat();
        Some(Node::new(NodeKind::Emoji { code: t.content }, t.range))
    }

    fn parse_date_time(&mut self) -> Option<Node> {
        let t = self.eat();
        let (date, time) = split_date_time(&t.content);
        Some(Node::new(NodeKind::DateTime { date, time }, t.range))
    }

    // --- headings ------------------------------------------------------------

    /// A subtitle is introduced by a newline immediately followed by another
    /// heading-start token of any level, not only the deepest one (a
    /// `head2` heading followed by a `head3` line is a subtitle too).
    fn parse_heading(&mut self) -> Option<Node> {
        let token = self.eat();
        let kind = match token.kind {
            TokenKind::Head3 => HeadingKind::Section,
            TokenKind::Head2 => HeadingKind::Subsection,
            TokenKind::Head1 => HeadingKind::Subsubsection,
            _ => return None,
        };
        let mut heading = Node::new(NodeKind::Heading { heading: kind }, token.range);

        loop {
            if !self.is_bound(0) {
                break;
            }
            match self.parse_inline() {
                Some(node) => heading.push_child(node),
                None => {
                    if self.peek_kind(0) == Some(TokenKind::NewlinePlus) {
                        self.advance(1);
                        break;
                    }
                    if self.peek_kind(0) == Some(TokenKind::Newline) {
                        self.advance(1);
                        if matches!(
                            self.peek_kind(0),
                            Some(TokenKind::Head1) | Some(TokenKind::Head2) | Some(TokenKind::Head3)
                        ) {
                            let subtitle = self.parse_subtitle()?;
                            heading.push_child(subtitle);
                        }
                        break;
                    }
                    self.report_expect("newline or block");
                    return None;
                }
            }
        }
        Some(heading)
    }

    fn parse_subtitle(&mut self) -> Option<Node> {
        let token = self.eat();
        let mut subtitle = Node::new(NodeKind::Subtitle, token.range);
        loop {
            if !self.is_bound(0) {
                break;
            }
            match self.parse_inline() {
                Some(node) => subtitle.push_child(node),
                None => {
                    if self.peek_kind(0) == Some(TokenKind::NewlinePlus) {
                        self.advance(1);
                        break;
                    }
                    if self.peek_kind(0) == Some(TokenKind::Newline) {
                        self.advance(1);
                        break;
                    }
                    self.report_expect("newline or block");
                    return None;
                }
            }
        }
        Some(subtitle)
    }

    // --- scopes --------------------------------------------------------------

    fn parse_indent(&mut self) -> Option<Node> {
        let token = self.eat();
        let mut node = Node::new(NodeKind::Indent, token.range);
        while self.is_bound(0) && self.peek_kind(0) != Some(TokenKind::IndentClose) {
            let block = self.parse_block()?;
            node.push_child(block);
        }
        if self.peek_kind(0) != Some(TokenKind::IndentClose) {
            self.report_expect("indent pop");
            return None;
        }
        let close = self.eat();
        node.range = node.range.join(&close.range);
        if self.peek_kind(0).map(|k| k.is_line_end()).unwrap_or(false) {
            self.advance(1);
        }
        Some(node)
    }

    fn parse_blockquote(&mut self) -> Option<Node> {
        let token = self.eat();
        let mut node = Node::new(NodeKind::Blockquote, token.range);
        while self.is_bound(0) && self.peek_kind(0) != Some(TokenKind::BlockquoteClose) {
            let block = self.parse_block()?;
            node.push_child(block);
        }
        if self.peek_kind(0) != Some(TokenKind::BlockquoteClose) {
            self.report_expect("blockquote pop");
            return None;
        }
        let close = self.eat();
        node.range = node.range.join(&close.range);
        if self.peek_kind(0).map(|k| k.is_line_end()).unwrap_or(false) {
            self.advance(1);
        }
        Some(node)
    }

    fn parse_page_break(&mut self) -> Option<Node> {
        let t = self.eat();
        let node = Node::new(NodeKind::PageBreak, t.range);
        if self.peek_kind(0).map(|k| k.is_line_end()).unwrap_or(false) {
            self.advance(1);
        }
        Some(node)
    }

    fn parse_dinkus(&mut self) -> Option<Node> {
        let t = self.eat();
        let node = Node::new(NodeKind::Dinkus, t.range);
        if self.peek_kind(0).map(|k| k.is_line_end()).unwrap_or(false) {
            self.advance(1);
        }
        Some(node)
    }

    // --- paragraphs and lists --------------------------------------------------

    fn parse_paragraph(&mut self) -> Option<Node> {
        let start_idx = self.idx;
        let start_range = self.peek(0)?.range;
        let mut paragraph = Node::new(NodeKind::Paragraph, start_range);
        let mut seen_newline = false;
        let mut view_index: Option<usize> = None;
        let mut view_count = 0usize;
        let mut other_count = 0usize;

        while self.is_bound(0) && self.is_paragraph_token(self.peek_kind(0).unwrap()) {
            match self.parse_inline() {
                Some(node) => {
                    match &node.kind {
                        NodeKind::Comment { .. } => {}
                        NodeKind::View { .. } => {
                            view_count += 1;
                            view_index = Some(paragraph.children.len());
                        }
                        _ => other_count += 1,
                    }
                    paragraph.push_child(node);
                }
                None => {
                    if self.peek_kind(0) == Some(TokenKind::ColonColon) && !seen_newline {
                        self.idx = start_idx;
                        return self.parse_definition_list();
                    }
                    if self.peek_kind(0) == Some(TokenKind::Newline) {
                        seen_newline = true;
                        if self.peek_kind(1) == Some(TokenKind::IndentOpen) {
                            self.advance(1);
                            match self.parse_indent() {
                                Some(indent) => {
                                    paragraph.push_child(indent);
                                    continue;
                                }
                                None => return None,
                            }
                        }
                        if self.peek_kind(1) == Some(TokenKind::IndentClose) {
                            self.advance(1);
                            continue;
                        }
                        let t = self.eat();
                        paragraph.push_child(Node::new(NodeKind::Space, t.range));
                        continue;
                    }
                    // Any other unparseable paragraph token (e.g. a bare
                    // caret without a footnote/citation lookahead match) is
                    // skipped to guarantee forward progress.
                    self.advance(1);
                }
            }
        }

        if self.peek_kind(0) == Some(TokenKind::NewlinePlus) {
            self.advance(1);
        }

        if other_count == 0 {
            if let Some(idx) = view_index {
                if view_count == 1 {
                    let range = paragraph.range;
                    let mut children = paragraph.children;
                    let mut view = children.remove(idx);
                    view.children = children;
                    view.range = range;
                    return Some(view);
                }
            }
        }

        Some(paragraph)
    }

    fn parse_item(&mut self, item: &mut Node) -> ItemResult {
        while self.is_bound(0) {
            match self.parse_inline() {
                Some(node) => item.push_child(node),
                None => {
                    if self.peek_kind(0) == Some(TokenKind::Newline) {
                        if self.peek_kind(1) == Some(TokenKind::IndentOpen) {
                            self.advance(2);
                            loop {
                                if !self.is_bound(0) {
                                    break;
                                }
                                if self.peek_kind(0) == Some(TokenKind::IndentClose) {
                                    self.advance(1);
                                    break;
                                }
                                match self.parse_block() {
                                    Some(b) => item.push_child(b),
                                    None => {
                                        self.report_expect("indent pop");
                                        return ItemResult::Error;
                                    }
                                }
                            }
                            return ItemResult::Ok;
                        }
                        self.advance(1);
                        return ItemResult::Ok;
                    }
                    if self.peek_kind(0) == Some(TokenKind::NewlinePlus) {
                        self.advance(1);
                        return ItemResult::EarlyExit;
                    }
                    return ItemResult::EarlyExit;
                }
            }
        }
        ItemResult::Ok
    }

    fn parse_list(&mut self, trigger: TokenKind, kind: NodeKind) -> Option<Node> {
        let start_range = self.peek(0)?.range;
        let mut list = Node::new(kind, start_range);
        while self.peek_kind(0) == Some(trigger) {
            let marker = self.eat();
            let mut item = Node::new(NodeKind::Item, marker.range);
            match self.parse_item(&mut item) {
                ItemResult::Error => return None,
                ItemResult::Ok => list.push_child(item),
                ItemResult::EarlyExit => {
                    list.push_child(item);
                    break;
                }
            }
        }
        Some(list)
    }

    fn parse_check_list(&mut self) -> Option<Node> {
        let start_range = self.peek(0)?.range;
        let mut list = Node::new(NodeKind::CheckList, start_range);
        while self.peek_kind(0) == Some(TokenKind::Checkbox) {
            let marker = self.eat();
            let checked = if marker.content.as_bytes().get(1) == Some(&b'x') {
                CheckState::Checked
            } else {
                CheckState::Unchecked
            };
            let mut item = Node::new(NodeKind::CheckItem { checked }, marker.range);
            match self.parse_item(&mut item) {
                ItemResult::Error => return None,
                ItemResult::Ok => list.push_child(item),
                ItemResult::EarlyExit => {
                    list.push_child(item);
                    break;
                }
            }
        }
        Some(list)
    }

    fn parse_definition_list(&mut self) -> Option<Node> {
        let start_range = self.peek(0)?.range;
        let mut list = Node::new(NodeKind::DefinitionList, start_range);

        'outer: while self.is_bound(0) && self.is_paragraph_token(self.peek_kind(0).unwrap()) {
            let item_range = self.peek(0)?.range;
            let mut item_coloncolon = false;
            let mut item = Node::new(NodeKind::DefinitionItem, item_range);
            let mut term = Node::new(NodeKind::DefinitionTerm, item_range);

            while self.is_bound(0) && self.is_paragraph_token(self.peek_kind(0).unwrap()) {
                match self.parse_inline() {
                    Some(node) => term.push_child(node),
                    None => {
                        if self.peek_kind(0) == Some(TokenKind::NewlinePlus) {
                            self.advance(1);
                            break 'outer;
                        }
                        if self.peek_kind(0) == Some(TokenKind::ColonColon) {
                            let desc_range = self.eat().range;
                            let mut desc = Node::new(NodeKind::DefinitionDesc, desc_range);
                            item_coloncolon = true;

                            'desc: while self.is_bound(0) {
                                match self.parse_inline() {
                                    Some(node) => desc.push_child(node),
                                    None => {
                                        if self.peek_kind(0) == Some(TokenKind::Newline) {
                                            if self.peek_kind(1) == Some(TokenKind::IndentOpen) {
                                                self.advance(2);
                                                loop {
                                                    if !self.is_bound(0) {
                                                        break;
                                                    }
                                                    if self.peek_kind(0) == Some(TokenKind::IndentClose) {
                                                        self.advance(1);
                                                        break;
                                                    }
                                                    match self.parse_block() {
                                                        Some(b) => desc.push_child(b),
                                                        None => {
                                                            self.report_expect("indent pop");
                                                            item.push_child(term);
                                                            item.push_child(desc);
                                                            list.push_child(item);
                                                            return Some(list);
                                                        }
                                                    }
                                                }
                                                break 'desc;
                                            }
                                            self.advance(1);
                                            break 'desc;
                                        }
                                        if self.peek_kind(0) == Some(TokenKind::NewlinePlus) {
                                            self.advance(1);
                                            item.push_child(term);
                                            item.push_child(desc);
                                            list.push_child(item);
                                            break 'outer;
                                        }
                                        break 'desc;
                                    }
                                }
                            }

                            item.push_child(term);
                            item.push_child(desc);
                        }
                        break;
                    }
                }
            }

            if item_coloncolon {
                list.push_child(item);
                break;
            }
        }

        Some(list)
    }

    // --- tables ------------------------------------------------------------

    fn parse_table(&mut self) -> Option<Node> {
        let start_range = self.peek(0)?.range;
        let mut alignments: Vec<Alignment> = Vec::new();
        let mut rows: Vec<Node> = Vec::new();
        let mut row_type = RowKind::Header;
        let mut range = start_range;

        while self.peek_kind(0) == Some(TokenKind::Pipe) {
            let pipe = self.eat();
            range = range.join(&pipe.range);

            if matches!(
                self.peek_kind(0),
                Some(TokenKind::Tee) | Some(TokenKind::TeeLeft) | Some(TokenKind::TeeCenter) | Some(TokenKind::TeeRight)
            ) {
                loop {
                    if !self.is_bound(0) {
                        break;
                    }
                    let kind = self.peek_kind(0).unwrap();
                    match kind {
                        TokenKind::Tee | TokenKind::TeeLeft | TokenKind::TeeCenter | TokenKind::TeeRight => {
                            let t = self.eat();
                            range = range.join(&t.range);
                            if row_type == RowKind::Header {
                                let alignment = match kind {
                                    TokenKind::TeeLeft => Alignment::Left,
                                    TokenKind::TeeCenter => Alignment::Center,
                                    TokenKind::TeeRight => Alignment::Right,
                                    _ => Alignment::Default,
                                };
                                alignments.push(alignment);
                            }
                        }
                        TokenKind::Pipe => {
                            let t = self.eat();
                            range = range.join(&t.range);
                        }
                        TokenKind::Newline => {
                            let t = self.eat();
                            range = range.join(&t.range);
                            row_type = next_row_type(row_type);
                            break;
                        }
                        TokenKind::NewlinePlus => {
                            let t = self.eat();
                            range = range.join(&t.range);
                            return Some(finish_table(rows, alignments, row_type, range));
                        }
                        _ => return Some(finish_table(rows, alignments, row_type, range)),
                    }
                }
                continue;
            }

            let mut row = Node::new(NodeKind::Row { row: row_type }, pipe.range);
            loop {
                if !self.is_bound(0) {
                    break;
                }
                let cell_start = self.peek(0).map(|t| t.range).unwrap_or(pipe.range);
                let mut cell = Node::new(NodeKind::Cell, cell_start);
                let mut ends_row = false;
                let mut early_exit = false;
                loop {
                    if !self.is_bound(0) {
                        break;
                    }
                    match self.parse_inline() {
                        Some(node) => cell.push_child(node),
                        None => match self.peek_kind(0) {
                            Some(TokenKind::Pipe) => {
                                self.advance(1);
                                break;
                            }
                            Some(TokenKind::Newline) => {
                                self.advance(1);
                                ends_row = true;
                                break;
                            }
                            Some(TokenKind::NewlinePlus) => {
                                self.advance(1);
                                ends_row = true;
                                early_exit = true;
                                break;
                            }
                            _ => {
                                ends_row = true;
                                early_exit = true;
                                break;
                            }
                        },
                    }
                }
                if ends_row {
                    range = range.join(&row.range);
                    if early_exit {
                        rows.push(row);
                        return Some(finish_table(rows, alignments, row_type, range));
                    }
                    break;
                }
                row.push_child(cell);
            }
            range = range.join(&row.range);
            rows.push(row);
        }

        Some(finish_table(rows, alignments, row_type, range))
    }

    // --- code blocks / admonitions / blockquote-adjacent constructs --------

    fn parse_code_block(&mut self) -> Option<Node> {
        let token = self.eat();
        let mut range = token.range;
        let mut label = None;
        if self.peek_kind(0) == Some(TokenKind::Text) {
            let t = self.eat();
            range = range.join(&t.range);
            label = Some(t.content);
        }
        let mut content = String::new();
        if self.peek_kind(0) == Some(TokenKind::Raw) {
            let t = self.eat();
            range = range.join(&t.range);
            content = t.content;
        }
        if self.peek_kind(0) == Some(TokenKind::FenceClose) {
            let t = self.eat();
            range = range.join(&t.range);
            if self.peek_kind(0).map(|k| k.is_line_end()).unwrap_or(false) {
                self.advance(1);
            }
        }
        Some(Node::new(NodeKind::CodeBlock { label, content }, range))
    }

    fn parse_admon(&mut self) -> Option<Node> {
        let token = self.eat();
        let label = token.content;
        let mut admon = Node::new(NodeKind::Admonition { label }, token.range);

        loop {
            if !self.is_bound(0) || !self.is_paragraph_token(self.peek_kind(0).unwrap()) {
                break;
            }
            match self.parse_inline() {
                Some(node) => admon.push_child(node),
                None => {
                    if self.peek_kind(0) == Some(TokenKind::Newline) {
                        if self.peek_kind(1) == Some(TokenKind::IndentOpen) {
                            let space_range = self.peek(0).unwrap().range;
                            admon.push_child(Node::new(NodeKind::Space, space_range));
                            self.advance(2);
                            loop {
                                if !self.is_bound(0) {
                                    break;
                                }
                                if self.peek_kind(0) == Some(TokenKind::IndentClose) {
                                    self.advance(1);
                                    if self.peek_kind(0).map(|k| k.is_line_end()).unwrap_or(false) {
                                        self.advance(1);
                                    }
                                    return Some(admon);
                                }
                                match self.parse_block() {
                                    Some(b) => admon.push_child(b),
                                    None => {
                                        self.report_expect("indent pop");
                                        return None;
                                    }
                                }
                            }
                            break;
                        }
                        self.advance(1);
                        break;
                    }
                    if self.peek_kind(0) == Some(TokenKind::NewlinePlus) {
                        self.advance(1);
                        return Some(admon);
                    }
                    break;
                }
            }
        }
        Some(admon)
    }

    // --- footnotes / references ----------------------------------------------

    fn parse_reference(&mut self) -> Option<Node> {
        let start_range = self.peek(0)?.range;
        let id = self.peek(2)?.content.clone();
        self.advance(6); // caret squareOpen raw squareClose colon newline
        let mut node = Node::new(NodeKind::Reference { id }, start_range);

        if self.peek_kind(0) == Some(TokenKind::IndentOpen) {
            self.advance(1);
            loop {
                if self.peek_kind(0) == Some(TokenKind::IndentClose) {
                    self.advance(1);
                    break;
                }
                let is_kv = self.peek_kind(0) == Some(TokenKind::Text) && self.peek_kind(1) == Some(TokenKind::Colon);
                if !is_kv {
                    break;
                }
                let key = self.eat().content;
                self.advance(1); // colon
                let info_range = self.peek(0).map(|t| t.range).unwrap_or(start_range);
                let mut info = Node::new(NodeKind::ReferenceInfo { key }, info_range);
                loop {
                    if !self.is_bound(0) {
                        break;
                    }
                    match self.parse_inline() {
                        Some(child) => info.push_child(child),
                        None => break,
                    }
                }
                node.push_child(info);
                if self.is_bound(0) {
                    if self.peek_kind(0) == Some(TokenKind::Newline) {
                        self.advance(1);
                    }
                    if self.peek_kind(0) == Some(TokenKind::NewlinePlus) {
                        self.advance(1);
                        break;
                    }
                }
            }
        }
        Some(node)
    }

    // --- include -------------------------------------------------------------

    fn parse_include(&mut self) -> Option<Node> {
        let token = self.eat();
        let mut range = token.range;
        if self.peek_kind(0) == Some(TokenKind::SquareOpen) {
            range = range.join(&self.eat().range);
        }

        let mut doc_node: Option<Node> = None;
        if self.peek_kind(0) == Some(TokenKind::Raw) {
            let path_tok = self.eat();
            range = range.join(&path_tok.range);
            let rel_path = path_tok.content;

            if self.file_inclusion {
                match self.resolver.resolve(&self.base_dir, &rel_path) {
                    Ok((content, abs_path)) => {
                        let new_base = abs_path
                            .parent()
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|| self.base_dir.clone());
                        let sub_tokens = lexer::lex(&content);
                        let mut sub_parser =
                            Parser::new(sub_tokens, new_base, self.file_inclusion, self.resolver, &mut *self.diagnostics);
                        let sub_root = sub_parser.parse_document();
                        doc_node = Some(Node {
                            kind: NodeKind::Document { path: Some(rel_path), content: Some(content) },
                            range,
                            annotations: sub_root.annotations,
                            children: sub_root.children,
                        });
                    }
                    Err(_) => {
                        doc_node = Some(Node::new(NodeKind::Document { path: Some(rel_path), content: None }, range));
                    }
                }
            } else {
                doc_node = Some(Node::new(NodeKind::Document { path: Some(rel_path), content: None }, range));
            }
        }

        if self.peek_kind(0) == Some(TokenKind::SquareClose) {
            let t = self.eat();
            range = range.join(&t.range);
            if let Some(n) = &mut doc_node {
                n.range = range;
            }
        }
        if self.peek_kind(0).map(|k| k.is_line_end()).unwrap_or(false) {
            self.advance(1);
        }
        doc_node
    }
}

fn next_row_type(current: RowKind) -> RowKind {
    match current {
        RowKind::Header => RowKind::Content,
        RowKind::Content => RowKind::Footer,
        RowKind::Footer => RowKind::Footer,
    }
}

/// Retype an all-header table to all-content when no separator row ever
/// appeared.
fn finish_table(mut rows: Vec<Node>, alignments: Vec<Alignment>, final_type: RowKind, range: Range) -> Node {
    if final_type == RowKind::Header {
        for row in &mut rows {
            if let NodeKind::Row { row: kind } = &mut row.kind {
                *kind = RowKind::Content;
            }
        }
    }
    Node::with_children(NodeKind::Table { alignments }, range, rows)
}

fn split_date_time(content: &str) -> (Option<String>, Option<String>) {
    if let Some(idx) = content.find(' ') {
        (Some(content[..idx].to_string()), Some(content[idx + 1..].to_string()))
    } else if content.contains(':') {
        (None, Some(content.to_string()))
    } else {
        (Some(content.to_string()), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::include::FsIncludeResolver;

    fn parse_str(source: &str) -> Node {
        let mut sink = CollectingSink::default();
        let resolver = FsIncludeResolver;
        parse(source, PathBuf::from("."), true, &resolver, &mut sink)
    }

    #[test]
    fn heading_with_subtitle_matches_scenario_1() {
        let doc = parse_str(">> Title\n> Subtitle\n");
        assert_eq!(doc.children.len(), 1);
        match &doc.children[0].kind {
            NodeKind::Heading { heading } => assert_eq!(*heading, HeadingKind::Subsection),
            other => panic!("unexpected kind: {:?}", other),
        }
        assert_eq!(doc.children[0].children.len(), 2);
        matches!(doc.children[0].children[1].kind, NodeKind::Subtitle);
    }

    #[test]
    fn duplicate_annotation_keys_overwrite_rather_than_accumulate() {
        let mut sink = CollectingSink::default();
        let resolver = FsIncludeResolver;
        let tokens = crate::lexer::lex("foo: 1\nfoo: 2\n");
        let mut parser = Parser::new(tokens, PathBuf::from("."), true, &resolver, &mut sink);
        parser.parse_annotation();
        parser.advance(1); // skip the newline between the two annotation lines
        parser.parse_annotation();
        assert_eq!(parser.annotations, vec![("foo".to_string(), "2".to_string())]);
    }

    #[test]
    fn emphasis_round_trip_matches_scenario_2() {
        let doc = parse_str("*bold _italic_ bold*\n");
        let para = &doc.children[0];
        assert!(matches!(para.kind, NodeKind::Paragraph));
        assert_eq!(para.children.len(), 1);
        match &para.children[0].kind {
            NodeKind::Emphasis { emphasis } => assert_eq!(*emphasis, EmphasisKind::Bold),
            other => panic!("unexpected kind: {:?}", other),
        }
        assert_eq!(para.children[0].children.len(), 3);
    }

    #[test]
    fn view_only_paragraph_collapse_widens_range_over_trailing_comment() {
        let doc = parse_str("![res]~trailing");
        let view = &doc.children[0];
        assert!(matches!(view.kind, NodeKind::View { .. }));
        assert!(view.ranges_well_formed());
    }

    #[test]
    fn check_list_with_nested_indent_matches_scenario_4() {
        let doc = parse_str("[x] done\n\titem\n[ ] todo\n");
        assert_eq!(doc.children.len(), 1);
        match &doc.children[0].kind {
            NodeKind::CheckList => {}
            other => panic!("unexpected kind: {:?}", other),
        }
        let items = &doc.children[0].children;
        assert_eq!(items.len(), 2);
        match &items[0].kind {
            NodeKind::CheckItem { checked } => assert_eq!(*checked, CheckState::Checked),
            other => panic!("unexpected kind: {:?}", other),
        }
        assert!(items[0].children.iter().any(|c| matches!(c.kind, NodeKind::Indent)));
        match &items[1].kind {
            NodeKind::CheckItem { checked } => assert_eq!(*checked, CheckState::Unchecked),
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn table_with_alignments_matches_scenario_5() {
        let doc = parse_str("| A | B | C |\n|:--|:-:|--:|\n| 1 | 2 | 3 |\n");
        match &doc.children[0].kind {
            NodeKind::Table { alignments } => {
                assert_eq!(alignments, &vec![Alignment::Left, Alignment::Center, Alignment::Right]);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        let rows = &doc.children[0].children;
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0].kind, NodeKind::Row { row: RowKind::Header }));
        assert!(matches!(rows[1].kind, NodeKind::Row { row: RowKind::Content }));
    }

    #[test]
    fn definition_list_promotion_matches_scenario_6() {
        let doc = parse_str("term :: definition\n");
        assert_eq!(doc.children.len(), 1);
        assert!(matches!(doc.children[0].kind, NodeKind::DefinitionList));
        let item = &doc.children[0].children[0];
        assert!(matches!(item.kind, NodeKind::DefinitionItem));
        assert!(matches!(item.children[0].kind, NodeKind::DefinitionTerm));
        assert!(matches!(item.children[1].kind, NodeKind::DefinitionDesc));
    }

    #[test]
    fn fenced_code_matches_scenario_7() {
        let doc = parse_str("---- rust\nfn main(){}\n----\n");
        match &doc.children[0].kind {
            NodeKind::CodeBlock { label, content } => {
                assert_eq!(label.as_deref(), Some("rust"));
                assert_eq!(content, "fn main(){}");
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn include_disabled_matches_scenario_8() {
        let mut sink = CollectingSink::default();
        let resolver = FsIncludeResolver;
        let doc = parse("?[other.gr]\n", PathBuf::from("."), false, &resolver, &mut sink);
        assert_eq!(doc.children.len(), 1);
        match &doc.children[0].kind {
            NodeKind::Document { path, content } => {
                assert_eq!(path.as_deref(), Some("other.gr"));
                assert!(content.is_none());
            }
            other => panic!("unexpected kind: {:?}", other),
        }
        assert!(doc.children[0].children.is_empty());
    }

    #[test]
    fn heading_type_mapping_is_pinned() {
        let doc = parse_str(">>> Deepest\n");
        match &doc.children[0].kind {
            NodeKind::Heading { heading } => assert_eq!(*heading, HeadingKind::Subsubsection),
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn range_containment_holds_for_every_parsed_node() {
        let doc = parse_str("*bold* and `code` and [res](label)\n");
        assert!(doc.ranges_well_formed());
    }
}
