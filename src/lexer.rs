//! The context-sensitive lexer.
//!
//! Scanning alternates between block-start mode (prefix + block openers,
//! entered at the start of every logical line) and inline mode (everything
//! else, up to the next newline). Bracket, brace, and backtick content all
//! fold into a single generic `raw` token kind rather than each getting its
//! own delimited content kind.

use crate::position::{Position, Range};
use crate::token::{Token, TokenKind};
use memchr::memchr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrefixElement {
    Indent,
    Blockquote,
}

pub struct Lexer<'a> {
    bytes: &'a [u8],
    idx: usize,
    pos: Position,
    prev_pos: Position,
    prefix: Vec<PrefixElement>,
    tokens: Vec<Token>,
    pending_text: Option<(Position, String)>,
}

/// Tokenise a full document buffer. Deterministic, no I/O.
pub fn lex(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    lexer.run();
    lexer.tokens
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            bytes: source.as_bytes(),
            idx: 0,
            pos: Position::start(),
            prev_pos: Position::start(),
            prefix: Vec::new(),
            tokens: Vec::new(),
            pending_text: None,
        }
    }

    // --- cursor -----------------------------------------------------

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.idx + offset).copied()
    }

    fn cur(&self) -> Option<u8> {
        self.peek(0)
    }

    fn is_at(&self, offset: usize, b: u8) -> bool {
        self.peek(offset) == Some(b)
    }

    fn at_end(&self) -> bool {
        self.idx >= self.bytes.len()
    }

    /// Consume one byte, updating line/column bookkeeping.
    fn bump(&mut self) -> u8 {
        let b = self.bytes[self.idx];
        self.prev_pos = self.pos;
        if b == b'\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        self.idx += 1;
        b
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    /// True for a byte immediately preceding a quote mark that opens it:
    /// start of input, whitespace, or opener punctuation.
    fn is_opener_context(prev: Option<u8>) -> bool {
        match prev {
            None => true,
            Some(b) => b.is_ascii_whitespace() || matches!(b, b'(' | b'[' | b'{' | b'"' | b'\''),
        }
    }

    // --- token emission ----------------------------------------------

    fn flush_text(&mut self) {
        if let Some((start, content)) = self.pending_text.take() {
            let range = Range::new(start, self.prev_pos);
            self.tokens.push(Token::new(TokenKind::Text, content, range));
        }
    }

    fn push_text_str(&mut self, start: Position, s: &str) {
        match &mut self.pending_text {
            Some((_, buf)) => buf.push_str(s),
            None => self.pending_text = Some((start, s.to_string())),
        }
    }

    fn push(&mut self, kind: TokenKind, content: impl Into<String>, start: Position, end: Position) {
        self.flush_text();
        self.tokens.push(Token::new(kind, content, Range::new(start, end)));
    }

    /// Structural (zero-width) token: prefix open/close markers.
    fn push_structural(&mut self, kind: TokenKind) {
        self.flush_text();
        self.tokens
            .push(Token::structural(kind, Range::at(self.pos)));
    }

    fn last_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|t| t.kind)
    }

    // --- driver --------------------------------------------------------

    fn run(&mut self) {
        if self.bytes.is_empty() {
            return;
        }
        self.lex_block_start();
        while !self.at_end() {
            self.lex_inline_unit();
        }
        self.flush_text();
    }

    /// Consume the line's prefix (indent/block-quote) and try the
    /// block-opener table; anything left on the line is picked up by the
    /// ordinary inline loop in `run`.
    fn lex_block_start(&mut self) {
        self.lex_prefix();
        self.lex_block_openers();
    }

    // --- prefix diffing --------------------------------------------------

    fn lex_prefix(&mut self) {
        let mut current = Vec::new();
        loop {
            if self.is_at(0, b'\t') {
                current.push(PrefixElement::Indent);
                self.bump();
                continue;
            }
            if self.is_at(0, b'/') && self.is_at(1, b' ') {
                current.push(PrefixElement::Blockquote);
                self.bump_n(2);
                continue;
            }
            if self.is_at(0, b'/')
                && matches!(self.peek(1), None | Some(b'\n') | Some(b'\t'))
            {
                current.push(PrefixElement::Blockquote);
                self.bump();
                continue;
            }
            break;
        }

        let common = self
            .prefix
            .iter()
            .zip(current.iter())
            .take_while(|(a, b)| a == b)
            .count();

        for elem in self.prefix[common..].iter().rev() {
            let kind = match elem {
                PrefixElement::Indent => TokenKind::IndentClose,
                PrefixElement::Blockquote => TokenKind::BlockquoteClose,
            };
            self.push_structural(kind);
        }
        for elem in &current[common..] {
            let kind = match elem {
                PrefixElement::Indent => TokenKind::IndentOpen,
                PrefixElement::Blockquote => TokenKind::BlockquoteOpen,
            };
            self.push_structural(kind);
        }

        self.prefix = current;
    }

    // --- block openers -----------------------------------------------

    fn lex_block_openers(&mut self) {
        if self.at_end() {
            return;
        }
        match self.cur().unwrap() {
            b'>' => self.lex_heading_mark(),
            b'-' => self.lex_dash_block_opener(),
            b'[' => self.lex_checkbox(),
            b'|' => self.lex_table_row_start(),
            b'<' => self.lex_angle_block_opener(),
            b'*' => self.lex_dinkus(),
            b'1'..=b'9' => self.lex_index(),
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.lex_annotation(),
            _ => {}
        }
    }

    fn lex_heading_mark(&mut self) {
        let start = self.pos;
        let mut count = 0usize;
        while self.is_at(0, b'>') {
            self.bump();
            count += 1;
        }
        if count <= 3 && self.is_at(0, b' ') {
            self.bump();
            let kind = match count {
                1 => TokenKind::Head3,
                2 => TokenKind::Head2,
                _ => TokenKind::Head1,
            };
            self.push(kind, ">".repeat(count), start, self.prev_pos);
        } else {
            let text = ">".repeat(count);
            self.push_text_str(start, &text);
        }
    }

    fn lex_dash_block_opener(&mut self) {
        let save_idx = self.idx;
        let save_pos = self.pos;
        let start = self.pos;
        let mut count = 0usize;
        while self.is_at(0, b'-') {
            self.bump();
            count += 1;
        }
        match count {
            1 if self.is_at(0, b' ') => {
                self.bump();
                self.push(TokenKind::Bullet, "-", start, self.prev_pos);
            }
            n if n >= 3 => self.lex_fence(n, start),
            _ => {
                // Not a block opener (bullet needs a following space; a bare
                // double dash is left for inline `enDash` handling).
                self.idx = save_idx;
                self.pos = save_pos;
            }
        }
    }

    fn lex_fence(&mut self, open_count: usize, start: Position) {
        let open_indent = self.prefix.iter().filter(|e| **e == PrefixElement::Indent).count();
        self.push(
            TokenKind::FenceOpen,
            "-".repeat(open_count),
            start,
            self.prev_pos,
        );

        // Optional language tag, then the rest of the opening line is
        // discarded up to (not including) the newline.
        while self.is_at(0, b' ') {
            self.bump();
        }
        let lang_start = self.pos;
        let mut lang = String::new();
        while let Some(b) = self.cur() {
            if b == b'\n' {
                break;
            }
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
                lang.push(b as char);
                self.bump();
            } else {
                break;
            }
        }
        if !lang.is_empty() {
            self.push(TokenKind::Text, lang, lang_start, self.prev_pos);
        }
        // Skip any stray trailing bytes up to the newline (malformed tags).
        while let Some(b) = self.cur() {
            if b == b'\n' {
                break;
            }
            self.bump();
        }
        if self.is_at(0, b'\n') {
            self.bump();
        }

        let body_start = self.pos;
        let mut body = String::new();
        let mut closed = false;
        loop {
            if self.at_end() {
                break;
            }
            if self.is_at(0, b'-') {
                let line_begin_idx = self.idx;
                let line_begin_pos = self.pos;
                let mut dashes = 0usize;
                while self.is_at(0, b'-') {
                    self.bump();
                    dashes += 1;
                }
                let terminated = self.at_end() || self.is_at(0, b'\n');
                if dashes == open_count && terminated {
                    closed = true;
                    break;
                }
                self.idx = line_begin_idx;
                self.pos = line_begin_pos;
            }
            if self.is_at(0, b'\n') {
                body.push('\n');
                self.bump();
                let mut line_indent = 0usize;
                while self.is_at(0, b'\t') {
                    self.bump();
                    line_indent += 1;
                }
                if line_indent > open_indent {
                    for _ in 0..(line_indent - open_indent) {
                        body.push('\t');
                    }
                }
                continue;
            }
            body.push(self.bytes[self.idx] as char);
            self.bump();
        }
        let trimmed = body.trim_matches('\n');
        self.push(TokenKind::Raw, trimmed, body_start, self.prev_pos);
        let close_start = self.prev_pos;
        if closed {
            self.push(
                TokenKind::FenceClose,
                "-".repeat(open_count),
                close_start,
                self.prev_pos,
            );
        }
    }

    fn lex_checkbox(&mut self) {
        if (self.is_at(1, b' ') || self.is_at(1, b'x')) && self.is_at(2, b']') && self.is_at(3, b' ') {
            let start = self.pos;
            let marker = if self.is_at(1, b' ') { "[ ]" } else { "[x]" };
            self.bump_n(3);
            self.push(TokenKind::Checkbox, marker, start, self.prev_pos);
            while self.is_at(0, b' ') {
                self.bump();
            }
        }
    }

    fn lex_table_row_start(&mut self) {
        let start = self.pos;
        self.bump();
        self.push(TokenKind::Pipe, "|", start, self.prev_pos);
        if !(self.is_at(0, b'-') || self.is_at(0, b':')) {
            return;
        }
        loop {
            if self.at_end() || self.is_at(0, b'\n') {
                break;
            }
            if self.is_at(0, b'|') {
                let s = self.pos;
                self.bump();
                self.push(TokenKind::Pipe, "|", s, self.prev_pos);
                continue;
            }
            if self.is_at(0, b'-') || self.is_at(0, b':') {
                let s = self.pos;
                let left_colon = self.is_at(0, b':');
                if left_colon {
                    self.bump();
                }
                while self.is_at(0, b'-') {
                    self.bump();
                }
                let right_colon = self.is_at(0, b':');
                if right_colon {
                    self.bump();
                }
                let (kind, text) = match (left_colon, right_colon) {
                    (true, true) => (TokenKind::TeeCenter, ":-:"),
                    (true, false) => (TokenKind::TeeLeft, ":--"),
                    (false, true) => (TokenKind::TeeRight, "--:"),
                    (false, false) => (TokenKind::Tee, "--"),
                };
                self.push(kind, text, s, self.prev_pos);
                continue;
            }
            break;
        }
    }

    fn lex_angle_block_opener(&mut self) {
        if self.is_at(1, b'<') && self.is_at(2, b'<') {
            let start = self.pos;
            self.bump_n(3);
            self.push(TokenKind::PageBreak, "<<<", start, self.prev_pos);
            return;
        }
        let save_idx = self.idx;
        let save_pos = self.pos;
        let start = self.pos;
        self.bump();
        let inner_start_idx = self.idx;
        while let Some(b) = self.cur() {
            if b == b'>' || b == b'\n' {
                break;
            }
            self.bump();
        }
        if self.is_at(0, b'>') {
            let inner = std::str::from_utf8(&self.bytes[inner_start_idx..self.idx])
                .unwrap_or("")
                .to_string();
            if let Some(kind) = admon_kind(&inner) {
                self.bump();
                self.push(kind, inner, start, self.prev_pos);
                while self.is_at(0, b' ') {
                    self.bump();
                }
                return;
            }
        }
        self.idx = save_idx;
        self.pos = save_pos;
    }

    fn lex_dinkus(&mut self) {
        if self.is_at(1, b'*') && self.is_at(2, b'*') {
            let terminated = matches!(self.peek(3), None | Some(b'\n'));
            if terminated {
                let start = self.pos;
                self.bump_n(3);
                self.push(TokenKind::Dinkus, "***", start, self.prev_pos);
            }
        }
    }

    fn lex_index(&mut self) {
        let save_idx = self.idx;
        let save_pos = self.pos;
        let start = self.pos;
        let mut digits = String::new();
        while let Some(b) = self.cur() {
            if b.is_ascii_digit() {
                digits.push(b as char);
                self.bump();
            } else {
                break;
            }
        }
        if self.is_at(0, b'.') && self.is_at(1, b' ') {
            self.bump_n(2);
            self.push(TokenKind::Index, digits, start, self.prev_pos);
        } else {
            self.idx = save_idx;
            self.pos = save_pos;
        }
    }

    fn lex_annotation(&mut self) {
        let save_idx = self.idx;
        let save_pos = self.pos;
        let start = self.pos;
        let mut key = String::new();
        let first = self.bytes[self.idx];
        key.push(first as char);
        self.bump();
        while let Some(b) = self.cur() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                key.push(b as char);
                self.bump();
            } else {
                break;
            }
        }
        if self.is_at(0, b':') && self.is_at(1, b' ') {
            self.bump_n(2);
            self.push(TokenKind::AnnotationKey, key, start, self.prev_pos);
            let value_start = self.pos;
            let value_start_idx = self.idx;
            while let Some(b) = self.cur() {
                if b == b'\n' {
                    break;
                }
                self.bump();
            }
            let value = std::str::from_utf8(&self.bytes[value_start_idx..self.idx])
                .unwrap_or("")
                .to_string();
            self.push(TokenKind::AnnotationValue, value, value_start, self.prev_pos);
        } else {
            self.idx = save_idx;
            self.pos = save_pos;
        }
    }

    // --- inline scanning ---------------------------------------------

    fn lex_inline_unit(&mut self) {
        let b = self.bytes[self.idx];
        match b {
            b'\n' => self.lex_newline(),
            b'\\' => self.lex_escape(),
            b'~' => self.lex_comment(),
            b'\'' => self.lex_quote(b'\'', TokenKind::SquoteOpen, TokenKind::SquoteClose),
            b'"' => self.lex_quote(b'"', TokenKind::QuoteOpen, TokenKind::QuoteClose),
            b'-' => self.lex_dash_inline(),
            b':' => self.lex_colon(),
            b'[' => self.lex_bracketed(b'[', b']', TokenKind::SquareOpen, TokenKind::SquareClose),
            b'(' => self.lex_bracketed(b'(', b')', TokenKind::ParenOpen, TokenKind::ParenClose),
            b'!' => self.lex_single(TokenKind::Exclamation, "!"),
            b'?' => self.lex_single(TokenKind::Question, "?"),
            b'^' => self.lex_single(TokenKind::Caret, "^"),
            b'|' => self.lex_pipe_inline(),
            b'<' => self.lex_date_time(),
            b'*' => self.lex_single(TokenKind::Asterisk, "*"),
            b'_' => self.lex_single(TokenKind::Underscore, "_"),
            b'`' => self.lex_backtick(),
            b'=' => self.lex_single(TokenKind::Equal, "="),
            b'@' => self.lex_tag(b'@', TokenKind::AccountTag),
            b'#' => self.lex_tag(b'#', TokenKind::HashTag),
            _ => self.lex_text_byte(),
        }
    }

    fn lex_newline(&mut self) {
        let start = self.pos;
        let mut count = 0usize;
        while self.is_at(0, b'\n') {
            self.bump();
            count += 1;
        }
        let kind = if count == 1 {
            TokenKind::Newline
        } else {
            TokenKind::NewlinePlus
        };
        self.push(kind, "\n".repeat(count), start, self.prev_pos);
        if !self.at_end() {
            self.lex_block_start();
        }
    }

    fn lex_escape(&mut self) {
        let start = self.pos;
        self.bump();
        if let Some(b) = self.cur() {
            self.bump();
            self.push_text_str(start, &(b as char).to_string());
        }
    }

    fn lex_comment(&mut self) {
        let start = self.pos;
        let content_start = self.idx;
        self.bump();
        let rest = &self.bytes[self.idx..];
        let run = memchr(b'\n', rest).unwrap_or(rest.len());
        self.bump_n(run);
        let content = std::str::from_utf8(&self.bytes[content_start..self.idx])
            .unwrap_or("")
            .to_string();
        self.push(TokenKind::Comment, content, start, self.prev_pos);
    }

    fn lex_quote(&mut self, byte: u8, open: TokenKind, close: TokenKind) {
        let start = self.pos;
        let prev_byte = if self.idx == 0 {
            None
        } else {
            Some(self.bytes[self.idx - 1])
        };
        debug_assert_eq!(self.bytes[self.idx], byte);
        self.bump();
        let kind = if Self::is_opener_context(prev_byte) {
            open
        } else {
            close
        };
        let text = (byte as char).to_string();
        self.push(kind, text, start, self.prev_pos);
    }

    fn lex_dash_inline(&mut self) {
        let start = self.pos;
        if self.is_at(1, b'-') && self.is_at(2, b'-') {
            self.bump_n(3);
            self.push(TokenKind::EmDash, "---", start, self.prev_pos);
        } else if self.is_at(1, b'-') {
            self.bump_n(2);
            self.push(TokenKind::EnDash, "--", start, self.prev_pos);
        } else {
            self.bump();
            self.push(TokenKind::Hyphen, "-", start, self.prev_pos);
        }
    }

    fn lex_colon(&mut self) {
        let start = self.pos;
        let save_idx = self.idx;
        let save_pos = self.pos;
        self.bump();
        let code_start = self.idx;
        while let Some(b) = self.cur() {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'+' | b'-') {
                self.bump();
            } else {
                break;
            }
        }
        let code_len = self.idx - code_start;
        if code_len > 0 && self.is_at(0, b':') {
            let code = std::str::from_utf8(&self.bytes[code_start..self.idx])
                .unwrap_or("")
                .to_string();
            self.bump();
            self.push(TokenKind::Emoji, code, start, self.prev_pos);
            return;
        }
        self.idx = save_idx;
        self.pos = save_pos;
        if self.is_at(1, b':') {
            self.bump_n(2);
            self.push(TokenKind::ColonColon, "::", start, self.prev_pos);
        } else {
            self.bump();
            self.push(TokenKind::Colon, ":", start, self.prev_pos);
        }
    }

    /// `[...]`/`(...)` scanning shared by link/view/include resources
    /// The lexer emits only the delimiters and a generic `raw` span for
    /// their content; the parser assigns meaning to that content.
    fn lex_bracketed(&mut self, open_byte: u8, close_byte: u8, open_kind: TokenKind, close_kind: TokenKind) {
        let start = self.pos;
        self.bump();
        self.push(open_kind, (open_byte as char).to_string(), start, self.prev_pos);

        let raw_start = self.pos;
        let mut content = String::new();
        let mut depth = 0usize;
        loop {
            match self.cur() {
                None => break,
                Some(b) if b == close_byte && depth == 0 => break,
                Some(b) if b == open_byte => {
                    depth += 1;
                    content.push(b as char);
                    self.bump();
                }
                Some(b) if b == close_byte => {
                    depth -= 1;
                    content.push(b as char);
                    self.bump();
                }
                Some(b'\\') => {
                    self.bump();
                    if let Some(escaped) = self.cur() {
                        content.push(escaped as char);
                        self.bump();
                    }
                }
                Some(b) => {
                    content.push(b as char);
                    self.bump();
                }
            }
        }
        if !content.is_empty() || self.is_at(0, close_byte) {
            self.push(TokenKind::Raw, content, raw_start, self.prev_pos);
        }
        if self.is_at(0, close_byte) {
            let s = self.pos;
            self.bump();
            self.push(close_kind, (close_byte as char).to_string(), s, self.prev_pos);
        }
    }

    fn lex_backtick(&mut self) {
        let start = self.pos;
        self.bump();
        self.push(TokenKind::Backtick, "`", start, self.prev_pos);

        let raw_start = self.pos;
        let raw_start_idx = self.idx;
        while let Some(b) = self.cur() {
            if b == b'`' || b == b'\n' {
                break;
            }
            self.bump();
        }
        let content = std::str::from_utf8(&self.bytes[raw_start_idx..self.idx])
            .unwrap_or("")
            .to_string();
        self.push(TokenKind::Raw, content, raw_start, self.prev_pos);

        if self.is_at(0, b'`') {
            let s = self.pos;
            self.bump();
            self.push(TokenKind::Backtick, "`", s, self.prev_pos);
        }
    }

    fn lex_single(&mut self, kind: TokenKind, text: &str) {
        let start = self.pos;
        self.bump();
        self.push(kind, text, start, self.prev_pos);
    }

    fn lex_pipe_inline(&mut self) {
        if let Some((_, buf)) = &mut self.pending_text {
            let trimmed_len = buf.trim_end_matches(' ').len();
            buf.truncate(trimmed_len);
        }
        let start = self.pos;
        self.bump();
        self.push(TokenKind::Pipe, "|", start, self.prev_pos);
    }

    fn lex_date_time(&mut self) {
        let save_idx = self.idx;
        let save_pos = self.pos;
        let start = self.pos;
        self.bump();
        let inner_start = self.idx;
        while let Some(b) = self.cur() {
            if b == b'>' || b == b'\n' {
                break;
            }
            self.bump();
        }
        if self.is_at(0, b'>') {
            let inner = std::str::from_utf8(&self.bytes[inner_start..self.idx]).unwrap_or("");
            if is_date(inner) || is_time(inner) || is_date_time(inner) {
                let content = inner.to_string();
                self.bump();
                self.push(TokenKind::DateTime, content, start, self.prev_pos);
                return;
            }
        }
        self.idx = save_idx;
        self.pos = save_pos;
        self.lex_text_byte();
    }

    fn lex_tag(&mut self, sigil: u8, kind: TokenKind) {
        let save_idx = self.idx;
        let save_pos = self.pos;
        let start = self.pos;
        self.bump();
        let sym_start = self.idx;
        while let Some(b) = self.cur() {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-') {
                self.bump();
            } else {
                break;
            }
        }
        if self.idx > sym_start {
            let sym = std::str::from_utf8(&self.bytes[sym_start..self.idx])
                .unwrap_or("")
                .to_string();
            self.push(kind, sym, start, self.prev_pos);
        } else {
            self.idx = save_idx;
            self.pos = save_pos;
            self.lex_text_byte();
        }
        let _ = sigil;
    }

    fn lex_text_byte(&mut self) {
        let start = self.pos;
        let idx = self.idx;
        self.bump();
        let s = std::str::from_utf8(&self.bytes[idx..self.idx]).unwrap_or("?");
        self.push_text_str(start, s);
    }
}

fn admon_kind(word: &str) -> Option<TokenKind> {
    match word {
        "note" | "hint" | "important" | "warning" | "seealso" | "tip" => Some(TokenKind::Admon),
        _ => None,
    }
}

fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

fn is_date(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() == 10
        && is_digit(b[0])
        && is_digit(b[1])
        && is_digit(b[2])
        && is_digit(b[3])
        && b[4] == b'-'
        && is_digit(b[5])
        && is_digit(b[6])
        && b[7] == b'-'
        && is_digit(b[8])
        && is_digit(b[9])
}

fn is_time(text: &str) -> bool {
    let b = text.as_bytes();
    (b.len() == 5 && is_digit(b[0]) && is_digit(b[1]) && b[2] == b':' && is_digit(b[3]) && is_digit(b[4]))
        || (b.len() == 8
            && is_digit(b[0])
            && is_digit(b[1])
            && b[2] == b':'
            && is_digit(b[3])
            && is_digit(b[4])
            && b[5] == b':'
            && is_digit(b[6])
            && is_digit(b[7]))
}

fn is_date_time(text: &str) -> bool {
    if text.len() == 16 {
        is_date(&text[0..10]) && is_time(&text[11..16])
    } else if text.len() == 19 {
        is_date(&text[0..10]) && is_time(&text[11..19])
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn heading_with_subtitle_tokenises_head2_then_head1() {
        let ks = kinds(">> Title\n> Subtitle\n");
        assert_eq!(
            ks,
            vec![
                TokenKind::Head2,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Head3,
                TokenKind::Text,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn quote_disambiguation_matches_scenario_3() {
        let toks = lex("she said \"hi\"");
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text,
                TokenKind::QuoteOpen,
                TokenKind::Text,
                TokenKind::QuoteClose,
            ]
        );
    }

    #[test]
    fn emphasis_nesting_tokenises_as_asterisk_underscore_pairs() {
        let ks = kinds("*bold _italic_ bold*");
        assert_eq!(
            ks,
            vec![
                TokenKind::Asterisk,
                TokenKind::Text,
                TokenKind::Underscore,
                TokenKind::Text,
                TokenKind::Underscore,
                TokenKind::Text,
                TokenKind::Asterisk,
            ]
        );
    }

    #[test]
    fn prefix_diffing_emits_matched_pairs_for_nested_indent() {
        let toks = lex("[x] done\n\titem\n[ ] todo\n");
        let ks: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert!(ks.contains(&TokenKind::IndentOpen));
        assert!(ks.contains(&TokenKind::IndentClose));
        let open_pos = ks.iter().position(|k| *k == TokenKind::IndentOpen).unwrap();
        let close_pos = ks.iter().position(|k| *k == TokenKind::IndentClose).unwrap();
        assert!(open_pos < close_pos);
    }

    #[test]
    fn table_separator_row_emits_tee_family() {
        let toks = lex("| A | B | C |\n|:--|:-:|--:|\n| 1 | 2 | 3 |\n");
        let ks: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert!(ks.contains(&TokenKind::TeeLeft));
        assert!(ks.contains(&TokenKind::TeeCenter));
        assert!(ks.contains(&TokenKind::TeeRight));
    }

    #[test]
    fn fenced_code_emits_raw_body_and_matching_close() {
        let toks = lex("---- rust\nfn main(){}\n----\n");
        let ks: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            ks,
            vec![
                TokenKind::FenceOpen,
                TokenKind::Text,
                TokenKind::Raw,
                TokenKind::FenceClose,
                TokenKind::Newline,
            ]
        );
        let raw = toks.iter().find(|t| t.kind == TokenKind::Raw).unwrap();
        assert_eq!(raw.content, "fn main(){}");
    }

    #[test]
    fn definition_marker_tokenises_as_coloncolon() {
        let ks = kinds("term :: definition\n");
        assert!(ks.contains(&TokenKind::ColonColon));
    }

    #[test]
    fn include_directive_tokenises_question_bracket_raw() {
        let ks = kinds("?[other.gr]\n");
        assert_eq!(
            ks,
            vec![
                TokenKind::Question,
                TokenKind::SquareOpen,
                TokenKind::Raw,
                TokenKind::SquareClose,
                TokenKind::Newline,
            ]
        );
    }
}
