//! Keyword declaration scanner.
//!
//! A note declares a keyword with a block such as:
//!
//! ```text
//! <keyword name="Pythagoras">
//! ### Claim
//! a^2 + b^2 = c^2
//! </keyword>
//! ```
//!
//! Only the `name` attribute matters to the index; the body is skipped. The
//! scanner is a single forward pass over the text: it tokenizes opening and
//! closing tags, then pairs them with a one-slot stack. Anything that does not
//! pair up cleanly is reported as a [`DeclarationIssue`] instead of being
//! guessed at.

use crate::error::{Result, TnetError};
use std::fmt;
use std::ops::Range;

const OPEN_TAG: &[u8] = b"<keyword";
const CLOSE_TAG: &[u8] = b"</keyword>";
const NAME_ATTR: &[u8] = b"name=\"";

/// One well-formed declaration block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Value of the `name` attribute
    pub name: String,
    /// Byte range from the opening `<` to the end of `</keyword>`
    pub span: Range<usize>,
    /// 1-based line of the opening tag
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Opening tag never closed
    UnclosedBlock,
    /// Opening tag found while another block is still open
    NestedBlock,
    /// Closing tag without an open block
    StrayClose,
    /// `<keyword` tag without a well-formed `name="..."` attribute
    MalformedOpenTag,
    /// `name=""`, as left behind by the new-note template. The block is
    /// still declared under the empty name.
    EmptyName,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::UnclosedBlock => write!(f, "keyword block is never closed"),
            IssueKind::NestedBlock => write!(f, "keyword block opened inside another block"),
            IssueKind::StrayClose => write!(f, "closing tag without an open keyword block"),
            IssueKind::MalformedOpenTag => write!(f, "opening tag has no valid name attribute"),
            IssueKind::EmptyName => write!(f, "keyword name is empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationIssue {
    pub kind: IssueKind,
    /// Byte offset of the offending tag
    pub offset: usize,
    pub line: usize,
}

/// Result of a lenient scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub declarations: Vec<Declaration>,
    pub issues: Vec<DeclarationIssue>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug)]
enum Token<'a> {
    Open { name: &'a str, start: usize },
    MalformedOpen { start: usize },
    Close { start: usize, end: usize },
}

/// Scan `content`, collecting every declaration and every problem found.
pub fn scan(content: &str) -> ScanReport {
    let lines = LineIndex::new(content);
    let mut report = ScanReport::default();
    let mut open: Option<(&str, usize)> = None;

    let issue = |report: &mut ScanReport, kind, offset| {
        report.issues.push(DeclarationIssue {
            kind,
            offset,
            line: lines.line_of(offset),
        });
    };

    for token in Tokenizer::new(content) {
        match token {
            Token::Open { name, start } => {
                if open.is_some() {
                    issue(&mut report, IssueKind::NestedBlock, start);
                } else {
                    open = Some((name, start));
                }
            }
            Token::MalformedOpen { start } => issue(&mut report, IssueKind::MalformedOpenTag, start),
            Token::Close { start, end } => match open.take() {
                Some((name, open_start)) => {
                    // Still declared; the issue only flags it for `check`
                    if name.is_empty() {
                        issue(&mut report, IssueKind::EmptyName, open_start);
                    }
                    report.declarations.push(Declaration {
                        name: name.to_string(),
                        span: open_start..end,
                        line: lines.line_of(open_start),
                    });
                }
                None => issue(&mut report, IssueKind::StrayClose, start),
            },
        }
    }

    if let Some((_, open_start)) = open {
        issue(&mut report, IssueKind::UnclosedBlock, open_start);
    }

    report.issues.sort_by_key(|i| i.offset);
    report
}

/// Strict parse: any issue is an error.
pub fn parse(content: &str) -> Result<Vec<Declaration>> {
    let report = scan(content);
    match report.issues.first() {
        Some(issue) => Err(TnetError::MalformedDeclaration {
            line: issue.line,
            reason: issue.kind.to_string(),
        }),
        None => Ok(report.declarations),
    }
}

struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Tokenizer { text, pos: 0 }
    }

    /// Parse the remainder of an opening tag that starts at `start`.
    ///
    /// Returns the name and the offset just past `>`.
    fn open_tag(&self, start: usize) -> Option<(&'a str, usize)> {
        let bytes = self.text.as_bytes();
        let mut i = start + OPEN_TAG.len();

        let ws_start = i;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i == ws_start || !bytes[i..].starts_with(NAME_ATTR) {
            return None;
        }
        i += NAME_ATTR.len();

        let name_start = i;
        while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'>' {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'"' {
            return None;
        }
        let name = &self.text[name_start..i];
        i += 1;

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'>' {
            Some((name, i + 1))
        } else {
            None
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() {
            let start = self.pos + self.text[self.pos..].find('<')?;
            let rest = &bytes[start..];

            if rest.starts_with(CLOSE_TAG) {
                let end = start + CLOSE_TAG.len();
                self.pos = end;
                return Some(Token::Close { start, end });
            }

            // `<keyword` must be followed by whitespace or `>` to be our tag;
            // `<keywords>` and friends are ordinary text.
            let is_keyword_tag = rest.starts_with(OPEN_TAG)
                && rest
                    .get(OPEN_TAG.len())
                    .map_or(true, |b| b.is_ascii_whitespace() || *b == b'>');
            if is_keyword_tag {
                return Some(match self.open_tag(start) {
                    Some((name, end)) => {
                        self.pos = end;
                        Token::Open { name, start }
                    }
                    None => {
                        self.pos = start + OPEN_TAG.len();
                        Token::MalformedOpen { start }
                    }
                });
            }

            self.pos = start + 1;
        }
        None
    }
}

/// Maps byte offsets to 1-based line numbers.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}
