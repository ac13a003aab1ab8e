//! Splits accumulated assistant text into prose and fenced code segments.
//!
//! [`segment`] is a pure function of its input. It is called again on every
//! streamed update with the whole text received so far, so segments that are
//! already resolved (`Text`, `CodeComplete`) never change as more text
//! arrives; only the trailing segment can.

use serde::{Deserialize, Serialize};

const FENCE: &str = "```";

/// Filename parsed from the first line of a code block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filename {
    /// Everything before the last `.` (may contain path separators).
    pub name: String,
    /// Everything after the last `.`; empty when the line was not a filename.
    pub extension: String,
}

impl Filename {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
        }
    }

    /// Parses a filename-like line.
    ///
    /// `src/App.tsx` becomes `{ name: "src/App", extension: "tsx" }`. Lines
    /// that do not look like a filename are kept whole as the name.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some((name, extension)) = raw.rsplit_once('.')
            && !name.is_empty()
            && !extension.is_empty()
            && !raw.chars().any(char::is_whitespace)
            && extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Self::new(name, extension);
        }
        Self::new(raw, "")
    }

    /// Human-readable title: `todo-list_app` becomes `Todo List App`.
    pub fn title(&self) -> String {
        self.name
            .split(['-', '_'])
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// File label for the given 1-based version: `app.tsx`, `app-v2.tsx`, ...
    pub fn version_label(&self, version: usize) -> String {
        let mut label = self.name.clone();
        if version != 1 {
            label.push_str(&format!("-v{version}"));
        }
        if !self.extension.is_empty() {
            label.push('.');
            label.push_str(&self.extension);
        }
        label
    }
}

/// One classified unit of assistant output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Segment {
    /// Narrative prose between or around code fences.
    Text { content: String },
    /// A fenced code block whose closing fence has arrived.
    CodeComplete { filename: Filename, content: String },
    /// The trailing code fence that is still open.
    CodeGenerating,
}

/// Returns the first completed code block, if any.
pub fn first_code_block(segments: &[Segment]) -> Option<(&Filename, &str)> {
    segments.iter().find_map(|segment| match segment {
        Segment::CodeComplete { filename, content } => Some((filename, content.as_str())),
        _ => None,
    })
}

/// Splits `text` into ordered segments.
///
/// Never fails: text without fences is a single `Text` segment, and a block
/// without a recognizable filename keeps its whole first line as the name.
/// At most one `CodeGenerating` segment is produced, always last.
pub fn segment(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = text;
    loop {
        let Some(open) = lines(rest).find(|line| is_opening_fence(line.text)) else {
            push_text(&mut segments, rest);
            break;
        };
        push_text(&mut segments, &rest[..open.start]);

        let info = &open.text.trim_end()[FENCE.len()..];
        let body = &rest[open.end..];
        let Some(close) = lines(body).find(|line| is_closing_fence(line.text)) else {
            segments.push(Segment::CodeGenerating);
            break;
        };

        let (filename, content) = split_filename(info, &body[..close.start]);
        segments.push(Segment::CodeComplete {
            filename,
            content: content.to_string(),
        });
        rest = &body[close.end..];
    }
    segments
}

fn push_text(segments: &mut Vec<Segment>, content: &str) {
    if !content.is_empty() {
        segments.push(Segment::Text {
            content: content.to_string(),
        });
    }
}

/// A line of input with byte offsets into the text it was cut from.
struct Line<'a> {
    /// Line content without the trailing `\n`.
    text: &'a str,
    start: usize,
    /// Offset just past the line terminator.
    end: usize,
}

fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        Line {
            text: raw.strip_suffix('\n').unwrap_or(raw),
            start,
            end: offset,
        }
    })
}

fn is_opening_fence(line: &str) -> bool {
    line.trim_end()
        .strip_prefix(FENCE)
        .is_some_and(|tag| !tag.contains('`'))
}

fn is_closing_fence(line: &str) -> bool {
    line.trim_end() == FENCE
}

/// Resolves the block filename and the code that follows it.
///
/// A `{filename=...}` attribute on the fence line takes precedence; otherwise
/// the first non-empty line of the block is the filename and is not part of
/// the content.
fn split_filename<'a>(info: &str, block: &'a str) -> (Filename, &'a str) {
    if let Some(name) = filename_attribute(info) {
        return (Filename::parse(name), block);
    }
    match lines(block).find(|line| !line.text.trim().is_empty()) {
        Some(line) => (Filename::parse(line.text), &block[line.end..]),
        None => (Filename::default(), block),
    }
}

fn filename_attribute(info: &str) -> Option<&str> {
    let open = info.find('{')?;
    let close = open + info[open..].find('}')?;
    let (key, value) = info[open + 1..close].split_once('=')?;
    (key.trim() == "filename")
        .then(|| value.trim())
        .filter(|value| !value.is_empty())
}
