use crate::error::{ImportError, Result};

/// One logical line of the ledger, split into fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number the record starts on
    pub line: u64,
    /// Fields separated by single spaces. Runs of spaces produce empty fields,
    /// so an indented line starts with an empty field.
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub text: String,
    /// Whether the field was written as a `"..."` string
    pub quoted: bool,
}

impl Field {
    fn is_separator_artifact(&self) -> bool {
        !self.quoted && self.text.is_empty()
    }
}

impl Record {
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(Field::is_separator_artifact)
    }

    pub fn is_indented(&self) -> bool {
        self.fields
            .first()
            .is_some_and(Field::is_separator_artifact)
    }

    /// Fields without the empty ones from repeated spaces. Empty quoted strings are kept.
    pub fn tokens(&self) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|field| !field.is_separator_artifact())
            .collect()
    }

    pub fn items(&self) -> Vec<&str> {
        self.tokens()
            .into_iter()
            .map(|field| field.text.as_str())
            .collect()
    }
}

/// Split ledger content into records.
///
/// Fields are separated by spaces or tabs. A field can be enclosed in double quotes to include
/// spaces or line breaks, and `""` inside quotes is an escaped quote. A quote may only open a
/// field and close it right before a separator or the end of the line. A field starting with
/// `;` comments out the rest of its line.
pub fn tokenize(content: &str) -> Result<Vec<Record>> {
    let (content, layouts) = scan(content)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b' ')
        .flexible(true)
        .from_reader(content.as_bytes());
    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| ImportError::InvalidFile(err.to_string()))?;
    if records.len() != layouts.len() {
        return Err(ImportError::InvalidFile(format!(
            "Expected {} records but read {}",
            layouts.len(),
            records.len()
        )));
    }
    records
        .into_iter()
        .zip(layouts)
        .map(|(record, layout)| {
            if record.len() != layout.quoted.len() {
                return Err(ImportError::InvalidFile(format!(
                    "Line {}: Expected {} fields but read {}",
                    layout.line,
                    layout.quoted.len(),
                    record.len()
                )));
            }
            Ok(Record {
                line: layout.line,
                fields: record
                    .iter()
                    .zip(layout.quoted)
                    .map(|(text, quoted)| Field {
                        text: text.to_string(),
                        quoted,
                    })
                    .collect(),
            })
        })
        .collect()
}

/// Where a record starts and which of its fields are quoted.
#[derive(Debug, PartialEq, Eq)]
struct RecordLayout {
    line: u64,
    quoted: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    RecordStart,
    FieldStart,
    Unquoted,
    Quoted,
    AfterQuote,
    Comment,
}

struct Scanner {
    output: String,
    layouts: Vec<RecordLayout>,
    record: Option<RecordLayout>,
    state: ScanState,
    line: u64,
    quote_line: u64,
}

/// Check the quoting of every record and prepare the content for the csv reader. Tabs outside
/// of quotes become spaces and comments are removed, which leaves comment-only lines empty.
fn scan(content: &str) -> Result<(String, Vec<RecordLayout>)> {
    let mut scanner = Scanner {
        output: String::with_capacity(content.len()),
        layouts: vec![],
        record: None,
        state: ScanState::RecordStart,
        line: 1,
        quote_line: 1,
    };
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        let state = scanner.state;
        match state {
            ScanState::Quoted => {
                scanner.output.push(c);
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        scanner.output.push('"');
                    } else {
                        scanner.state = ScanState::AfterQuote;
                    }
                }
            }
            ScanState::Comment => {
                if is_line_end(c) {
                    scanner.end_line(c);
                }
            }
            _ => scanner.scan_unquoted(c)?,
        }
        if c == '\n' {
            scanner.line += 1;
        }
    }
    if scanner.state == ScanState::Quoted {
        return Err(ImportError::InvalidFile(format!(
            "Line {}: Quoted string is never closed",
            scanner.quote_line
        )));
    }
    scanner.end_record();
    Ok((scanner.output, scanner.layouts))
}

impl Scanner {
    fn scan_unquoted(&mut self, c: char) -> Result<()> {
        let c = if c == '\t' { ' ' } else { c };
        if is_line_end(c) {
            self.end_line(c);
            return Ok(());
        }
        match (self.state, c) {
            (ScanState::RecordStart, ' ') => {
                self.begin_field();
                self.begin_field();
                self.output.push(' ');
                self.state = ScanState::FieldStart;
            }
            (_, ' ') => {
                self.begin_field();
                self.output.push(' ');
                self.state = ScanState::FieldStart;
            }
            (ScanState::RecordStart | ScanState::FieldStart, ';') => {
                self.state = ScanState::Comment;
            }
            (ScanState::RecordStart | ScanState::FieldStart, '"') => {
                if self.state == ScanState::RecordStart {
                    self.begin_field();
                }
                self.mark_quoted();
                self.quote_line = self.line;
                self.output.push('"');
                self.state = ScanState::Quoted;
            }
            (ScanState::Unquoted, '"') => {
                return Err(ImportError::InvalidFile(format!(
                    "Line {}: Quote inside of an unquoted field",
                    self.line
                )));
            }
            (ScanState::AfterQuote, c) => {
                return Err(ImportError::InvalidFile(format!(
                    "Line {}: Unexpected '{c}' after a closing quote",
                    self.line
                )));
            }
            (state, c) => {
                if state == ScanState::RecordStart {
                    self.begin_field();
                }
                self.output.push(c);
                self.state = ScanState::Unquoted;
            }
        }
        Ok(())
    }

    fn begin_field(&mut self) {
        match &mut self.record {
            Some(record) => record.quoted.push(false),
            None => {
                self.record = Some(RecordLayout {
                    line: self.line,
                    quoted: vec![false],
                })
            }
        }
    }

    fn mark_quoted(&mut self) {
        if let Some(quoted) = self
            .record
            .as_mut()
            .and_then(|record| record.quoted.last_mut())
        {
            *quoted = true;
        }
    }

    fn end_line(&mut self, c: char) {
        self.output.push(c);
        self.end_record();
        self.state = ScanState::RecordStart;
    }

    fn end_record(&mut self) {
        if let Some(record) = self.record.take() {
            self.layouts.push(record);
        }
    }
}

fn is_line_end(c: char) -> bool {
    c == '\n' || c == '\r'
}
