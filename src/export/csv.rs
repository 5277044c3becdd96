//! Minimal CSV codec for the collection exchange format
//!
//! Output quotes every field and doubles embedded quotes. Input accepts
//! quoted or bare fields, `\n` or `\r\n` line ends and newlines inside
//! quoted fields.

/// Byte-order mark written at the start of exported files
pub const BOM: char = '\u{feff}';

/// Quote one field
pub fn quote_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Render one row
pub fn write_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| quote_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a whole document: BOM, then rows joined by newlines
pub fn write_document(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push(BOM);
    out.push_str(
        &rows
            .iter()
            .map(|row| write_row(row))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    out
}

/// Parsed row with the line it started on (1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Parse a document into records, skipping blank lines
///
/// An unterminated quoted field runs to the end of the input.
pub fn parse_document(text: &str) -> Vec<Record> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_record(&mut records, record_line, fields);
    }

    records
}

fn push_record(records: &mut Vec<Record>, line: usize, fields: Vec<String>) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        records.push(Record { line, fields });
    }
}
