//! PDF export of a summary report
//!
//! Plain text laid out on A4 pages in a built-in Helvetica face. Built-in
//! fonts only cover Latin-1, so other characters are replaced and emoji
//! are dropped.

use printpdf::{BuiltinFont, Mm, PdfDocument};

use super::error::ToolError;

/// Characters per line before wrapping
const WRAP_COLUMNS: usize = 90;
const LINES_PER_PAGE: usize = 42;
const FONT_SIZE: f32 = 11.0;

/// Keep what the built-in font can draw
fn printable(line: &str) -> String {
    line.chars()
        .filter_map(|c| match c {
            '\t' => Some(' '),
            '\u{2022}' | '\u{2013}' | '\u{2014}' => Some('-'),
            '\u{2018}' | '\u{2019}' => Some('\''),
            '\u{201c}' | '\u{201d}' => Some('"'),
            c if c as u32 > 0xffff => None,
            c if c.is_control() => None,
            c if (c as u32) < 0x100 => Some(c),
            _ => Some('?'),
        })
        .collect()
}

/// Word-wrap one line; a word longer than a line is split
fn wrap(line: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > columns {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..columns).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > columns {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lines of `text` grouped into pages
fn paginate(text: &str) -> Vec<Vec<String>> {
    let lines: Vec<String> = text
        .lines()
        .flat_map(|line| wrap(&printable(line), WRAP_COLUMNS))
        .collect();
    if lines.is_empty() {
        return vec![Vec::new()];
    }
    lines.chunks(LINES_PER_PAGE).map(<[String]>::to_vec).collect()
}

/// Render `text` as a PDF document
pub fn render_pdf(title: &str, text: &str) -> Result<Vec<u8>, ToolError> {
    let render_error = |e: printpdf::Error| ToolError::Data {
        what: "the PDF report".to_string(),
        reason: e.to_string(),
    };

    let (doc, first_page, first_layer) = PdfDocument::new(title, Mm(210.0), Mm(297.0), "Text");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(render_error)?;

    let mut first = Some((first_page, first_layer));
    for page_lines in paginate(text) {
        let (page, layer) = match first.take() {
            Some(first) => first,
            None => doc.add_page(Mm(210.0), Mm(297.0), "Text"),
        };
        let layer = doc.get_page(page).get_layer(layer);

        let mut y = 277.0;
        for line in page_lines {
            layer.use_text(line, FONT_SIZE, Mm(20.0), Mm(y), &font);
            y -= 6.0;
        }
    }

    doc.save_to_bytes().map_err(render_error)
}
