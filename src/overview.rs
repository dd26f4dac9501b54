//! Overview rows for the OVER and XOVER commands.

use crate::models::StoredArticle;

/// Collapse internal CR, LF and TAB to single spaces so a header value
/// cannot break the tab-separated row format.
pub fn unfold(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_was_space = false;
    for c in value.chars() {
        if c == '\r' || c == '\n' || c == '\t' {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            last_was_space = c == ' ';
            out.push(c);
        }
    }
    out
}

/// One tab-separated overview row: number, Subject, From, Date, Message-ID,
/// References, :bytes, :lines.
///
/// `:bytes` is reported as twice the body length and `:lines` as the count
/// of CRLF-separated segments, matching the wire format readers already
/// depend on.
pub fn overview_line(entry: &StoredArticle) -> String {
    let a = &entry.article;
    let subject = unfold(a.header("Subject").unwrap_or_default());
    let from = unfold(a.header("From").unwrap_or_default());
    let date = unfold(a.header("Date").unwrap_or_default());
    let refs = unfold(a.header("References").unwrap_or_default());
    let bytes = a.body.len() * 2;
    let lines = a.body.split("\r\n").count();

    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        entry.link.number, subject, from, date, a.message_id, refs, bytes, lines
    )
}
