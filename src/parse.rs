use crate::models::Article;
use chrono::TimeZone;
use nom::IResult;
use nom::{
    bytes::complete::{is_not, take_till, take_while1},
    character::complete::{char, crlf, space0, space1},
    combinator::opt,
    multi::separated_list1,
    sequence::preceded,
};

#[derive(Debug, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

/// Parse a single NNTP command line as described in RFC 3977
/// Section 3.1 "Commands and Responses". Only the verb is case-folded.
pub fn parse_command(input: &str) -> IResult<&str, Command> {
    let (input, name) = take_while1(|c: char| c.is_ascii_alphabetic())(input)?;
    let (input, args) = opt(preceded(space1, separated_list1(space1, is_not(" \r\n"))))(input)?;
    let (input, _) = opt(crlf)(input)?;
    let args_vec = args
        .unwrap_or_default()
        .into_iter()
        .map(|s: &str| s.to_string())
        .collect();
    Ok((
        input,
        Command {
            name: name.to_ascii_uppercase(),
            args: args_vec,
        },
    ))
}

/// Parse a single article header line including folded continuation
/// lines as defined in RFC 3977 Section 3.6 "Articles".
fn parse_header_line(mut input: &str) -> IResult<&str, (String, String)> {
    let (i, name) = take_while1(|c: char| c != ':' && c != '\r' && c != '\n')(input)?;
    let (i, _) = char(':')(i)?;
    let (i, _) = space0(i)?;
    let (i, value) = take_till(|c| c == '\r' || c == '\n')(i)?;
    let (mut i, _) = crlf(i)?;
    let mut val = value.to_string();

    while i.starts_with(' ') || i.starts_with('\t') {
        let (next, _) = take_while1(|c| c == ' ' || c == '\t')(i)?;
        let (next, cont) = take_till(|c| c == '\r' || c == '\n')(next)?;
        let (next, _) = crlf(next)?;
        val.push(' ');
        val.push_str(cont);
        i = next;
    }

    input = i;
    Ok((input, (name.to_string(), val)))
}

/// Parse the header block of an article until the blank line
/// separating headers from the body.
fn parse_headers(mut input: &str) -> IResult<&str, Vec<(String, String)>> {
    let mut headers = Vec::new();
    loop {
        if let Some(rest) = input.strip_prefix("\r\n") {
            input = rest;
            break;
        }
        if input.is_empty() {
            break;
        }
        let (next, header) = parse_header_line(input)?;
        headers.push(header);
        input = next;
    }
    Ok((input, headers))
}

/// Parse a raw article into structured form.
///
/// The header block before the separating blank line is retained verbatim
/// in `raw_headers`; the parsed copies drive overview rows and header
/// rewriting. Returns `None` if the header block does not parse or carries
/// no Message-ID.
pub fn parse_article(raw: &str) -> Option<Article> {
    let header_end = raw.find("\r\n\r\n");
    let raw_headers = match header_end {
        Some(idx) => &raw[..idx + 2],
        None => raw,
    };
    let (rest, headers) = parse_headers(raw).ok()?;
    let body = rest.to_string();
    let message_id = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Message-ID"))
        .map(|(_, v)| v.trim().to_string())?;
    Some(Article {
        message_id,
        headers,
        raw_headers: raw_headers.to_string(),
        body,
    })
}

/// Article range argument accepted by several commands: `N`, `N-`, `N-M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleRange {
    Single(u64),
    From(u64),
    Bounded(u64, u64),
}

impl ArticleRange {
    /// Resolve to inclusive bounds given the group's current high watermark.
    pub fn bounds(self, high_watermark: u64) -> (u64, u64) {
        match self {
            ArticleRange::Single(n) => (n, n),
            ArticleRange::From(lo) => (lo, high_watermark),
            ArticleRange::Bounded(lo, hi) => (lo, hi),
        }
    }
}

/// Parse the range grammar used by LISTGROUP, HDR and OVER as defined in
/// RFC 3977 Section 6.1.2. Any other shape is a syntax error.
pub fn parse_range(spec: &str) -> Option<ArticleRange> {
    if let Some((lo_s, hi_s)) = spec.split_once('-') {
        let lo: u64 = lo_s.parse().ok()?;
        if hi_s.is_empty() {
            Some(ArticleRange::From(lo))
        } else {
            let hi: u64 = hi_s.parse().ok()?;
            Some(ArticleRange::Bounded(lo, hi))
        }
    } else {
        spec.parse().ok().map(ArticleRange::Single)
    }
}

/// Parse the date and time arguments used by the NEWGROUPS command as
/// described in RFC 3977 Section 7.3.1.
pub fn parse_datetime(
    date: &str,
    time: &str,
    gmt: bool,
) -> Result<chrono::DateTime<chrono::Utc>, &'static str> {
    if !(date.len() == 6 || date.len() == 8) || !date.chars().all(|c| c.is_ascii_digit()) {
        return Err("invalid date");
    }
    if time.len() != 6 || !time.chars().all(|c| c.is_ascii_digit()) {
        return Err("invalid time");
    }
    let fmt = if date.len() == 6 { "%y%m%d" } else { "%Y%m%d" };
    let naive_date = chrono::NaiveDate::parse_from_str(date, fmt).map_err(|_| "invalid date")?;
    let naive_time =
        chrono::NaiveTime::parse_from_str(time, "%H%M%S").map_err(|_| "invalid time")?;
    let naive = naive_date.and_time(naive_time);
    Ok(if gmt {
        chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(naive, chrono::Utc)
    } else {
        chrono::Local
            .from_local_datetime(&naive)
            .single()
            .ok_or("invalid local time")?
            .with_timezone(&chrono::Utc)
    })
}
