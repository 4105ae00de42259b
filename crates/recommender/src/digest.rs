//! Recommendation digest rendering
//!
//! Produces the HTML body of the daily email: a greeting, one table row
//! per paper (score, linked title, authors, cropped abstract) and an
//! unsubscribe pointer. Every inserted string is HTML-escaped.

use chrono::{DateTime, Utc};
use sanity_ranking::RenderedPaper;
use std::fmt::Write;

const TEMPLATE: &str = r#"
<!DOCTYPE HTML>
<html>

<head>
<style>
body {
    font-family: Arial, sans-serif;
}
.s {
    font-weight: bold;
    margin-right: 10px;
}
.a {
    color: #333;
}
.u {
    font-size: 12px;
    color: #333;
    margin-bottom: 10px;
}
</style>
</head>

<body>

<br><br>
<div>Good morning! Here are your daily <a href="__SITE__">arxiv-sanity-lite</a> recommendations of very recent papers:</div>
<br><br>

<div>
    __CONTENT__
</div>

<br><br>
<div>
To stop these emails remove your email in your <a href="__SITE__/profile">account</a> settings.
</div>
<br><br>

</body>
</html>
"#;

/// Rendering settings
#[derive(Debug, Clone)]
pub struct DigestOptions {
    /// Site linked from the greeting and the unsubscribe note
    pub site_url: String,
    /// Abstracts longer than this many characters are cropped
    pub summary_chars: usize,
}

/// Subject line for a digest sent at `now`, e.g. "Nov 27 Arxiv Sanity Lite recommendations"
pub fn subject_line(now: DateTime<Utc>) -> String {
    format!("{} Arxiv Sanity Lite recommendations", now.format("%b %d"))
}

/// First `max_chars` characters, with "..." appended when anything was cut
pub fn crop_summary(summary: &str, max_chars: usize) -> String {
    match summary.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &summary[..end]),
        None => summary.to_string(),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render papers, in order, into the digest HTML
pub fn render_digest(papers: &[RenderedPaper], options: &DigestOptions) -> String {
    let mut rows = String::from("<table>");
    for paper in papers {
        // writing to a String cannot fail
        let _ = write!(
            rows,
            r#"
<tr>
<td valign="top"><div class="s">{:.2}</div></td>
<td>
<a href="{}">{}</a>
<div class="a">{}</div>
<div class="u">{}</div>
</td>
</tr>
"#,
            paper.weight,
            escape_html(&paper.link),
            escape_html(&paper.title),
            escape_html(&paper.authors),
            escape_html(&crop_summary(&paper.summary, options.summary_chars)),
        );
    }
    rows.push_str("</table>");

    let site = escape_html(options.site_url.trim_end_matches('/'));
    TEMPLATE
        .replace("__SITE__", &site)
        .replace("__CONTENT__", &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn paper(id: &str, weight: f64, summary: &str) -> RenderedPaper {
        RenderedPaper {
            id: id.to_string(),
            title: format!("Title <{}>", id),
            authors: "Ada Lovelace, Alan Turing".to_string(),
            time: "Nov 27 2021".to_string(),
            summary: summary.to_string(),
            link: format!("https://arxiv.org/abs/{}", id),
            weight,
        }
    }

    fn options() -> DigestOptions {
        DigestOptions {
            site_url: "https://arxiv-sanity-lite.com/".to_string(),
            summary_chars: 500,
        }
    }

    #[test]
    fn test_crop_summary() {
        assert_eq!(crop_summary("short", 10), "short");
        assert_eq!(crop_summary("exactly10!", 10), "exactly10!");
        assert_eq!(crop_summary("abcdefghijkl", 10), "abcdefghij...");
        // multi-byte characters are counted, not bytes
        assert_eq!(crop_summary("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_render_digest() {
        let long = "x".repeat(600);
        let html = render_digest(&[paper("2101.1", 12.5, &long), paper("2101.2", -3.0, "ok")], &options());

        assert!(html.contains("Good morning!"));
        assert!(html.contains(r#"<a href="https://arxiv-sanity-lite.com">arxiv-sanity-lite</a>"#));
        assert!(html.contains(r#"<a href="https://arxiv-sanity-lite.com/profile">account</a>"#));
        assert!(html.contains(r#"<div class="s">12.50</div>"#));
        assert!(html.contains(r#"<div class="s">-3.00</div>"#));
        assert!(html.contains("Title &lt;2101.1&gt;"));
        assert!(html.contains(&format!("{}...", "x".repeat(500))));
        assert!(!html.contains(&"x".repeat(501)));
        // order preserved
        assert!(html.find("2101.1").unwrap() < html.find("2101.2").unwrap());
        assert!(!html.contains("__CONTENT__"));
    }

    #[test]
    fn test_subject_line() {
        let now = Utc.with_ymd_and_hms(2021, 11, 27, 8, 0, 0).unwrap();
        assert_eq!(subject_line(now), "Nov 27 Arxiv Sanity Lite recommendations");
    }
}
