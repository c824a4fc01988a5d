//! Markup reading for the category index (HTML) and partition feeds (RSS).
//!
//! The index page is machine generated and stable, so its `<select>` is
//! scraped with regexes; feeds go through `feed-rs`.

use std::sync::OnceLock;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::Regex;

use jw_core::{
    domain::{Category, RawItem},
    errors::Error,
    Result,
};

fn category_select_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<select\b[^>]*\bname\s*=\s*["']category["'][^>]*>(.*?)</select>"#)
            .expect("valid regex")
    })
}

fn option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<option\b[^>]*\bvalue\s*=\s*["']([^"']*)["'][^>]*>(.*?)</option>"#)
            .expect("valid regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Options of the `<select name="category">` control, in page order.
///
/// Returns an empty list when the control is missing; the catalog decides
/// whether that is fatal.
pub fn parse_categories(html: &str) -> Vec<Category> {
    let Some(select) = category_select_re().captures(html).and_then(|c| c.get(1)) else {
        return Vec::new();
    };

    option_re()
        .captures_iter(select.as_str())
        .filter_map(|cap| {
            let id = unescape(cap.get(1)?.as_str()).trim().to_string();
            let name = unescape(&strip_tags(cap.get(2)?.as_str())).trim().to_string();
            Some(Category { id, name })
        })
        .collect()
}

/// Entries of an RSS document, in document order.
///
/// Entries lacking a title or link are dropped; a missing or unreadable
/// `pubDate` is kept as an empty string and rejected later by the detector.
pub fn parse_items(xml: &str) -> Result<Vec<RawItem>> {
    let feed = feed_rs::parser::parse(xml.as_bytes())
        .map_err(|e| Error::Parse(format!("feed: {e}")))?;

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content.trim().to_string())?;
            let link = entry.links.first().map(|l| l.href.trim().to_string())?;
            if title.is_empty() || link.is_empty() {
                return None;
            }
            let published = entry
                .published
                .map(|at| at.to_rfc2822())
                .unwrap_or_default();
            Some(RawItem {
                title,
                link,
                published,
            })
        })
        .collect())
}

fn strip_tags(s: &str) -> String {
    tag_re().replace_all(s, "").into_owned()
}

/// Decode HTML entities; text that does not decode cleanly is kept as is.
fn unescape(s: &str) -> String {
    match unescape_with(s, resolve_html5_entity) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
<html><body>
  <form>
    <select name="city"><option value="Kyiv">Київ</option></select>
    <select class="big" name="category">
      <option value="">Всі категорії</option>
      <option value=".NET">.NET</option>
      <option value="Front End" selected>Front End</option>
      <option value="QA">QA &amp; Testing</option>
    </select>
  </form>
</body></html>"#;

    #[test]
    fn categories_come_from_the_category_select_only() {
        let cats = parse_categories(INDEX);
        let names: Vec<_> = cats.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Всі категорії", ".NET", "Front End", "QA & Testing"]);
        assert_eq!(cats[0].id, "", "blank ids are filtered by the catalog");
        assert_eq!(cats[2].id, "Front End");
    }

    #[test]
    fn missing_select_yields_nothing() {
        assert!(parse_categories("<html><body>maintenance</body></html>").is_empty());
    }

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0"><channel>
  <title>Вакансії</title>
  <link>https://jobs.dou.ua/</link>
  <description>DOU</description>
  <item>
    <title>Senior Rust Engineer в Acme, віддалено</title>
    <link>https://jobs.dou.ua/companies/acme/vacancies/100/?utm_source=jobsrss</link>
    <description>&lt;p&gt;Rust &amp;amp; Tokio&lt;/p&gt;</description>
    <pubDate>Thu, 01 Oct 2026 12:03:00 +0300</pubDate>
  </item>
  <item>
    <title><![CDATA[QA & Automation]]></title>
    <link>https://jobs.dou.ua/companies/b/vacancies/101/?utm_source=jobsrss</link>
    <pubDate>Thu, 01 Oct 2026 11:00:00 +0300</pubDate>
  </item>
  <item>
    <title>No link here</title>
  </item>
</channel></rss>"#;

    #[test]
    fn items_keep_document_order_and_dates() {
        let items = parse_items(FEED).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Senior Rust Engineer в Acme, віддалено");
        assert_eq!(
            items[0].link,
            "https://jobs.dou.ua/companies/acme/vacancies/100/?utm_source=jobsrss"
        );
        assert_eq!(
            chrono::DateTime::parse_from_rfc2822(&items[0].published).unwrap(),
            chrono::DateTime::parse_from_rfc2822("Thu, 01 Oct 2026 12:03:00 +0300").unwrap()
        );
        assert_eq!(items[1].title, "QA & Automation");
    }

    #[test]
    fn channel_title_is_not_an_item() {
        let items = parse_items(FEED).unwrap();
        assert!(items.iter().all(|i| i.title != "Вакансії"));
    }

    #[test]
    fn missing_pub_date_is_left_empty() {
        let xml = r#"<rss version="2.0"><channel><title>t</title><link>https://jobs.dou.ua/</link>
  <item><title>Go developer</title><link>https://jobs.dou.ua/v/7/</link></item>
</channel></rss>"#;
        let items = parse_items(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].published, "");
    }

    #[test]
    fn non_feed_body_is_a_parse_error() {
        let err = parse_items("502 Bad Gateway").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn html_entities_are_decoded() {
        assert_eq!(unescape("a &amp;lt; b"), "a &lt; b");
        assert_eq!(unescape("&#1050;&#x438;&#x457;&#1074;"), "Київ");
        assert_eq!(unescape("&laquo;Rust&raquo;"), "«Rust»");
        assert_eq!(unescape("R&D"), "R&D");
        assert_eq!(unescape("plain"), "plain");
    }
}
