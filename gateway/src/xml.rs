//! Minimal XML text helpers shared by the control client and the emulator.
//!
//! Control envelopes only ever carry plain text values, so escaping is limited
//! to the four characters that can break them: `&`, `<`, `>` and `"`.

use std::borrow::Cow;

/// Escape `&`, `<`, `>` and `"` for embedding in an element body
pub fn escape(value: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}

/// Reverse [`escape`]. `&amp;` is decoded last so `&amp;lt;` yields `&lt;`.
pub fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Raw text between `<tag>` and the next `</tag>`, without unescaping
pub fn extract_xml_value<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let start_tag = format!("<{}>", tag);
    let end_tag = format!("</{}>", tag);

    let content_start = xml.find(&start_tag)? + start_tag.len();
    let len = xml[content_start..].find(&end_tag)?;
    Some(&xml[content_start..content_start + len])
}

/// Unescaped text of the first `<tag>` element, or an empty string when absent
pub fn extract_tag_value(xml: &str, tag: &str) -> String {
    extract_xml_value(xml, tag).map(unescape).unwrap_or_default()
}
