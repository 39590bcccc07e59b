use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use std::borrow::Cow;

const SPECIAL: [&str; 5] = ["&", "<", ">", "\"", "'"];
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

// Built once, shared by every serializer
static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(SPECIAL)
        .expect("static escape patterns are valid")
});

/// Escape the five XML special characters for use in text or attribute values.
///
/// Borrows the input unchanged when nothing needs escaping, which is the
/// common case for relationship ids, reltypes and part paths.
///
/// # Examples
///
/// ```
/// use pptx_opc::common::xml::escape_xml;
/// assert_eq!(escape_xml("rId1"), "rId1");
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml("http://x/?q=\"1\"&p=<2>"), "http://x/?q=&quot;1&quot;&amp;p=&lt;2&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    if XML_ESCAPER.is_match(s) {
        Cow::Owned(XML_ESCAPER.replace_all(s, &ENTITIES))
    } else {
        Cow::Borrowed(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_borrowed() {
        assert!(matches!(escape_xml("../media/image1.png"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_all_entities() {
        assert_eq!(escape_xml(r#"<'&'>""#), "&lt;&apos;&amp;&apos;&gt;&quot;");
    }
}
