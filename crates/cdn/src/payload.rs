use quick_xml::escape::escape;

/// Renders the `InvalidationBatch` document for the 2010-11-01 API.
///
/// Every key becomes one `<Path>` rooted at `/`.
pub(crate) fn invalidation_batch<S: AsRef<str>>(keys: &[S], caller_reference: &str) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><InvalidationBatch>");
    for key in keys {
        let key = key.as_ref().trim_start_matches('/');
        xml.push_str("<Path>/");
        xml.push_str(&escape(key));
        xml.push_str("</Path>");
    }
    xml.push_str("<CallerReference>");
    xml.push_str(&escape(caller_reference));
    xml.push_str("</CallerReference></InvalidationBatch>");
    xml
}
