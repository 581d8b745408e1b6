use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Decode a snapshot body into UTF-8: BOM first, then the Content-Type
/// charset, then a chardetng guess over the full body.
///
/// Decoding is lossy. A mangled byte sequence degrades to replacement
/// characters in one cell rather than costing the whole poll iteration.
pub fn decode_snapshot(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding.decode(bytes).0.into_owned();
    }

    if let Some(encoding) = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return encoding.decode(bytes).0.into_owned();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true).decode(bytes).0.into_owned()
}

fn charset_label(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let part = part.trim();
        let prefix = part.get(..8)?;
        if !prefix.eq_ignore_ascii_case("charset=") {
            return None;
        }
        Some(
            part[8..]
                .trim_matches([' ', '"', '\''].as_ref())
                .to_string(),
        )
    })
}
