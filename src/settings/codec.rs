//! Portable text format for settings embedded in export archives.
//!
//! The format is line-oriented and self-describing, one tag per setting:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <preferences>
//!   <boolean name="verbose_logging" value="true" />
//!   <int name="display_width" value="1080" />
//!   <string name="label">a &amp; b</string>
//! </preferences>
//! ```
//!
//! It is deliberately not parsed as general XML: each line is inspected on
//! its own, unknown lines are skipped, and a malformed value skips only its
//! own line.

use super::{ProfileSettings, SettingValue};

/// File name of the settings document inside an export archive.
pub const PREFERENCES_FILE: &str = "preference.xml";

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>";

/// Serialize `settings` to the portable text format.
pub fn encode(settings: &ProfileSettings) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    out.push_str("<preferences>\n");

    for (key, value) in settings {
        let name = escape(key);
        match value {
            SettingValue::Bool(v) => {
                out.push_str(&format!("  <boolean name=\"{}\" value=\"{}\" />\n", name, v));
            }
            SettingValue::Int(v) => {
                out.push_str(&format!("  <int name=\"{}\" value=\"{}\" />\n", name, v));
            }
            SettingValue::String(v) => {
                out.push_str(&format!(
                    "  <string name=\"{}\">{}</string>\n",
                    name,
                    escape(v)
                ));
            }
        }
    }

    out.push_str("</preferences>\n");
    out
}

/// Parse the portable text format. Never fails: anything unrecognized or
/// malformed is skipped with a warning.
pub fn decode(text: &str) -> ProfileSettings {
    let mut settings = ProfileSettings::new();

    for line in text.lines().map(str::trim) {
        let parsed = if line.starts_with("<boolean") {
            attr_pair(line).and_then(|(name, raw)| match raw.as_str() {
                "true" => Some((name, SettingValue::Bool(true))),
                "false" => Some((name, SettingValue::Bool(false))),
                _ => malformed(line),
            })
        } else if line.starts_with("<int") || line.starts_with("<long") {
            attr_pair(line).and_then(|(name, raw)| match raw.parse::<i32>() {
                Ok(v) => Some((name, SettingValue::Int(v))),
                Err(_) => malformed(line),
            })
        } else if line.starts_with("<string") {
            attribute(line, "name")
                .zip(tag_content(line))
                .map(|(name, content)| (unescape(name), SettingValue::String(unescape(content))))
        } else {
            if line.starts_with("<float") {
                tracing::debug!(line = %line, "skipping unsupported setting type");
            }
            None
        };

        if let Some((name, value)) = parsed {
            settings.insert(name, value);
        }
    }

    settings
}

fn malformed<T>(line: &str) -> Option<T> {
    tracing::warn!(line = %line, "skipping malformed setting value");
    None
}

/// `name` and `value` attributes of a self-closing tag, `name` unescaped.
fn attr_pair(line: &str) -> Option<(String, String)> {
    let name = attribute(line, "name")?;
    let value = attribute(line, "value")?;
    Some((unescape(name), unescape(value)))
}

fn attribute<'a>(line: &'a str, attr: &str) -> Option<&'a str> {
    let pattern = format!(" {}=\"", attr);
    let start = line.find(&pattern)? + pattern.len();
    let len = line[start..].find('"')?;
    Some(&line[start..start + len])
}

fn tag_content(line: &str) -> Option<&str> {
    let start = line.find('>')? + 1;
    let len = line[start..].find('<')?;
    Some(&line[start..start + len])
}

/// Escape `&` first so later replacements are not double-escaped.
pub fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\n', "&#10;")
}

/// Inverse of [`escape`]; `&amp;` is undone last.
pub fn unescape(value: &str) -> String {
    value
        .replace("&#10;", "\n")
        .replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DISPLAY_WIDTH, VERBOSE_LOGGING};

    #[test]
    fn test_round_trip_typed_values() {
        let mut settings = ProfileSettings::new();
        settings.insert(VERBOSE_LOGGING.into(), SettingValue::Bool(true));
        settings.insert(DISPLAY_WIDTH.into(), SettingValue::Int(1080));
        settings.insert("negative".into(), SettingValue::Int(-7));
        settings.insert(
            "label".into(),
            SettingValue::String("a & b <c> \"d\" &lt;".into()),
        );
        settings.insert("multi".into(), SettingValue::String("one\ntwo".into()));
        settings.insert("empty".into(), SettingValue::String(String::new()));

        assert_eq!(decode(&encode(&settings)), settings);
    }

    #[test]
    fn test_encode_format() {
        let mut settings = ProfileSettings::new();
        settings.insert(VERBOSE_LOGGING.into(), SettingValue::Bool(true));
        settings.insert("w".into(), SettingValue::Int(1080));
        settings.insert("k".into(), SettingValue::String("v".into()));

        let text = encode(&settings);
        assert!(text.starts_with(HEADER));
        assert!(text.contains("  <boolean name=\"verbose_logging\" value=\"true\" />\n"));
        assert!(text.contains("  <int name=\"w\" value=\"1080\" />\n"));
        assert!(text.contains("  <string name=\"k\">v</string>\n"));
        assert!(text.ends_with("</preferences>\n"));
    }

    #[test]
    fn test_unescape_does_not_double_unescape() {
        // "&amp;lt;" encodes the literal text "&lt;", not "<".
        assert_eq!(unescape("&amp;lt;"), "&lt;");
        assert_eq!(unescape("&amp;quot;"), "&quot;");
        assert_eq!(unescape(&escape("&gt;")), "&gt;");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let text = "<preferences>\n\
                    <int name=\"w\" value=\"wide\" />\n\
                    <int name=\"h\" value=\"1920\" />\n\
                    <boolean name=\"b\" value=\"maybe\" />\n\
                    <float name=\"f\" value=\"1.5\" />\n\
                    <long name=\"big\" value=\"99999999999\" />\n\
                    <long name=\"small\" value=\"42\" />\n\
                    garbage\n\
                    </preferences>\n";
        let settings = decode(text);
        assert_eq!(settings.len(), 2);
        assert_eq!(settings["h"], SettingValue::Int(1920));
        assert_eq!(settings["small"], SettingValue::Int(42));
    }

    #[test]
    fn test_decode_foreign_android_export() {
        let text = r#"<?xml version="1.0" encoding="utf-8"?>
<preferences>
  <boolean name="verbose_logging" value="false" />
  <int name="display_dpi" value="320" />
  <string name="note">x &amp;&amp; y</string>
</preferences>
"#;
        let settings = decode(text);
        assert_eq!(settings["verbose_logging"], SettingValue::Bool(false));
        assert_eq!(settings["display_dpi"], SettingValue::Int(320));
        assert_eq!(settings["note"], SettingValue::String("x && y".into()));
    }
}
