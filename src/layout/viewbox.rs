//! Root `<svg>` inspection and attribute rewriting.

use std::fmt;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    /// Parse `min-x min-y width height`, separated by whitespace or commas.
    pub fn parse(value: &str) -> Result<Self, LayoutError> {
        let invalid = || LayoutError::InvalidViewBox(value.to_string());
        let numbers = value
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        let [x, y, width, height] = numbers[..] else {
            return Err(invalid());
        };
        if !numbers.iter().all(|v| v.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(invalid());
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }
}

impl fmt::Display for ViewBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            num(self.x),
            num(self.y),
            num(self.width),
            num(self.height)
        )
    }
}

/// Format a coordinate with at most three decimals.
pub fn num(value: f64) -> String {
    let s = format!("{value:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Byte range of the root start tag within the document.
pub struct RootTag<'a> {
    pub svg: &'a str,
    pub start: usize,
    pub end: usize,
    pub view_box: ViewBox,
}

impl<'a> RootTag<'a> {
    /// Locate the root `<svg ...>` tag and read its `viewBox`.
    pub fn find(svg: &'a str) -> Result<Self, LayoutError> {
        let mut reader = Reader::from_str(svg);
        loop {
            let start = position(&reader)?;
            match reader.read_event() {
                Ok(Event::Start(tag) | Event::Empty(tag)) => {
                    if tag.local_name().as_ref() != b"svg" {
                        return Err(LayoutError::MissingRoot);
                    }
                    let end = position(&reader)?;
                    let value = tag
                        .try_get_attribute("viewBox")
                        .ok()
                        .flatten()
                        .ok_or(LayoutError::MissingViewBox)?;
                    let value = std::str::from_utf8(&value.value)
                        .map_err(|_| LayoutError::InvalidViewBox("<binary>".into()))?;
                    return Ok(Self {
                        svg,
                        start,
                        end,
                        view_box: ViewBox::parse(value)?,
                    });
                }
                Ok(Event::Eof) | Err(_) => return Err(LayoutError::MissingRoot),
                Ok(_) => {}
            }
        }
    }

    pub fn tag(&self) -> &'a str {
        &self.svg[self.start..self.end]
    }

    /// Document with the root tag replaced.
    pub fn with_tag(&self, tag: &str) -> String {
        let mut out = String::with_capacity(self.svg.len() + 64);
        out.push_str(&self.svg[..self.start]);
        out.push_str(tag);
        out.push_str(&self.svg[self.end..]);
        out
    }
}

fn position(reader: &Reader<&[u8]>) -> Result<usize, LayoutError> {
    usize::try_from(reader.buffer_position()).map_err(|_| LayoutError::MissingRoot)
}

/// Set `name="value"` on a start tag, replacing an existing attribute.
pub fn set_attribute(tag: &str, name: &str, value: &str) -> String {
    for quote in ['"', '\''] {
        let needle = format!(" {name}={quote}");
        if let Some(start) = tag.find(&needle) {
            let value_start = start + needle.len();
            if let Some(len) = tag[value_start..].find(quote) {
                return format!(
                    "{} {name}=\"{value}\"{}",
                    &tag[..start],
                    &tag[value_start + len + 1..]
                );
            }
        }
    }

    // Not present: insert right after `<svg`
    match tag.find("<svg") {
        Some(pos) => {
            let insert = pos + 4;
            format!("{} {name}=\"{value}\"{}", &tag[..insert], &tag[insert..])
        }
        None => tag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_viewbox() {
        let vb = ViewBox::parse("0 0 595.28 841.89").unwrap();
        assert_eq!(vb.height, 841.89);
        assert_eq!(ViewBox::parse("0,0, 10 ,20").unwrap().height, 20.0);
        assert!(ViewBox::parse("0 0 10").is_err());
        assert!(ViewBox::parse("0 0 10 0").is_err());
        assert!(ViewBox::parse("0 0 ten 10").is_err());
    }

    #[test]
    fn test_find_root_skips_prologue() {
        let svg = r#"<?xml version="1.0"?>
<svg viewBox="0 0 100 200" xmlns="http://www.w3.org/2000/svg"><svg viewBox="1 1 1 1"/></svg>"#;
        let root = RootTag::find(svg).unwrap();
        assert!(root.tag().starts_with("<svg viewBox=\"0 0 100 200\""));
        assert!(root.tag().ends_with('>'));
        assert_eq!(root.view_box.height, 200.0);
    }

    #[test]
    fn test_find_root_errors() {
        assert!(matches!(
            RootTag::find("<g></g>"),
            Err(LayoutError::MissingRoot)
        ));
        assert!(matches!(
            RootTag::find(r#"<svg width="10"></svg>"#),
            Err(LayoutError::MissingViewBox)
        ));
        assert!(matches!(RootTag::find(""), Err(LayoutError::MissingRoot)));
    }

    #[test]
    fn test_set_attribute_existing() {
        let tag = r#"<svg viewBox="0 0 100 100" width="100">"#;
        assert_eq!(
            set_attribute(tag, "viewBox", "-5 -5 110 110"),
            r#"<svg viewBox="-5 -5 110 110" width="100">"#
        );
    }

    #[test]
    fn test_set_attribute_missing() {
        let tag = r#"<svg width="100">"#;
        assert_eq!(
            set_attribute(tag, "height", "50pt"),
            r#"<svg height="50pt" width="100">"#
        );
    }

    #[test]
    fn test_set_attribute_ignores_prefixed_names() {
        let tag = r#"<svg data-width="1" width="2">"#;
        assert_eq!(
            set_attribute(tag, "width", "3"),
            r#"<svg data-width="1" width="3">"#
        );
    }

    #[test]
    fn test_num_format() {
        assert_eq!(num(841.89), "841.89");
        assert_eq!(num(1683.7800000000002), "1683.78");
        assert_eq!(num(792.0), "792");
        assert_eq!(num(-0.0001), "0");
    }
}
