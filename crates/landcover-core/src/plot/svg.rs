//! Minimal SVG document builder: just the primitives the trend charts draw.
use std::fmt::Write as _;

/// Horizontal text alignment (`text-anchor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    fn as_str(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// Stroke style for lines and outlines.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke<'a> {
    pub color: &'a str,
    pub width: f64,
    pub opacity: f64,
    /// `stroke-dasharray` value, e.g. `"8 5"`.
    pub dash: Option<&'a str>,
}

impl<'a> Stroke<'a> {
    pub fn solid(color: &'a str, width: f64) -> Self {
        Self { color, width, opacity: 1.0, dash: None }
    }

    pub fn dashed(color: &'a str, width: f64) -> Self {
        Self { dash: Some("8 5"), ..Self::solid(color, width) }
    }

    pub fn with_opacity(self, opacity: f64) -> Self {
        Self { opacity, ..self }
    }

    fn attrs(&self) -> String {
        let mut s = format!(r#"stroke="{}" stroke-width="{}""#, escape(self.color), self.width);
        if self.opacity < 1.0 {
            let _ = write!(s, r#" stroke-opacity="{}""#, self.opacity);
        }
        if let Some(dash) = self.dash {
            let _ = write!(s, r#" stroke-dasharray="{dash}""#);
        }
        s
    }
}

/// Text styling.
#[derive(Debug, Clone, PartialEq)]
pub struct Font<'a> {
    pub family: &'a str,
    pub size: f64,
    pub color: &'a str,
    pub anchor: Anchor,
    /// Clockwise rotation in degrees about the text origin.
    pub rotate: f64,
}

impl<'a> Font<'a> {
    pub fn new(family: &'a str, size: f64) -> Self {
        Self { family, size, color: "black", anchor: Anchor::Start, rotate: 0.0 }
    }

    pub fn anchor(self, anchor: Anchor) -> Self {
        Self { anchor, ..self }
    }

    pub fn rotate(self, degrees: f64) -> Self {
        Self { rotate: degrees, ..self }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Compact number formatting for coordinates.
fn num(v: f64) -> String {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 {
        "0".to_string()
    } else {
        format!("{r}")
    }
}

#[derive(Debug, Clone)]
pub struct SvgDocument {
    width: f64,
    height: f64,
    body: String,
}

impl SvgDocument {
    pub fn new(width: f64, height: f64) -> Self {
        let mut doc = Self { width, height, body: String::new() };
        doc.rect(0.0, 0.0, width, height, "white", None);
        doc
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str, stroke: Option<&Stroke<'_>>) {
        let stroke = stroke.map(|s| format!(" {}", s.attrs())).unwrap_or_default();
        let _ = writeln!(
            self.body,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"{stroke}/>"#,
            num(x),
            num(y),
            num(w),
            num(h),
            escape(fill)
        );
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &Stroke<'_>) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" {}/>"#,
            num(x1),
            num(y1),
            num(x2),
            num(y2),
            stroke.attrs()
        );
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke<'_>) {
        if points.len() < 2 {
            return;
        }
        let pts: Vec<String> = points.iter().map(|&(x, y)| format!("{},{}", num(x), num(y))).collect();
        let _ = writeln!(self.body, r#"<polyline points="{}" fill="none" {}/>"#, pts.join(" "), stroke.attrs());
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
            num(cx),
            num(cy),
            num(r),
            escape(fill)
        );
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, font: &Font<'_>) {
        let rotate = if font.rotate != 0.0 {
            format!(r#" transform="rotate({} {} {})""#, num(font.rotate), num(x), num(y))
        } else {
            String::new()
        };
        let _ = writeln!(
            self.body,
            r#"<text x="{}" y="{}" font-family="{}" font-size="{}" fill="{}" text-anchor="{}"{rotate}>{}</text>"#,
            num(x),
            num(y),
            escape(font.family),
            num(font.size),
            escape(font.color),
            font.anchor.as_str(),
            escape(content)
        );
    }

    pub fn finish(self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n\
             {}</svg>\n",
            self.body,
            w = num(self.width),
            h = num(self.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn document_structure() {
        let mut doc = SvgDocument::new(200.0, 100.0);
        doc.line(0.0, 0.0, 10.5, 20.25, &Stroke::dashed("green", 2.0));
        doc.text(5.0, 6.0, "km²", &Font::new("Arial", 12.0).anchor(Anchor::Middle).rotate(-90.0));
        let svg = doc.finish();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(r#"viewBox="0 0 200 100""#));
        assert!(svg.contains(r#"x2="10.5" y2="20.25" stroke="green" stroke-width="2" stroke-dasharray="8 5""#));
        assert!(svg.contains(r#"transform="rotate(-90 5 6)">km²</text>"#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
