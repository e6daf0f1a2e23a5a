use crate::Result;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: Option<String>,
    pub font_size: f64,
    pub font_weight: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: None,
            font_size: 16.0,
            font_weight: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

/// Measures rendered text extents in device pixels.
///
/// Measurement is the one place where layout depends on an external
/// collaborator, so the trait is fallible: an integrator backed by a real
/// font stack can fail to consult it, and that failure propagates as
/// [`crate::Error::Measurement`] without retry.
pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> Result<TextMetrics>;
}

/// Font-independent measurer: display columns times a width factor.
///
/// Deterministic across platforms, which keeps layout output stable for
/// snapshot tests and headless use.
#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> Result<TextMetrics> {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let line_height_factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };

        let font_size = style.font_size.max(1.0);
        let columns = UnicodeWidthStr::width(text);
        Ok(TextMetrics {
            width: columns as f64 * font_size * char_width_factor,
            height: font_size * line_height_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_measurer_uses_display_columns() {
        let m = DeterministicTextMeasurer::default();
        let style = TextStyle {
            font_size: 10.0,
            ..TextStyle::default()
        };
        let narrow = m.measure("abcd", &style).unwrap();
        assert_eq!(narrow.width, 24.0);
        // wide CJK glyphs take two columns each
        let wide = m.measure("字字", &style).unwrap();
        assert_eq!(wide.width, narrow.width);
    }
}
