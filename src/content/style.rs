/*!
 * Style and font injection.
 *
 * The page carries at most one style element (keyed by
 * [`STYLE_ELEMENT_ID`]) whose rules are a pure function of the active
 * [`FontConfig`]. Applying the same configuration twice leaves the document
 * unchanged.
 */

use log::debug;

use crate::dom::{Document, NodeId};

use super::{RTL_INPUT_CLASS, STYLE_ELEMENT_ID};

/// Family used when no custom font is configured
pub const DEFAULT_FONT_FAMILY: &str = "Vazirmatn";

/// Bundled variable font
pub const DEFAULT_FONT_URL: &str =
    "https://cdn.jsdelivr.net/gh/rastikerdar/vazirmatn@v33.003/fonts/webfonts/Vazirmatn[wght].woff2";

/// CSS custom property carrying the active family
pub const FONT_FAMILY_VAR: &str = "--dynamic-rtl-font-family";

/// Families appended after the active one
const FALLBACK_FAMILIES: &str = "Arial, sans-serif";

/// Where the font face comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    /// A font file shipped with the extension
    Bundled { url: String },
    /// A user upload stored as a `data:` URI
    Embedded { data_uri: String },
}

/// Font configuration read from settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontConfig {
    pub family: String,
    pub source: FontSource,
    /// When false, marked elements keep the page font
    pub active: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self::bundled(DEFAULT_FONT_FAMILY, DEFAULT_FONT_URL)
    }
}

impl FontConfig {
    pub fn bundled(family: &str, url: &str) -> Self {
        Self {
            family: family.to_string(),
            source: FontSource::Bundled { url: url.to_string() },
            active: true,
        }
    }

    pub fn embedded(family: &str, data_uri: &str) -> Self {
        Self {
            family: family.to_string(),
            source: FontSource::Embedded {
                data_uri: data_uri.to_string(),
            },
            active: true,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.source, FontSource::Embedded { .. })
    }

    /// Family name safe to place inside single quotes
    fn quoted_family(&self) -> String {
        let family: String = self
            .family
            .chars()
            .filter(|c| !matches!(c, '\'' | '"' | '\\' | ';' | '{' | '}'))
            .collect();
        let family = family.trim();
        if family.is_empty() {
            format!("'{}'", DEFAULT_FONT_FAMILY)
        } else {
            format!("'{}'", family)
        }
    }

    /// Value of the font-family custom property
    pub fn font_stack(&self) -> String {
        format!("{}, {}", self.quoted_family(), FALLBACK_FAMILIES)
    }
}

/// Build the stylesheet for a font configuration
pub fn stylesheet(font: &FontConfig) -> String {
    let mut css = String::new();

    if font.active {
        let (src, format) = match &font.source {
            FontSource::Bundled { url } => (url.as_str(), "woff2"),
            FontSource::Embedded { data_uri } => (data_uri.as_str(), "truetype"),
        };
        css.push_str(&format!(
            "@font-face {{\n  font-family: {};\n  src: url('{}') format('{}');\n  font-weight: 100 900;\n  font-display: swap;\n}}\n",
            font.quoted_family(),
            src,
            format
        ));
        css.push_str(&format!(":root {{\n  {}: {};\n}}\n", FONT_FAMILY_VAR, font.font_stack()));
    }

    css.push_str(&format!(
        "[data-rtl=\"true\"],\ninput[data-rtl=\"true\"],\ntextarea[data-rtl=\"true\"],\n[contenteditable][data-rtl=\"true\"],\n.{} {{\n  direction: rtl !important;\n  text-align: right !important;\n",
        RTL_INPUT_CLASS
    ));
    if font.active {
        css.push_str(&format!("  font-family: var({}) !important;\n", FONT_FAMILY_VAR));
    }
    css.push_str("}\n");

    css.push_str(
        "input[type=\"text\"]:focus,\ntextarea:focus,\n[contenteditable]:focus {\n  direction: auto !important;\n}\n",
    );
    css
}

/// Maintains the injected style element
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleInjector;

impl StyleInjector {
    /// Insert or update the style element for `font`. Returns the element.
    pub fn apply(doc: &mut Document, font: &FontConfig) -> NodeId {
        let css = stylesheet(font);

        if let Some(existing) = Self::find(doc) {
            if doc.text_content(existing) != css {
                debug!("Updating injected stylesheet for font '{}'", font.family);
                doc.set_text_content(existing, &css);
            }
            return existing;
        }

        let head = doc.ensure_head();
        let style = doc.create_element_with_attrs("style", &[("id", STYLE_ELEMENT_ID)]);
        let text = doc.create_text(&css);
        doc.append_child(style, text);
        doc.append_child(head, style);
        debug!("Injected stylesheet for font '{}'", font.family);
        style
    }

    /// Remove the style element. Returns false if there was none.
    pub fn remove(doc: &mut Document) -> bool {
        match Self::find(doc) {
            Some(style) => {
                doc.detach(style);
                true
            }
            None => false,
        }
    }

    pub fn find(doc: &Document) -> Option<NodeId> {
        doc.get_element_by_id(STYLE_ELEMENT_ID)
    }
}
