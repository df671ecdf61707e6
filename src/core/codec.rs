//! Query-string form of a [`RenderSpec`], used for shareable URLs.
//!
//! `w`, `h`, `bg`, `fg`, `text` and `fmt` are always written. `br` only when
//! the corner radius is non-zero, `fs` only when auto-sizing is off (its
//! presence is what turns auto-sizing off on the way back), and `font` only
//! when the family differs from the default.

use std::collections::HashMap;

use url::{Url, form_urlencoded};

use crate::core::spec::{
    DEFAULT_BACKGROUND, DEFAULT_FONT_FAMILY, DEFAULT_FOREGROUND, RawInputs, RenderSpec,
};

pub fn encode(spec: &RenderSpec) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("w", &spec.width().to_string())
        .append_pair("h", &spec.height().to_string())
        .append_pair("bg", strip_hash(spec.background()))
        .append_pair("fg", strip_hash(spec.foreground()))
        .append_pair("text", spec.text())
        .append_pair("fmt", spec.format().as_str());

    if spec.corner_radius() != 0 {
        query.append_pair("br", &spec.corner_radius().to_string());
    }
    if !spec.auto_font() {
        query.append_pair("fs", &spec.font_size_px().to_string());
    }
    if spec.font_family() != DEFAULT_FONT_FAMILY {
        query.append_pair("font", spec.font_family());
    }

    query.finish()
}

/// Reads a query string (with or without the leading `?`) back into raw
/// inputs. Nothing is trusted; the result still goes through
/// [`normalize`](crate::core::spec::normalize).
pub fn decode(query: &str) -> RawInputs {
    let query = query.strip_prefix('?').unwrap_or(query);

    // First occurrence wins for repeated keys.
    let mut params: HashMap<String, String> = HashMap::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }

    let get = |key: &str| params.get(key).cloned().unwrap_or_default();
    let color = |key: &str, fallback: &str| {
        let hex = params
            .get(key)
            .filter(|v| !v.is_empty())
            .map(String::as_str)
            .unwrap_or_else(|| strip_hash(fallback));
        format!("#{}", hex)
    };
    let font_family = params
        .get("font")
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string());

    RawInputs {
        width: get("w"),
        height: get("h"),
        background: color("bg", DEFAULT_BACKGROUND),
        foreground: color("fg", DEFAULT_FOREGROUND),
        label: get("text"),
        font_family,
        radius: get("br"),
        auto_font: !params.contains_key("fs"),
        font_size: get("fs"),
        format: get("fmt"),
    }
}

/// `base` with its query replaced by the encoded spec.
pub fn share_url(base: &Url, spec: &RenderSpec) -> Url {
    let mut url = base.clone();
    url.set_query(Some(&encode(spec)));
    url.set_fragment(None);
    url
}

fn strip_hash(hex: &str) -> &str {
    hex.strip_prefix('#').unwrap_or(hex)
}
