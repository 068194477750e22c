// src/mirror/assets.rs
// =============================================================================
// Finds the static assets a page references and rewrites those references.
//
// Asset categories and how they are selected:
// - CSS:  <link rel="stylesheet" href>
// - JS:   <script src>
// - IMG:  <img src>
// - FONT: stylesheet links whose href ends in .woff/.woff2/.ttf/.otf
//
// A FONT link is also a stylesheet link, so it is counted (and downloaded)
// under both CSS and FONT. When both downloads succeed the FONT path wins,
// because FONT rewrites are applied last.
//
// Elements are addressed by their position in the match list of their
// selector. The document is parsed once to collect references and once more
// to rewrite them; html5ever builds the same tree for the same input, so
// positions line up.
//
// Rust concepts:
// - Enums with methods: each AssetKind knows its folder and label
// - Mutable borrows: tree.get_mut() edits an element in place
// - impl AddAssign: counts add up with +=
// =============================================================================

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use scraper::node::Element;
use scraper::{Html, Node, Selector};
use serde::Serialize;
use std::ops::AddAssign;
use tracing::{debug, warn};
use url::Url;

use crate::urls;

const FONT_EXTENSIONS: [&str; 4] = ["woff", "woff2", "ttf", "otf"];

// Characters escaped when a file name goes back into an href/src
const HREF_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Css,
    Js,
    Img,
    Font,
}

impl AssetKind {
    /// Subdirectory of the page directory holding this kind
    pub fn dir(self) -> &'static str {
        match self {
            AssetKind::Css => "css",
            AssetKind::Js => "js",
            AssetKind::Img => "imgs",
            AssetKind::Font => "fonts",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Css => "CSS",
            AssetKind::Js => "JS",
            AssetKind::Img => "IMG",
            AssetKind::Font => "FONT",
        }
    }

    fn family(self) -> Family {
        match self {
            AssetKind::Css | AssetKind::Font => Family::Stylesheet,
            AssetKind::Js => Family::Script,
            AssetKind::Img => Family::Image,
        }
    }
}

// Groups of elements sharing one selector and one URL attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Stylesheet,
    Script,
    Image,
}

impl Family {
    const ALL: [Family; 3] = [Family::Stylesheet, Family::Script, Family::Image];

    fn selector(self) -> Selector {
        let css = match self {
            Family::Stylesheet => "link[rel~='stylesheet'][href]",
            Family::Script => "script[src]",
            Family::Image => "img[src]",
        };
        // Constant selectors, known to be valid
        Selector::parse(css).unwrap()
    }

    fn attribute(self) -> &'static str {
        match self {
            Family::Stylesheet => "href",
            Family::Script | Family::Image => "src",
        }
    }
}

/// Matched elements per category on one page (or summed over many)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssetCounts {
    pub css: usize,
    pub js: usize,
    pub images: usize,
    pub fonts: usize,
}

impl AssetCounts {
    fn bump(&mut self, kind: AssetKind) {
        match kind {
            AssetKind::Css => self.css += 1,
            AssetKind::Js => self.js += 1,
            AssetKind::Img => self.images += 1,
            AssetKind::Font => self.fonts += 1,
        }
    }

    /// Every matched reference, across all kinds
    pub fn total(&self) -> usize {
        self.css + self.js + self.images + self.fonts
    }
}

impl AddAssign for AssetCounts {
    fn add_assign(&mut self, other: Self) {
        self.css += other.css;
        self.js += other.js;
        self.images += other.images;
        self.fonts += other.fonts;
    }
}

/// One asset reference found in the markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    pub kind: AssetKind,
    /// Position of the element among its selector's matches
    pub element: usize,
    /// Attribute value as written in the markup
    pub source: String,
    /// Absolute URL the asset is fetched from (fragment dropped)
    pub resolved: Url,
    /// Name of the file on disk, inside `kind.dir()`
    pub file_name: String,
    /// Value written back into the attribute: `<kind dir>/<file name>`
    pub local_path: String,
}

/// Everything found on one page
#[derive(Debug, Clone, Default)]
pub struct PageAssets {
    pub references: Vec<AssetReference>,
    pub counts: AssetCounts,
    /// Matched elements that will not be downloaded (unresolvable or non-http)
    pub skipped: usize,
}

/// Collects asset references from `html`, resolving them against `base`.
///
/// Counts are of matched elements, whether or not they can be downloaded.
pub fn collect_assets(html: &str, base: &Url) -> PageAssets {
    let document = Html::parse_document(html);
    let mut assets = PageAssets::default();

    for family in Family::ALL {
        let attribute = family.attribute();

        for (element, node) in document.select(&family.selector()).enumerate() {
            let Some(source) = node.value().attr(attribute) else {
                continue;
            };
            let kinds = kinds_for(family, source);
            for kind in &kinds {
                assets.counts.bump(*kind);
            }

            let resolved = match urls::resolve(base, source) {
                Ok(url) if urls::is_http(&url) => url,
                Ok(url) => {
                    debug!("not downloading {} reference {}", url.scheme(), source);
                    assets.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("{}", e);
                    assets.skipped += 1;
                    continue;
                }
            };

            for kind in kinds {
                assets
                    .references
                    .push(reference(kind, element, source, &resolved));
            }
        }
    }

    assets
}

fn kinds_for(family: Family, source: &str) -> Vec<AssetKind> {
    match family {
        Family::Stylesheet if is_font_href(source) => vec![AssetKind::Css, AssetKind::Font],
        Family::Stylesheet => vec![AssetKind::Css],
        Family::Script => vec![AssetKind::Js],
        Family::Image => vec![AssetKind::Img],
    }
}

// "ends in .woff" etc, ignoring any query or fragment
fn is_font_href(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or("").to_ascii_lowercase();
    FONT_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)))
}

fn reference(kind: AssetKind, element: usize, source: &str, resolved: &Url) -> AssetReference {
    let mut fetch_url = resolved.clone();
    fetch_url.set_fragment(None);

    let file_name = file_name_for(resolved);
    let local_path = format!(
        "{}/{}",
        kind.dir(),
        utf8_percent_encode(&file_name, HREF_SEGMENT)
    );

    AssetReference {
        kind,
        element,
        source: source.to_string(),
        resolved: fetch_url,
        file_name,
        local_path,
    }
}

/// On-disk name for an asset: the decoded last path segment.
///
/// Query and fragment never take part, so `a.css?v=1` and `a.css?v=2`
/// share one file.
pub fn file_name_for(url: &Url) -> String {
    let stripped = urls::strip_query_and_fragment(url);
    let decoded = percent_decode_str(urls::last_segment(&stripped)).decode_utf8_lossy();

    let name: String = decoded
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();

    match name.as_str() {
        "" | "." | ".." => "index".to_string(),
        _ => name,
    }
}

/// Re-parses `html` and points every referenced element at its local copy.
///
/// Only the references passed in are rewritten; everything else keeps its
/// original attribute value.
pub fn rewrite_document(html: &str, rewrites: &[&AssetReference]) -> String {
    let mut document = Html::parse_document(html);

    let mut ordered: Vec<&AssetReference> = rewrites.to_vec();
    ordered.sort_by_key(|r| r.kind);

    for family in Family::ALL {
        let ids: Vec<_> = document.select(&family.selector()).map(|el| el.id()).collect();

        for reference in ordered.iter().filter(|r| r.kind.family() == family) {
            let Some(id) = ids.get(reference.element) else {
                continue;
            };
            if let Some(mut node) = document.tree.get_mut(*id) {
                if let Node::Element(element) = node.value() {
                    set_attribute(element, family.attribute(), &reference.local_path);
                }
            }
        }
    }

    document.html()
}

fn set_attribute(element: &mut Element, name: &str, value: &str) {
    for (attr_name, attr_value) in element.attrs.iter_mut() {
        if &*attr_name.local == name {
            *attr_value = value.into();
        }
    }
}
