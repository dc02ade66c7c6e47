//! SVG export serializer.
//!
//! Converts a [`VectorDocument`] into an SVG string using the [`svg`]
//! crate for document construction, XML escaping, and path data
//! formatting.
//!
//! The canvas matches the source mask in pixels. A white background
//! rectangle comes first, then one stroke-only `<path>` per vector path
//! using `M` (move to), `L` (line to) and, for closed paths, `z`.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Path, Rectangle, Title};
use svg::node::{Text, Value};

use pupring_pipeline::{VectorDocument, VectorPath};

/// Metadata to embed in the SVG document.
///
/// Both fields are optional. Text values are XML-escaped automatically
/// by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    ///
    /// Typically names the style that produced the paths.
    pub description: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from a vector path.
///
/// Uses `M` for the first point, `L` for subsequent points and a final
/// `z` when the path is closed. Returns an empty string for paths with
/// fewer than 2 points.
///
/// # Examples
///
/// ```
/// use pupring_pipeline::{Point, VectorPath};
/// use pupring_export::build_path_data;
///
/// let path = VectorPath {
///     points: vec![Point::new(10, 20), Point::new(30, 40)],
///     closed: false,
///     stroke_width: 3.0,
/// };
/// assert_eq!(build_path_data(&path), "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(path: &VectorPath) -> String {
    let Some((first, rest)) = path.points.split_first() else {
        return String::new();
    };
    if rest.is_empty() {
        return String::new();
    }

    let xy = |p: &pupring_pipeline::Point| (f64::from(p.x), f64::from(p.y));

    let mut data = Data::new().move_to(xy(first));
    for p in rest {
        data = data.line_to(xy(p));
    }
    if path.closed {
        data = data.close();
    }
    String::from(Value::from(data))
}

/// Serialize a vector document into an SVG string.
///
/// The `width`, `height` and `viewBox` all equal the document's pixel
/// dimensions. Paths are stroked black with their own stroke width and
/// never filled.
///
/// # Examples
///
/// ```
/// use pupring_pipeline::{Dimensions, Point, VectorDocument, VectorPath, VectorizeStats};
/// use pupring_export::{SvgMetadata, to_svg};
///
/// let doc = VectorDocument {
///     dimensions: Dimensions { width: 40, height: 30 },
///     paths: vec![VectorPath {
///         points: vec![Point::new(1, 1), Point::new(9, 1), Point::new(9, 9)],
///         closed: true,
///         stroke_width: 3.0,
///     }],
///     stats: VectorizeStats::default(),
/// };
/// let metadata = SvgMetadata { title: Some("rex"), description: None };
/// let svg = to_svg(&doc, &metadata);
/// assert!(svg.contains("<title>rex</title>"));
/// assert!(svg.contains(r#"viewBox="0 0 40 30""#));
/// ```
#[must_use]
pub fn to_svg(document: &VectorDocument, metadata: &SvgMetadata<'_>) -> String {
    let w = document.dimensions.width;
    let h = document.dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    doc = doc.add(
        Rectangle::new()
            .set("width", w)
            .set("height", h)
            .set("fill", "white"),
    );

    let mut emitted = 0usize;
    for path in &document.paths {
        let d = build_path_data(path);
        if d.is_empty() {
            continue;
        }
        doc = doc.add(
            Path::new()
                .set("d", d)
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", path.stroke_width),
        );
        emitted += 1;
    }
    tracing::debug!(width = w, height = h, paths = emitted, "serialized svg");

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

#[cfg(test)]
mod tests {
    use pupring_pipeline::{Dimensions, Point, VectorizeStats};

    use super::*;

    fn path(points: &[(i32, i32)], closed: bool) -> VectorPath {
        VectorPath {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            closed,
            stroke_width: 3.0,
        }
    }

    fn document(width: u32, height: u32, paths: Vec<VectorPath>) -> VectorDocument {
        VectorDocument {
            dimensions: Dimensions { width, height },
            paths,
            stats: VectorizeStats::default(),
        }
    }

    fn no_meta() -> SvgMetadata<'static> {
        SvgMetadata::default()
    }

    // --- build_path_data ---

    #[test]
    fn build_path_data_empty_path() {
        assert_eq!(build_path_data(&path(&[], true)), "");
    }

    #[test]
    fn build_path_data_single_point() {
        assert_eq!(build_path_data(&path(&[(5, 5)], true)), "");
    }

    #[test]
    fn build_path_data_open_path() {
        assert_eq!(build_path_data(&path(&[(10, 20), (30, 40)], false)), "M10,20 L30,40");
    }

    #[test]
    fn build_path_data_closed_path_ends_with_close() {
        let d = build_path_data(&path(&[(0, 0), (10, 0), (10, 10)], true));
        assert!(d.starts_with("M0,0 L10,0 L10,10"));
        assert!(d.trim_end().ends_with('z'), "got {d}");
    }

    // --- to_svg ---

    #[test]
    fn empty_document_has_background_only() {
        let svg = to_svg(&document(100, 50, vec![]), &no_meta());
        assert!(svg.contains(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains(r#"width="100""#));
        assert!(svg.contains(r#"height="50""#));
        assert!(svg.contains(r#"viewBox="0 0 100 50""#));
        assert!(svg.contains("<rect"));
        assert!(svg.contains(r#"fill="white""#));
        assert!(!svg.contains("<path"));
        assert!(svg.contains("</svg>"));
    }

    #[test]
    fn paths_are_stroke_only() {
        let svg = to_svg(
            &document(800, 600, vec![path(&[(10, 20), (30, 40), (50, 20)], true)]),
            &no_meta(),
        );
        assert!(svg.contains(r#"d="M10,20 L30,40 L50,20"#));
        assert!(svg.contains(r#"fill="none""#));
        assert!(svg.contains(r#"stroke="black""#));
        assert!(svg.contains(r#"stroke-width="3""#));
    }

    #[test]
    fn background_precedes_paths() {
        let svg = to_svg(
            &document(20, 20, vec![path(&[(1, 1), (5, 1), (5, 5)], true)]),
            &no_meta(),
        );
        let rect = svg.find("<rect").unwrap_or(usize::MAX);
        let first_path = svg.find("<path").unwrap_or(0);
        assert!(rect < first_path);
    }

    #[test]
    fn one_element_per_path() {
        let svg = to_svg(
            &document(
                50,
                50,
                vec![
                    path(&[(1, 1), (9, 1), (9, 9)], true),
                    path(&[(20, 20), (30, 20), (30, 30)], true),
                    path(&[(40, 40)], true),
                ],
            ),
            &no_meta(),
        );
        assert_eq!(svg.matches("<path").count(), 2);
    }

    #[test]
    fn has_svg_namespace() {
        let svg = to_svg(&document(10, 10, vec![]), &no_meta());
        assert!(svg.contains(r#"xmlns="http://www.w3.org/2000/svg""#));
    }

    // --- metadata ---

    #[test]
    fn title_and_description_are_escaped() {
        let meta = SvgMetadata {
            title: Some("Rex <3 & co"),
            description: Some("style=bold"),
        };
        let svg = to_svg(&document(10, 10, vec![]), &meta);
        assert!(svg.contains("<title>Rex &lt;3 &amp; co</title>"));
        assert!(svg.contains("<desc>style=bold</desc>"));
    }

    #[test]
    fn no_metadata_elements_by_default() {
        let svg = to_svg(&document(10, 10, vec![]), &no_meta());
        assert!(!svg.contains("<title>"));
        assert!(!svg.contains("<desc>"));
    }
}
