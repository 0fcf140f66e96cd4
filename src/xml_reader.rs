use crate::errors::FeedError;
use crate::models::FeedKind;

pub trait XmlElement: Copy {
    /// Tag name without namespace prefix.
    fn local_name(&self) -> &str;

    fn parent_element(&self) -> Option<Self>;

    /// Every element below this one (not including itself), in document order.
    fn element_descendants(&self) -> Vec<Self>;

    /// Attribute value looked up by local name.
    fn attribute_value(&self, name: &str) -> Option<&str>;

    fn attribute_names(&self) -> Vec<&str>;

    /// Concatenation of all text below this element.
    fn text_content(&self) -> String;

    /// The element as it appears in the source document, tags included.
    fn outer_xml(&self) -> &str;

    /// First descendant element with the given local name.
    fn find_descendant(&self, tag: &str) -> Option<Self> {
        self.element_descendants()
            .into_iter()
            .find(|x| x.local_name() == tag)
    }

    /// Trimmed text of the first descendant with the given local name, `None` when absent or blank.
    fn child_text(&self, tag: &str) -> Option<String> {
        self.find_descendant(tag)
            .map(|x| x.text_content().trim().to_string())
            .filter(|x| !x.is_empty())
    }

    /// Closest enclosing element with the given local name.
    fn ancestor_named(&self, tag: &str) -> Option<Self> {
        let mut current = self.parent_element();
        while let Some(node) = current {
            if node.local_name() == tag {
                return Some(node);
            }
            current = node.parent_element();
        }
        None
    }

    fn descendants_matching<F>(&self, predicate: F) -> Vec<Self>
    where
        F: Fn(&Self) -> bool,
    {
        self.element_descendants()
            .into_iter()
            .filter(|x| predicate(x))
            .collect()
    }

    /// Resolves a descendant-combinator path such as `["Point", "coordinates"]`: each step may
    /// be any number of levels below the previous one.
    fn select_path(&self, path: &[&str]) -> Option<Self> {
        let (first, rest) = path.split_first()?;

        for candidate in self.descendants_matching(|x| x.local_name() == *first) {
            if rest.is_empty() {
                return Some(candidate);
            }
            if let Some(found) = candidate.select_path(rest) {
                return Some(found);
            }
        }

        None
    }
}

impl<'a, 'input: 'a> XmlElement for roxmltree::Node<'a, 'input> {
    fn local_name(&self) -> &str {
        self.tag_name().name()
    }

    fn parent_element(&self) -> Option<Self> {
        self.parent().filter(|x| x.is_element())
    }

    fn element_descendants(&self) -> Vec<Self> {
        self.descendants()
            .skip(1)
            .filter(|x| x.is_element())
            .collect()
    }

    fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes()
            .find(|attr| attr.name() == name)
            .map(|attr| attr.value())
    }

    fn attribute_names(&self) -> Vec<&str> {
        self.attributes().map(|attr| attr.name()).collect()
    }

    fn text_content(&self) -> String {
        self.descendants()
            .filter(|x| x.is_text())
            .filter_map(|x| x.text())
            .collect::<String>()
    }

    fn outer_xml(&self) -> &str {
        let input = self.document().input_text();
        input.get(self.range()).unwrap_or("")
    }
}

/// Parses a whole feed document. A failure here is the only error a feed parser surfaces.
pub fn parse_document(kind: FeedKind, text: &str) -> Result<roxmltree::Document<'_>, FeedError> {
    roxmltree::Document::parse(text).map_err(|source| FeedError::Xml { kind, source })
}

/// All elements of the document with the given local name.
pub fn elements_named<'a, 'input>(
    document: &'a roxmltree::Document<'input>,
    tag: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    document
        .descendants()
        .filter(|x| x.is_element() && x.tag_name().name() == tag)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<root xmlns:gml="http://www.opengis.net/gml" xmlns:cite="http://www.opengeospatial.net/cite">
  <cite:data>
    <cite:carretera> C-58 </cite:carretera>
    <cite:buit></cite:buit>
    <cite:geom><gml:Point srsName="EPSG:4326"><gml:coordinates>2.1,41.7</gml:coordinates></gml:Point></cite:geom>
  </cite:data>
</root>"#;

    #[test]
    fn child_text_ignores_prefix_and_trims() {
        let doc = parse_document(FeedKind::Gml, SAMPLE).unwrap();
        let root = doc.root_element();
        assert_eq!(root.child_text("carretera"), Some("C-58".to_string()));
        assert_eq!(root.child_text("buit"), None);
        assert_eq!(root.child_text("missing"), None);
    }

    #[test]
    fn select_path_descends_any_depth() {
        let doc = parse_document(FeedKind::Gml, SAMPLE).unwrap();
        let root = doc.root_element();
        let coords = root.select_path(&["geom", "Point", "coordinates"]).unwrap();
        assert_eq!(coords.text_content(), "2.1,41.7");
        assert!(root.select_path(&["Envelope", "coordinates"]).is_none());
    }

    #[test]
    fn outer_xml_covers_the_element() {
        let doc = parse_document(FeedKind::Gml, SAMPLE).unwrap();
        let point = doc.root_element().find_descendant("Point").unwrap();
        assert!(point.outer_xml().starts_with("<gml:Point"));
        assert!(point.outer_xml().ends_with("</gml:Point>"));
        assert_eq!(point.attribute_value("srsName"), Some("EPSG:4326"));
    }

    #[test]
    fn ancestor_lookup_walks_up() {
        let doc = parse_document(FeedKind::Gml, SAMPLE).unwrap();
        let coords = doc.root_element().find_descendant("coordinates").unwrap();
        let data = coords.ancestor_named("data").unwrap();
        assert_eq!(data.local_name(), "data");
        assert!(coords.ancestor_named("featureMember").is_none());
    }

    #[test]
    fn malformed_document_is_an_error() {
        let result = parse_document(FeedKind::Rss, "<rss><channel>");
        assert!(matches!(result, Err(FeedError::Xml { kind: FeedKind::Rss, .. })));
    }
}
