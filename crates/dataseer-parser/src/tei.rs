//! TEI document reader
//!
//! Builds the section arena from a TEI file: the abstract becomes a
//! top-level section, every `div` of `body` and `back` becomes a section
//! (nested `div` elements become child sections), `head` gives the heading,
//! `p` and `figure/figDesc` become paragraphs. Sentences already present as
//! `<s>` elements are kept as they are.

use std::path::Path;

use roxmltree::{Node, ParsingOptions};
use tracing::debug;

use dataseer_core::{Document, ParagraphId, SectionId};

use crate::xml::{
    find_by_path, find_child, find_children, fragment_text, get_tag_name, inner_markup,
    normalize_whitespace, text_content,
};
use crate::{ParserError, Result};

/// TEI document reader
#[derive(Debug, Clone)]
pub struct TeiParser {
    /// Read the abstract as a top-level section
    pub include_abstract: bool,

    /// Read `text/back` divisions (data availability statements live there)
    pub include_back: bool,

    /// Read figure captions as paragraphs
    pub include_figures: bool,
}

impl TeiParser {
    /// Create a TEI reader with default settings
    pub fn new() -> Self {
        Self {
            include_abstract: true,
            include_back: true,
            include_figures: true,
        }
    }

    /// Skip or keep figure captions
    pub fn with_figures(mut self, enabled: bool) -> Self {
        self.include_figures = enabled;
        self
    }

    /// Read a TEI file
    pub fn parse_file(&self, path: &Path) -> Result<Document> {
        let xml = std::fs::read_to_string(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        self.parse_str(&xml)
    }

    /// Read a TEI string
    pub fn parse_str(&self, xml: &str) -> Result<Document> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let tree = roxmltree::Document::parse_with_options(xml, options)
            .map_err(|e| ParserError::MalformedXml(e.to_string()))?;

        let root = tree.root_element();
        if get_tag_name(root) != "TEI" {
            return Err(ParserError::NotTei(get_tag_name(root).to_string()));
        }

        let mut doc = Document::new();
        let header = find_child(root, "teiHeader");

        if let Some(title) = header
            .and_then(|h| find_by_path(h, "fileDesc/titleStmt/title"))
            .map(|t| normalize_whitespace(&text_content(t)))
            .filter(|t| !t.is_empty())
        {
            doc.title = Some(title);
        }

        if self.include_abstract {
            if let Some(abstract_node) = header.and_then(|h| find_by_path(h, "profileDesc/abstract"))
            {
                let section = doc.add_section(None, None);
                self.read_children(xml, abstract_node, section, &mut doc)?;
            }
        }

        let text = find_child(root, "text").ok_or(ParserError::MissingText)?;
        if let Some(body) = find_child(text, "body") {
            self.read_container(xml, body, &mut doc)?;
        }
        if self.include_back {
            if let Some(back) = find_child(text, "back") {
                self.read_container(xml, back, &mut doc)?;
            }
        }

        debug!(
            sections = doc.sections().len(),
            paragraphs = doc.paragraphs().len(),
            sentences = doc.sentences().len(),
            "TEI document read"
        );
        Ok(doc)
    }

    /// Read `body` / `back`: divisions become top-level sections, loose
    /// paragraphs are gathered in an implicit section without heading
    fn read_container(&self, xml: &str, node: Node<'_, '_>, doc: &mut Document) -> Result<()> {
        let mut implicit: Option<SectionId> = None;

        for child in node.children().filter(|c| c.is_element()) {
            match get_tag_name(child) {
                "div" => {
                    self.read_div(xml, child, None, doc)?;
                    implicit = None;
                }
                "p" | "figure" => {
                    let section = match implicit {
                        Some(section) => section,
                        None => {
                            let section = doc.add_section(None, None);
                            implicit = Some(section);
                            section
                        }
                    };
                    self.read_block(xml, child, section, doc)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn read_div(
        &self,
        xml: &str,
        node: Node<'_, '_>,
        parent: Option<SectionId>,
        doc: &mut Document,
    ) -> Result<SectionId> {
        let heading = find_child(node, "head")
            .map(|h| normalize_whitespace(&text_content(h)))
            .filter(|h| !h.is_empty());

        let section = doc.add_section(parent, heading);
        self.read_children(xml, node, section, doc)?;
        Ok(section)
    }

    fn read_children(
        &self,
        xml: &str,
        node: Node<'_, '_>,
        section: SectionId,
        doc: &mut Document,
    ) -> Result<()> {
        for child in node.children().filter(|c| c.is_element()) {
            match get_tag_name(child) {
                "div" => {
                    self.read_div(xml, child, Some(section), doc)?;
                }
                "p" | "figure" => self.read_block(xml, child, section, doc)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn read_block(
        &self,
        xml: &str,
        node: Node<'_, '_>,
        section: SectionId,
        doc: &mut Document,
    ) -> Result<()> {
        match get_tag_name(node) {
            "p" => {
                self.read_paragraph(xml, node, section, doc)?;
            }
            "figure" if self.include_figures => {
                for caption in node
                    .descendants()
                    .filter(|d| d.is_element() && get_tag_name(*d) == "figDesc")
                {
                    self.read_paragraph(xml, caption, section, doc)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn read_paragraph(
        &self,
        xml: &str,
        node: Node<'_, '_>,
        section: SectionId,
        doc: &mut Document,
    ) -> Result<ParagraphId> {
        let content = inner_markup(xml, node);
        let paragraph = doc.add_paragraph(section, content.trim())?;

        for sentence in find_children(node, "s") {
            let markup = normalize_whitespace(inner_markup(xml, sentence));
            let text = fragment_text(&markup)
                .unwrap_or_else(|| normalize_whitespace(&text_content(sentence)));
            doc.add_sentence(paragraph, markup, text)?;
        }
        Ok(paragraph)
    }
}

impl Default for TeiParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc><titleStmt><title>Petal   lengths</title></titleStmt></fileDesc>
    <profileDesc>
      <abstract><p>We study flowers.</p></abstract>
    </profileDesc>
  </teiHeader>
  <text>
    <body>
      <div>
        <head>Materials and Methods</head>
        <p>We used the UCI Iris dataset <ref type="bibr" target="#b0">[1]</ref>.</p>
        <div>
          <head>Sampling</head>
          <p><s>First sentence.</s><s>Second &amp; last.</s></p>
        </div>
        <figure><head>Figure 1</head><figDesc>Sepal width.</figDesc></figure>
      </div>
      <div><head>Results</head><p>It contains 150 rows.</p></div>
    </body>
    <back>
      <div><head>Data availability</head><p>Data are on Zenodo.</p></div>
    </back>
  </text>
</TEI>"##;

    #[test]
    fn test_parse_structure() {
        let doc = TeiParser::new().parse_str(SAMPLE).unwrap();

        assert_eq!(doc.title.as_deref(), Some("Petal lengths"));
        // abstract, methods, sampling, results, data availability
        assert_eq!(doc.sections().len(), 5);
        assert_eq!(doc.roots().len(), 4);

        let headings: Vec<Option<&str>> = doc
            .section_order()
            .into_iter()
            .map(|id| doc.section(id).unwrap().heading.as_deref())
            .collect();
        assert_eq!(
            headings,
            vec![
                None,
                Some("Materials and Methods"),
                Some("Sampling"),
                Some("Results"),
                Some("Data availability")
            ]
        );
    }

    #[test]
    fn test_paragraph_keeps_markup() {
        let doc = TeiParser::new().parse_str(SAMPLE).unwrap();
        let paragraph = &doc.paragraphs()[1];
        assert!(paragraph.content.contains(r##"<ref type="bibr" target="#b0">[1]</ref>"##));
        assert!(paragraph.sentences.is_empty());
    }

    #[test]
    fn test_presegmented_sentences() {
        let doc = TeiParser::new().parse_str(SAMPLE).unwrap();
        let paragraph = doc
            .paragraphs()
            .iter()
            .find(|p| !p.sentences.is_empty())
            .unwrap();
        let texts: Vec<&str> = paragraph
            .sentences
            .iter()
            .map(|id| doc.sentence(*id).unwrap().text.as_str())
            .collect();
        assert_eq!(texts, vec!["First sentence.", "Second & last."]);
    }

    #[test]
    fn test_figure_captions() {
        let with = TeiParser::new().parse_str(SAMPLE).unwrap();
        let without = TeiParser::new().with_figures(false).parse_str(SAMPLE).unwrap();
        assert_eq!(with.paragraphs().len(), without.paragraphs().len() + 1);
    }

    #[test]
    fn test_malformed_xml() {
        let err = TeiParser::new()
            .parse_str("<TEI><text><body><p>unclosed</body></text></TEI>")
            .unwrap_err();
        assert!(matches!(err, ParserError::MalformedXml(_)));
    }

    #[test]
    fn test_not_tei() {
        let err = TeiParser::new().parse_str("<article/>").unwrap_err();
        assert!(matches!(err, ParserError::NotTei(ref name) if name == "article"));
    }

    #[test]
    fn test_missing_text() {
        let err = TeiParser::new()
            .parse_str("<TEI><teiHeader/></TEI>")
            .unwrap_err();
        assert!(matches!(err, ParserError::MissingText));
    }

    #[test]
    fn test_loose_paragraphs_share_implicit_section() {
        let xml = "<TEI><text><body><p>One.</p><p>Two.</p></body></text></TEI>";
        let doc = TeiParser::new().parse_str(xml).unwrap();
        assert_eq!(doc.sections().len(), 1);
        assert_eq!(doc.paragraphs().len(), 2);
    }

    #[test]
    fn test_parse_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let from_file = TeiParser::new().parse_file(file.path()).unwrap();
        let from_str = TeiParser::new().parse_str(SAMPLE).unwrap();
        assert_eq!(from_file.title, from_str.title);
        assert_eq!(from_file.paragraphs().len(), from_str.paragraphs().len());
    }

    #[test]
    fn test_parse_missing_file() {
        let err = TeiParser::new()
            .parse_file(Path::new("/nonexistent/paper.tei.xml"))
            .unwrap_err();
        assert!(matches!(err, ParserError::IoError { .. }));
    }
}
