//! Document arena
//!
//! The section tree is stored as flat vectors indexed by typed ids. Cross
//! references (sentence -> data instance -> dataset) are plain ids, so the
//! annotation tables and the tree can be serialized and checked without any
//! shared mutable nodes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ClassificationResult, DataseerError, Result};

// ============================================================================
// Identifiers
// ============================================================================

/// Section identifier (index into the section arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub usize);

/// Paragraph identifier (index into the paragraph arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParagraphId(pub usize);

/// Sentence identifier (index into the sentence arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentenceId(pub usize);

/// Dataset identifier (index into the dataset table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub usize);

/// Data instance identifier (index into the data instance table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataInstanceId(pub usize);

impl std::fmt::Display for SentenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sentence-{}", self.0)
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dataset-{}", self.0)
    }
}

impl std::fmt::Display for DataInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dataInstance-{}", self.0)
    }
}

// ============================================================================
// Tree Nodes
// ============================================================================

/// Ordered child of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionChild {
    Paragraph(ParagraphId),
    Section(SectionId),
}

/// A document section (TEI `div`, abstract, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,

    /// Enclosing section, None for top-level sections
    pub parent: Option<SectionId>,

    /// Heading text
    pub heading: Option<String>,

    /// Paragraphs and nested sections in document order
    pub children: Vec<SectionChild>,

    /// Relevance decision, unset until the relevance filter ran
    pub relevant: Option<bool>,

    /// Set to `"dataseer"` once a descendant sentence is accepted
    pub subtype: Option<String>,
}

impl Section {
    /// Whether the section was decided relevant
    pub fn is_relevant(&self) -> bool {
        self.relevant.unwrap_or(false)
    }

    /// Direct paragraph children in order
    pub fn paragraph_ids(&self) -> impl Iterator<Item = ParagraphId> + '_ {
        self.children.iter().filter_map(|child| match child {
            SectionChild::Paragraph(id) => Some(*id),
            SectionChild::Section(_) => None,
        })
    }
}

/// A textual unit (paragraph or figure caption)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub id: ParagraphId,

    pub section: SectionId,

    /// Serialized inner content, possibly with inline markup
    pub content: String,

    /// Sentences in order
    pub sentences: Vec<SentenceId>,

    /// Number of sentences locally accepted as dataset-bearing
    pub dataset_evidence: usize,
}

/// A sentence and its classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    pub id: SentenceId,

    pub paragraph: ParagraphId,

    /// Well-formed sentence content including inline markup
    pub markup: String,

    /// Plain text sent to the classifiers
    pub text: String,

    /// Cascade outcome
    pub classification: Option<ClassificationResult>,

    /// Mention created for this sentence
    pub data_instance: Option<DataInstanceId>,
}

// ============================================================================
// Annotation Tables
// ============================================================================

/// A dataset introduced by the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,

    /// Best-guess dataset type
    #[serde(rename = "type")]
    pub data_type: String,

    pub subtype: Option<String>,
}

/// One sentence-level mention of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInstance {
    pub id: DataInstanceId,

    pub dataset: DatasetId,

    pub sentence: SentenceId,

    /// `has_dataset` probability at acceptance time
    pub certainty: f64,

    pub reuse: bool,
}

// ============================================================================
// Document
// ============================================================================

/// A structured document with its annotation tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,

    pub title: Option<String>,

    roots: Vec<SectionId>,
    sections: Vec<Section>,
    paragraphs: Vec<Paragraph>,
    sentences: Vec<Sentence>,
    datasets: Vec<Dataset>,
    data_instances: Vec<DataInstance>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: None,
            roots: Vec::new(),
            sections: Vec::new(),
            paragraphs: Vec::new(),
            sentences: Vec::new(),
            datasets: Vec::new(),
            data_instances: Vec::new(),
        }
    }

    /// Set title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a section, nested under `parent` when given
    pub fn add_section(&mut self, parent: Option<SectionId>, heading: Option<String>) -> SectionId {
        let id = SectionId(self.sections.len());
        self.sections.push(Section {
            id,
            parent,
            heading,
            children: Vec::new(),
            relevant: None,
            subtype: None,
        });

        match parent.and_then(|p| self.sections.get_mut(p.0)) {
            Some(parent_section) => parent_section.children.push(SectionChild::Section(id)),
            None => self.roots.push(id),
        }
        id
    }

    /// Add a paragraph at the end of a section
    pub fn add_paragraph(
        &mut self,
        section: SectionId,
        content: impl Into<String>,
    ) -> Result<ParagraphId> {
        let id = ParagraphId(self.paragraphs.len());
        let owner = self
            .sections
            .get_mut(section.0)
            .ok_or_else(|| DataseerError::InvalidReference(format!("section {}", section.0)))?;
        owner.children.push(SectionChild::Paragraph(id));

        self.paragraphs.push(Paragraph {
            id,
            section,
            content: content.into(),
            sentences: Vec::new(),
            dataset_evidence: 0,
        });
        Ok(id)
    }

    /// Append a sentence to a paragraph
    pub fn add_sentence(
        &mut self,
        paragraph: ParagraphId,
        markup: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<SentenceId> {
        let id = SentenceId(self.sentences.len());
        let owner = self
            .paragraphs
            .get_mut(paragraph.0)
            .ok_or_else(|| DataseerError::InvalidReference(format!("paragraph {}", paragraph.0)))?;
        owner.sentences.push(id);

        self.sentences.push(Sentence {
            id,
            paragraph,
            markup: markup.into(),
            text: text.into(),
            classification: None,
            data_instance: None,
        });
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id.0)
    }

    pub fn section_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.sections.get_mut(id.0)
    }

    pub fn paragraph(&self, id: ParagraphId) -> Option<&Paragraph> {
        self.paragraphs.get(id.0)
    }

    pub fn paragraph_mut(&mut self, id: ParagraphId) -> Option<&mut Paragraph> {
        self.paragraphs.get_mut(id.0)
    }

    pub fn sentence(&self, id: SentenceId) -> Option<&Sentence> {
        self.sentences.get(id.0)
    }

    pub fn sentence_mut(&mut self, id: SentenceId) -> Option<&mut Sentence> {
        self.sentences.get_mut(id.0)
    }

    pub fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.datasets.get(id.0)
    }

    pub fn data_instance(&self, id: DataInstanceId) -> Option<&DataInstance> {
        self.data_instances.get(id.0)
    }

    /// Top-level sections
    pub fn roots(&self) -> &[SectionId] {
        &self.roots
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn data_instances(&self) -> &[DataInstance] {
        &self.data_instances
    }

    /// Sections in document (pre-)order
    pub fn section_order(&self) -> Vec<SectionId> {
        let mut order = Vec::with_capacity(self.sections.len());
        let mut stack: Vec<SectionId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(section) = self.section(id) {
                for child in section.children.iter().rev() {
                    if let SectionChild::Section(child_id) = child {
                        stack.push(*child_id);
                    }
                }
            }
        }
        order
    }

    /// The section itself followed by its ancestors up to a top-level section
    pub fn ancestors(&self, id: SectionId) -> Vec<SectionId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(section) = current.and_then(|c| self.section(c)) {
            chain.push(section.id);
            current = section.parent;
        }
        chain
    }

    /// Section containing a sentence
    pub fn section_of(&self, sentence: SentenceId) -> Option<SectionId> {
        let sentence = self.sentence(sentence)?;
        self.paragraph(sentence.paragraph).map(|p| p.section)
    }

    // ------------------------------------------------------------------------
    // Annotation tables
    // ------------------------------------------------------------------------

    /// Remove previous annotations: tables, sentence links and section markers
    pub fn clear_annotations(&mut self) {
        self.datasets.clear();
        self.data_instances.clear();
        for sentence in &mut self.sentences {
            sentence.data_instance = None;
        }
        for section in &mut self.sections {
            section.subtype = None;
        }
    }

    /// Attach the assembled Dataset and DataInstance tables
    pub fn attach_tables(&mut self, datasets: Vec<Dataset>, data_instances: Vec<DataInstance>) {
        self.datasets = datasets;
        self.data_instances = data_instances;
    }

    /// Check cross-reference integrity of the annotation layer
    pub fn validate_references(&self) -> Result<()> {
        for instance in &self.data_instances {
            if self.dataset(instance.dataset).is_none() {
                return Err(DataseerError::InvalidReference(format!(
                    "{} points to missing {}",
                    instance.id, instance.dataset
                )));
            }

            let sentence = self.sentence(instance.sentence).ok_or_else(|| {
                DataseerError::InvalidReference(format!(
                    "{} points to missing {}",
                    instance.id, instance.sentence
                ))
            })?;

            if sentence.data_instance != Some(instance.id) {
                return Err(DataseerError::InvalidReference(format!(
                    "{} is not linked back from {}",
                    instance.id, sentence.id
                )));
            }

            let relevant = self
                .section_of(sentence.id)
                .and_then(|s| self.section(s))
                .map(|s| s.is_relevant())
                .unwrap_or(false);
            if !relevant {
                return Err(DataseerError::InvalidReference(format!(
                    "{} lies outside a relevant section",
                    sentence.id
                )));
            }
        }

        let mut has_mention = vec![false; self.sections.len()];
        for sentence in self.sentences.iter().filter(|s| s.data_instance.is_some()) {
            if let Some(section) = self.section_of(sentence.id) {
                for ancestor in self.ancestors(section) {
                    has_mention[ancestor.0] = true;
                }
            }
        }

        for section in &self.sections {
            if section.subtype.is_some() && !has_mention[section.id.0] {
                return Err(DataseerError::InvalidReference(format!(
                    "section {} is marked without an accepted sentence",
                    section.id.0
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
