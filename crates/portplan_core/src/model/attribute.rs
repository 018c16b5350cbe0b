//! Resolved attribute descriptors and filter selections.
//!
//! # Responsibility
//! - Describe where an attribute's data lives and how it is shaped.
//! - Carry the vocabulary choices offered for reference attributes.
//!
//! # Invariants
//! - Descriptors are built per request and never mutated afterwards.
//! - Only `MultiReference` attributes offer a null bucket.

use crate::schema::catalog::{AssociationLink, ColumnType, VocabularyShape};
use crate::schema::forms::ChoiceOrder;
use serde::{Deserialize, Serialize};

/// Display label used for an empty vocabulary description.
pub const EMPTY_CHOICE_LABEL: &str = "none";

/// Shape of an attribute's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Plain column: free text, date, timestamp or number.
    Scalar,
    /// One foreign key into a vocabulary.
    SingleReference,
    /// Association to zero or more vocabulary entries.
    MultiReference,
}

/// Where the values of an attribute are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSource {
    /// One plain column of the owner table.
    Column { name: String, ty: ColumnType },
    /// Several text columns of the owner table searched as one attribute.
    TextColumns(Vec<String>),
    /// Foreign-key column of the owner table.
    ForeignKey { column: String },
    /// Association rows linking the owner to vocabulary entries.
    Association(AssociationLink),
}

impl AttributeSource {
    /// Columns searched by a free-text filter, empty for non-text sources.
    pub fn text_columns(&self) -> Vec<&str> {
        match self {
            Self::Column { name, ty } if ty.is_text() => vec![name.as_str()],
            Self::TextColumns(columns) => columns.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// One entry of a controlled vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyEntry {
    pub id: i64,
    pub description: String,
}

impl VocabularyEntry {
    pub fn new(id: i64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }

    /// Description normalized for display.
    pub fn display(&self) -> &str {
        if self.description.is_empty() {
            EMPTY_CHOICE_LABEL
        } else {
            &self.description
        }
    }
}

/// Static part of a resolved attribute, independent of store contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTemplate {
    pub key: String,
    pub owner_table: String,
    pub kind: AttributeKind,
    pub label: String,
    pub source: AttributeSource,
    /// Vocabulary of reference attributes.
    pub vocabulary: Option<VocabularyShape>,
    pub order: ChoiceOrder,
}

impl AttributeTemplate {
    /// Attaches the freshly loaded choice list.
    pub fn into_resolved(self, choices: Vec<VocabularyEntry>) -> ResolvedAttribute {
        ResolvedAttribute {
            key: self.key,
            owner_table: self.owner_table,
            kind: self.kind,
            label: self.label,
            source: self.source,
            vocabulary: self.vocabulary,
            order: self.order,
            choices,
        }
    }
}

/// Read-only view of one attribute for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub key: String,
    pub owner_table: String,
    pub kind: AttributeKind,
    pub label: String,
    pub source: AttributeSource,
    pub vocabulary: Option<VocabularyShape>,
    pub order: ChoiceOrder,
    /// Ordered vocabulary entries; empty for scalars.
    pub choices: Vec<VocabularyEntry>,
}

impl ResolvedAttribute {
    /// Vocabulary naming stem, e.g. `strategy` for `strategylist`.
    pub fn root(&self) -> Option<&str> {
        self.vocabulary.as_ref().map(|shape| shape.root.as_str())
    }

    pub fn allows_null_bucket(&self) -> bool {
        self.kind == AttributeKind::MultiReference
    }

    pub fn choice(&self, id: i64) -> Option<&VocabularyEntry> {
        self.choices.iter().find(|entry| entry.id == id)
    }

    /// Whether free-text search semantics apply.
    pub fn is_text(&self) -> bool {
        self.kind == AttributeKind::Scalar && !self.source.text_columns().is_empty()
    }
}

/// Word-combination mode of a free-text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLogic {
    /// Substring match on the whole search string.
    Phrase,
    /// Every word must match.
    And,
    /// Any word may match.
    #[default]
    Or,
}

impl TextLogic {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "phrase" => Some(Self::Phrase),
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phrase => "phrase",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Values selected for one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Free-text search over text columns.
    Text { search: String, logic: TextLogic },
    /// Equality on a non-text scalar.
    Value(String),
    /// Chosen vocabulary IDs plus the "no value" flag.
    Choices { ids: Vec<i64>, include_null: bool },
}

impl Selection {
    pub fn choices(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::Choices {
            ids: ids.into_iter().collect(),
            include_null: false,
        }
    }

    pub fn null_only() -> Self {
        Self::Choices {
            ids: Vec::new(),
            include_null: true,
        }
    }

    pub fn text(search: impl Into<String>, logic: TextLogic) -> Self {
        Self::Text {
            search: search.into(),
            logic,
        }
    }

    /// Whether the selection constrains nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text { search, .. } => search.trim().is_empty(),
            Self::Value(value) => value.is_empty(),
            Self::Choices { ids, include_null } => ids.is_empty() && !include_null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Selection, TextLogic, VocabularyEntry};

    #[test]
    fn empty_description_displays_as_none() {
        assert_eq!(VocabularyEntry::new(0, "").display(), "none");
        assert_eq!(VocabularyEntry::new(1, "Library").display(), "Library");
    }

    #[test]
    fn text_logic_parses_case_insensitively() {
        assert_eq!(TextLogic::parse(" AND "), Some(TextLogic::And));
        assert_eq!(TextLogic::parse("phrase"), Some(TextLogic::Phrase));
        assert_eq!(TextLogic::parse("xor"), None);
        assert_eq!(TextLogic::default(), TextLogic::Or);
    }

    #[test]
    fn null_flag_alone_is_not_empty() {
        assert!(!Selection::null_only().is_empty());
        assert!(Selection::choices([]).is_empty());
        assert!(Selection::text("   ", TextLogic::And).is_empty());
    }
}
