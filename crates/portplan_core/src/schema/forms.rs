//! Form-layer field metadata consumed by the resolver and breakdown listing.
//!
//! The form layer owns labels and the choice ordering of every selection
//! field. The engine only reads it.

use serde::Serialize;

/// Ordering of a vocabulary's choices when offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceOrder {
    ById,
    ByDescription,
    /// Storage order.
    Natural,
}

/// Declarative choice factory: which vocabulary, in which order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSource {
    pub vocabulary: String,
    pub order: ChoiceOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldWidget {
    Text,
    TextArea,
    Date,
    DateTime,
    Number,
    Select(ChoiceSource),
    MultiSelect(ChoiceSource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub id: String,
    pub label: String,
    pub table: String,
    pub widget: FieldWidget,
}

impl FormField {
    pub fn choice_source(&self) -> Option<&ChoiceSource> {
        match &self.widget {
            FieldWidget::Select(source) | FieldWidget::MultiSelect(source) => Some(source),
            _ => None,
        }
    }

    pub fn is_selection(&self) -> bool {
        self.choice_source().is_some()
    }
}

/// One entry of the "breakdown by attribute" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectFieldLabel {
    pub id: String,
    pub desc: String,
    pub table: String,
}

/// Ordered field metadata for every form.
#[derive(Debug, Clone, Default)]
pub struct FormCatalog {
    fields: Vec<FormField>,
    breakdown_tables: Vec<String>,
}

impl FormCatalog {
    /// `breakdown_tables` lists the forms whose selection fields are offered
    /// for breakdowns and resolved as association proxies.
    pub fn new(fields: Vec<FormField>, breakdown_tables: Vec<String>) -> Self {
        Self {
            fields,
            breakdown_tables,
        }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Field `id` on the form of `table`.
    pub fn field(&self, table: &str, id: &str) -> Option<&FormField> {
        self.fields
            .iter()
            .find(|field| field.table == table && field.id == id)
    }

    /// Selection-capable fields of the breakdown forms, sorted by label.
    pub fn select_fields(&self) -> Vec<&FormField> {
        let mut fields = self
            .fields
            .iter()
            .filter(|field| field.is_selection())
            .filter(|field| self.breakdown_tables.contains(&field.table))
            .collect::<Vec<_>>();
        fields.sort_by(|left, right| left.label.cmp(&right.label));
        fields
    }

    pub fn select_field_labels(&self) -> Vec<SelectFieldLabel> {
        self.select_fields()
            .into_iter()
            .map(|field| SelectFieldLabel {
                id: field.id.clone(),
                desc: field.label.clone(),
                table: field.table.clone(),
            })
            .collect()
    }
}

pub(crate) fn field(table: &str, id: &str, label: &str, widget: FieldWidget) -> FormField {
    FormField {
        id: id.to_string(),
        label: label.to_string(),
        table: table.to_string(),
        widget,
    }
}

pub(crate) fn choices(vocabulary: &str, order: ChoiceOrder) -> ChoiceSource {
    ChoiceSource {
        vocabulary: vocabulary.to_string(),
        order,
    }
}
