//! Classified intents.
//!
//! The action and its payload travel together, so a search can only ever
//! carry a filter and a creation can only ever carry creation data.

use lettings_core::filters::{PropertyFilter, ResidentFilter};
use lettings_core::types::{NewProperty, PropertyType};

/// What the user is asking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    SearchProperties,
    SearchResidents,
    CreateProperty,
    FindTenant,
    GeneralChat,
}

/// An action together with the parameters extracted for it.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    SearchProperties(PropertyFilter),
    SearchResidents(ResidentFilter),
    CreateProperty(NewProperty),
    /// Resolved as a resident search restricted to active tenancies.
    FindTenant(ResidentFilter),
    GeneralChat,
}

impl Intent {
    pub fn action(&self) -> Action {
        match self {
            Intent::SearchProperties(_) => Action::SearchProperties,
            Intent::SearchResidents(_) => Action::SearchResidents,
            Intent::CreateProperty(_) => Action::CreateProperty,
            Intent::FindTenant(_) => Action::FindTenant,
            Intent::GeneralChat => Action::GeneralChat,
        }
    }
}

/// Something the extractor could not decide on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ambiguity {
    /// More than one property type was mentioned; none was applied.
    PropertyType(Vec<PropertyType>),
}

/// Result of classifying one message.
#[derive(Clone, Debug, PartialEq)]
pub struct IntentDescriptor {
    pub intent: Intent,
    pub ambiguities: Vec<Ambiguity>,
}

impl IntentDescriptor {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            ambiguities: Vec::new(),
        }
    }

    pub fn general_chat() -> Self {
        Self::new(Intent::GeneralChat)
    }

    pub fn with_ambiguities(mut self, ambiguities: Vec<Ambiguity>) -> Self {
        self.ambiguities = ambiguities;
        self
    }

    pub fn action(&self) -> Action {
        self.intent.action()
    }

    /// Whether answering needs a data-store lookup first.
    pub fn requires_lookup(&self) -> bool {
        !matches!(self.intent, Intent::GeneralChat)
    }
}
