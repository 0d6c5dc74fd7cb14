//! Match and action template descriptors.
//!
//! Templates are compiled outside of the steering core. What the core
//! consumes is a fixed-layout descriptor: the key extractor ("definer")
//! selected for each match template and the number of supplemental
//! entries each action template needs.

use serde::{Deserialize, Serialize};

use crate::error::DevxResult;
use crate::types::TableType;

/// Key extractor layout class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefinerKind {
    Match,
    /// Extended key spanning two entries.
    Jumbo,
    Range,
    Compare,
}

/// One selected field of a key extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefinerField {
    pub selector: u32,
    pub mask: u32,
}

/// Key extractor produced by the template compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definer {
    /// Hardware definer object number.
    pub id: u32,
    pub kind: DefinerKind,
    pub fields: Vec<DefinerField>,
}

impl Definer {
    /// Creates a definer.
    pub fn new(id: u32, kind: DefinerKind, fields: Vec<DefinerField>) -> Self {
        Self { id, kind, fields }
    }

    /// Returns true for an extended ("jumbo") key.
    pub fn is_jumbo(&self) -> bool {
        self.kind == DefinerKind::Jumbo
    }

    /// Returns true when both definers extract the same key.
    ///
    /// Two definers created for different matchers have different object
    /// numbers, so only the layout is compared.
    pub fn is_equivalent(&self, other: &Definer) -> bool {
        self.kind == other.kind && self.fields == other.fields
    }
}

/// Compiled match template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTemplate {
    pub id: u32,
    /// Fields the template matches on.
    pub fields: Vec<DefinerField>,
    /// Template needs an extended key.
    pub jumbo: bool,
    /// Template has a range match on a second entry.
    pub range: bool,
    /// Template compares two packet fields.
    pub compare: bool,
}

impl MatchTemplate {
    /// Creates a plain match template over the given fields.
    pub fn new(id: u32, fields: Vec<DefinerField>) -> Self {
        Self {
            id,
            fields,
            jumbo: false,
            range: false,
            compare: false,
        }
    }
}

/// Action kinds carried by an action template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Count,
    Tag,
    ModifyHeader,
    Reformat,
    PushVlan,
    Drop,
    Jump,
    Miss,
}

impl ActionType {
    /// Returns true for actions that end processing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionType::Drop | ActionType::Jump | ActionType::Miss)
    }
}

/// Compiled action template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub id: u32,
    pub actions: Vec<ActionType>,
    /// Entries needed to hold the actions, including the match entry.
    pub num_of_action_stes: u32,
    /// Template carries only terminal actions.
    pub only_term: bool,
    /// Actions may be applied in any order.
    pub relaxed_order: bool,
    /// Rules using this template need dependent writes.
    pub need_dep_write: bool,
}

impl ActionTemplate {
    /// Creates an action template needing `num_of_action_stes` entries.
    pub fn new(id: u32, actions: Vec<ActionType>, num_of_action_stes: u32) -> Self {
        let only_term = !actions.is_empty() && actions.iter().all(ActionType::is_terminal);
        Self {
            id,
            actions,
            num_of_action_stes,
            only_term,
            relaxed_order: false,
            need_dep_write: false,
        }
    }

    /// Supplemental entries this template needs beyond the match entry.
    pub fn required_stes(&self, is_jumbo: bool) -> u32 {
        let inline = u32::from(!is_jumbo || self.only_term);
        self.num_of_action_stes.saturating_sub(inline)
    }
}

/// Definers selected for a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatcherDefiners {
    /// One match definer per match template.
    pub match_definers: Vec<Definer>,
    /// Range definer per match template, if any.
    pub range_definers: Vec<Option<Definer>>,
    /// Separate hashing definer, when hashing differs from matching.
    pub hash_definer: Option<Definer>,
    /// Matcher compares packet fields instead of matching values.
    pub compare: bool,
}

impl MatcherDefiners {
    /// Returns true when the first template uses an extended key.
    pub fn is_jumbo(&self) -> bool {
        self.match_definers.first().is_some_and(Definer::is_jumbo)
    }

    /// Returns true when the first template carries a range definer.
    pub fn is_range(&self) -> bool {
        self.range_definers.first().is_some_and(Option::is_some)
    }
}

/// Template compiler collaborator.
pub trait TemplateCompiler: Send + Sync {
    /// Selects and creates the definers for a matcher's match templates.
    fn matcher_init(
        &self,
        table_type: TableType,
        templates: &[MatchTemplate],
    ) -> DevxResult<MatcherDefiners>;

    /// Releases definers created by [`TemplateCompiler::matcher_init`].
    fn matcher_uninit(&self, definers: &MatcherDefiners);

    /// Checks that the action order of a template is valid for the domain.
    fn check_action_combo(&self, template: &ActionTemplate, table_type: TableType) -> bool;

    /// Prepares the action setters of a template.
    fn process_action_template(&self, template: &ActionTemplate) -> DevxResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(selector: u32) -> DefinerField {
        DefinerField {
            selector,
            mask: 0xffff_ffff,
        }
    }

    #[test]
    fn test_definer_equivalence_ignores_id() {
        let a = Definer::new(1, DefinerKind::Match, vec![field(1), field(2)]);
        let b = Definer::new(9, DefinerKind::Match, vec![field(1), field(2)]);
        let c = Definer::new(1, DefinerKind::Jumbo, vec![field(1), field(2)]);
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn test_required_stes() {
        let at = ActionTemplate::new(1, vec![ActionType::Count, ActionType::ModifyHeader], 3);
        assert_eq!(at.required_stes(false), 2);
        assert_eq!(at.required_stes(true), 3);

        let term = ActionTemplate::new(2, vec![ActionType::Drop], 1);
        assert!(term.only_term);
        assert_eq!(term.required_stes(true), 0);
    }

    #[test]
    fn test_template_roundtrip_json() {
        let mt = MatchTemplate::new(3, vec![field(7)]);
        let json = serde_json::to_string(&mt).unwrap();
        let back: MatchTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(mt, back);
    }
}
