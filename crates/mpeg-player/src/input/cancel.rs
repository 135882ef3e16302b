use serde::{Deserialize, Serialize};

use super::types::{ControllerState, InputSnapshot, Key, KeyboardState, buttons};

/// Which inputs stop a blocking play. Every field is optional; a missing or
/// empty one never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CancelSpec {
    /// Any of these controller buttons.
    pub buttons_any: Option<u32>,
    /// All of these controller buttons at once.
    pub buttons_all: Option<u32>,
    /// Any of these keys.
    pub keys_any: Option<Vec<Key>>,
    /// All of these keys at once.
    pub keys_all: Option<Vec<Key>>,
}

impl CancelSpec {
    /// Cancel when every button in `mask` is held. A zero mask disables
    /// button cancel.
    pub fn buttons(mask: u32) -> Self {
        Self {
            buttons_all: Some(mask),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// A configured rule matched.
    User,
    /// The software reset combo was held.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    ResetCombo,
    ButtonsAny(u32),
    ButtonsAll(u32),
    KeysAny(Vec<Key>),
    KeysAll(Vec<Key>),
}

impl Rule {
    fn reason(&self) -> CancelReason {
        match self {
            Rule::ResetCombo => CancelReason::Reset,
            _ => CancelReason::User,
        }
    }

    fn matches_controller(&self, pad: &ControllerState) -> bool {
        match self {
            Rule::ResetCombo => pad.buttons == buttons::RESET_COMBO,
            Rule::ButtonsAny(mask) => pad.buttons & mask != 0,
            Rule::ButtonsAll(mask) => pad.buttons & mask == *mask,
            _ => false,
        }
    }

    fn matches_keyboard(&self, kb: &KeyboardState) -> bool {
        match self {
            Rule::KeysAny(keys) => keys.iter().any(|&k| kb.is_down(k)),
            Rule::KeysAll(keys) => keys.iter().all(|&k| kb.is_down(k)),
            _ => false,
        }
    }

    fn matches(&self, snapshot: &InputSnapshot) -> bool {
        snapshot.controllers.iter().any(|pad| self.matches_controller(pad))
            || snapshot.keyboards.iter().any(|kb| self.matches_keyboard(kb))
    }
}

/// A [`CancelSpec`] compiled into an ordered rule list. The reset combo is
/// always the first rule, so it wins over any user rule matching the same
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelPolicy {
    rules: Vec<Rule>,
}

impl CancelPolicy {
    pub fn new(spec: &CancelSpec) -> Self {
        let mut rules = vec![Rule::ResetCombo];
        if let Some(mask) = spec.buttons_any.filter(|&m| m != 0) {
            rules.push(Rule::ButtonsAny(mask));
        }
        if let Some(mask) = spec.buttons_all.filter(|&m| m != 0) {
            rules.push(Rule::ButtonsAll(mask));
        }
        if let Some(keys) = spec.keys_any.as_ref().filter(|k| !k.is_empty()) {
            rules.push(Rule::KeysAny(keys.clone()));
        }
        if let Some(keys) = spec.keys_all.as_ref().filter(|k| !k.is_empty()) {
            rules.push(Rule::KeysAll(keys.clone()));
        }
        Self { rules }
    }

    /// First matching rule's reason, or `None`.
    pub fn evaluate(&self, snapshot: &InputSnapshot) -> Option<CancelReason> {
        self.rules
            .iter()
            .find(|rule| rule.matches(snapshot))
            .map(Rule::reason)
    }

    /// Number of user rules, not counting the reset combo.
    pub fn user_rules(&self) -> usize {
        self.rules.len() - 1
    }
}
