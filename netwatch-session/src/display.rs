use netwatch_core::InfoField;
use std::collections::BTreeSet;

use crate::config::{Condition, TrialConfig};
use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelDirection {
    /// Game area first, info panel after it
    Standard,
    /// Info panel first
    Reversed,
}

/// Per-condition presentation of the trial screen
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRules {
    pub advice_visible: bool,
    pub accept_visible: bool,
    pub censored: BTreeSet<InfoField>,
    pub direction: PanelDirection,
}

impl DisplayRules {
    pub fn resolve(condition: &Condition, config: &TrialConfig) -> Result<Self, SessionError> {
        let hidden = config
            .advisor_hide_policy
            .hides(&condition.condition_text);

        let censored = match (&condition.censor, config.censoring) {
            (Some(selection), true) => selection.fields()?.into_iter().collect(),
            (None, true) => {
                log::warn!("Censoring enabled but the condition names no censor group");
                BTreeSet::new()
            }
            (_, false) => BTreeSet::new(),
        };

        let direction = if condition.is_baseline() {
            PanelDirection::Standard
        } else {
            PanelDirection::Reversed
        };

        Ok(Self {
            advice_visible: !hidden,
            accept_visible: !hidden,
            censored,
            direction,
        })
    }

    pub fn is_censored(&self, field: InfoField) -> bool {
        self.censored.contains(&field)
    }
}

/// Advice line shown above the classification buttons
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceDisplay {
    initial: String,
    shown: String,
    visible: bool,
}

impl AdviceDisplay {
    pub fn new(condition: &Condition, rules: &DisplayRules) -> Self {
        let shown = if condition.condition_text.is_empty() {
            condition.advice_template.clone()
        } else {
            condition.condition_text.clone()
        };
        Self {
            initial: condition.advice_template.clone(),
            shown,
            visible: rules.advice_visible,
        }
    }

    /// Called on every packet selection. An empty template leaves the
    /// advisor line on screen instead of blanking it.
    pub fn restore(&mut self) {
        if !self.initial.is_empty() {
            self.shown.clone_from(&self.initial);
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.visible.then_some(self.shown.as_str())
    }
}
