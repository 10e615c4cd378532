//! `config` slice: the active [`Options`].

use serde::{Deserialize, Serialize};

use crate::settings::Options;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigAction {
    Set { options: Options },
}

impl ConfigAction {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigAction::Set { .. } => "set",
        }
    }
}

pub(crate) fn reduce(config: &mut Options, action: ConfigAction) {
    match action {
        ConfigAction::Set { options } => *config = options,
    }
}
