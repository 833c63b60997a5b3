//! Action script synthesis: compiles actions into one executable script.
//!
//! A [`Script`] is kept structured (shared prelude, named units, driver) and
//! only rendered to text when it is handed to the executor. Compilation is
//! incremental: [`compile`] takes the previously compiled script and returns a
//! new one that keeps every earlier unit verbatim, appends units for actions
//! not seen before, and replaces the driver.

mod render;
mod report;

pub use render::{API_KEYS_PARAM, REPORT_RESULT_CALL, RESULTS_VAR, SIGN_CALL};
pub use report::redirect_reports;

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::action::{Action, ActionKind, SignCondition};
use crate::error::ConfigurationError;
use crate::transaction::UnsignedTransactionData;

/// Body of one generated unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitBody {
    /// Custom code with result reports already redirected.
    Custom { code: String },
    Fetch {
        url: String,
        /// Whether the request carries the API key passed as a parameter.
        authenticated: bool,
        response_path: String,
        sign_condition: Vec<SignCondition>,
        to_sign: Vec<u8>,
    },
    Contract { transaction: UnsignedTransactionData },
}

/// A named async unit generated for one action.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptUnit {
    /// `{kind}{priority}`, also the key of the unit's result.
    pub name: String,
    pub kind: ActionKind,
    pub priority: u32,
    pub body: UnitBody,
}

/// The entry point that runs every unit concurrently and reports the results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Driver {
    /// Unit names, in emission order.
    pub units: Vec<String>,
}

/// A compiled action script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    units: Vec<ScriptUnit>,
    driver: Driver,
    /// Fetch API keys by unit name. Passed as executor parameters so they
    /// never appear in the script text.
    api_keys: BTreeMap<String, String>,
}

/// Outcome of an incremental compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub script: Script,
    /// Names of the units this compilation appended.
    pub added: Vec<String>,
}

impl Script {
    /// Compile `actions` from scratch.
    ///
    /// # Errors
    ///
    /// See [`compile`].
    pub fn compile(actions: &[Action]) -> Result<Self, ConfigurationError> {
        compile(&Self::default(), actions).map(|c| c.script)
    }

    #[must_use]
    pub fn units(&self) -> &[ScriptUnit] {
        &self.units
    }

    #[must_use]
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Look up a unit by name.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&ScriptUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Render the script text handed to the executor.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = render::prelude();
        for unit in &self.units {
            out.push('\n');
            out.push_str(&render::unit(unit));
        }
        out.push('\n');
        out.push_str(&render::driver(&self.driver));
        out
    }

    /// SHA-256 of the rendered script, lowercase hex.
    #[must_use]
    pub fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(self.render().as_bytes()))
    }

    /// Executor parameters the script expects besides the signing key.
    #[must_use]
    pub fn params(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut params = serde_json::Map::new();
        if !self.api_keys.is_empty() {
            params.insert(
                API_KEYS_PARAM.to_string(),
                serde_json::to_value(&self.api_keys).unwrap_or_default(),
            );
        }
        params
    }
}

/// Compile `actions` on top of `previous`.
///
/// Actions are emitted in ascending priority order. An action whose unit
/// name already exists in `previous` is skipped; every earlier unit is kept
/// as-is and the driver is rebuilt over all units.
///
/// # Errors
///
/// Returns [`ConfigurationError::DuplicatePriority`] when two actions share a
/// priority (among `actions`, or with an earlier unit of a different kind),
/// and any normalization error of a contract action.
pub fn compile(previous: &Script, actions: &[Action]) -> Result<Compiled, ConfigurationError> {
    let mut sorted: Vec<&Action> = actions.iter().collect();
    sorted.sort_by_key(|a| a.priority());

    if let Some(pair) = sorted
        .windows(2)
        .find(|pair| pair[0].priority() == pair[1].priority())
    {
        return Err(ConfigurationError::DuplicatePriority {
            priority: pair[0].priority(),
        });
    }

    let mut script = previous.clone();
    let mut added = Vec::new();

    for action in sorted {
        let name = action.unit_name();
        match previous.units.iter().find(|u| u.priority == action.priority()) {
            Some(existing) if existing.name == name => continue,
            Some(_) => {
                return Err(ConfigurationError::DuplicatePriority {
                    priority: action.priority(),
                });
            }
            None => {}
        }

        let body = match action {
            Action::Custom(custom) => UnitBody::Custom {
                code: redirect_reports(&custom.code, &name),
            },
            Action::Fetch(fetch) => {
                if let Some(key) = &fetch.api_key {
                    script.api_keys.insert(name.clone(), key.clone());
                }
                UnitBody::Fetch {
                    url: fetch.url(),
                    authenticated: fetch.api_key.is_some(),
                    response_path: fetch.response_path.clone(),
                    sign_condition: fetch.sign_condition.clone(),
                    to_sign: fetch.to_sign.clone(),
                }
            }
            Action::Contract(contract) => UnitBody::Contract {
                transaction: UnsignedTransactionData::from_action(contract)?,
            },
        };

        script.units.push(ScriptUnit {
            name: name.clone(),
            kind: action.kind(),
            priority: action.priority(),
            body,
        });
        added.push(name);
    }

    script.driver = Driver {
        units: script.units.iter().map(|u| u.name.clone()).collect(),
    };
    Ok(Compiled { script, added })
}
