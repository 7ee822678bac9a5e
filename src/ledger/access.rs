use log::warn;

use crate::errors::{Result, SuretyError};
use crate::types::AccountId;

/// Owner identity and the global operational switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControl {
    owner: AccountId,
    operational: bool,
}

impl AccessControl {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            operational: true,
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub fn ensure_operational(&self) -> Result<()> {
        if self.operational {
            Ok(())
        } else {
            Err(SuretyError::Halted)
        }
    }

    pub fn ensure_owner(&self, caller: &AccountId, action: &str) -> Result<()> {
        if caller == &self.owner {
            return Ok(());
        }
        warn!("{} attempted owner-only action: {}", caller.short(), action);
        Err(SuretyError::unauthorized(format!(
            "only the owner may {}",
            action
        )))
    }

    /// Flip the switch. Returns whether the flag changed.
    pub(crate) fn set_operational(&mut self, caller: &AccountId, operational: bool) -> Result<bool> {
        self.ensure_owner(caller, "change the operational status")?;
        let changed = self.operational != operational;
        self.operational = operational;
        Ok(changed)
    }
}
