use crate::errors::KittyError;
use crate::utils::capitalize;
use log::debug;

/// Label used by the two-party version of the ledger for "whoever was using
/// the application when the record was created".
pub const LEGACY_YOU: &str = "you";

/// Label used by the two-party version of the ledger for "the other person".
pub const LEGACY_HOUSEMATE: &str = "housemate";

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct AccountId(pub u8);

/// One of the people sharing expenses.  Accounts are fixed when the
/// registry is built and never change afterwards.
#[derive(Debug)]
pub struct Account {
    // Identifier, as stored in records
    pub name: String,
}

impl Account {
    pub fn new(name: &str) -> Self {
        Account {
            name: name.trim().into(),
        }
    }

    pub fn display_name(&self) -> String {
        capitalize(&self.name)
    }
}

/// Who paid for an expense, or who was asked to buy an item.
///
/// Records written before the ledger supported more than two people only
/// know about "you" and "housemate".  These are kept as-is, and resolved
/// relative to the current account when needed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Payer {
    LegacyYou,
    LegacyHousemate,
    Account(AccountId),
}

/// A payer resolved from the point of view of a specific account
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Viewpoint {
    pub paid_by: AccountId,
    pub is_paid_by_current: bool,
}

/// The registry of accounts
#[derive(Debug)]
pub struct AccountCollection(Vec<Account>);

impl AccountCollection {
    /// Build the registry.  Identifiers must be unique and non-empty, and
    /// there must be at least two of them.  The order given here is the
    /// registry order, used whenever a deterministic choice is needed.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self, KittyError> {
        if names.len() < 2 {
            return Err(KittyError::TooFewAccounts(names.len()));
        }
        if names.len() > usize::from(u8::MAX) {
            return Err(KittyError::Str(format!(
                "Too many accounts ({})",
                names.len()
            )));
        }

        let mut accounts: Vec<Account> = Vec::with_capacity(names.len());
        for name in names {
            let account = Account::new(name.as_ref());
            if account.name.is_empty()
                || account.name.eq_ignore_ascii_case(LEGACY_YOU)
                || account.name.eq_ignore_ascii_case(LEGACY_HOUSEMATE)
            {
                return Err(KittyError::Str(format!(
                    "Invalid account name {:?}",
                    name.as_ref()
                )));
            }
            if accounts
                .iter()
                .any(|a| a.name.eq_ignore_ascii_case(&account.name))
            {
                return Err(KittyError::Str(format!(
                    "Duplicate account name {:?}",
                    account.name
                )));
            }
            accounts.push(account);
        }
        Ok(AccountCollection(accounts))
    }

    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.0.get(usize::from(id.0))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.get(id).is_some()
    }

    /// The identifier of the account, as stored in records
    pub fn name(&self, id: AccountId) -> Option<&str> {
        self.get(id).map(|acc| acc.name.as_str())
    }

    pub fn display_name(&self, id: AccountId) -> String {
        match self.get(id) {
            Some(acc) => acc.display_name(),
            None => format!("Account #{}", id.0),
        }
    }

    /// Lookup an account by its identifier (case insensitive)
    pub fn find(&self, name: &str) -> Option<AccountId> {
        let name = name.trim();
        self.iter_accounts()
            .find(|(_, acc)| acc.name.eq_ignore_ascii_case(name))
            .map(|(id, _)| id)
    }

    pub fn iter_accounts(
        &self,
    ) -> impl Iterator<Item = (AccountId, &Account)> {
        self.0
            .iter()
            .enumerate()
            .map(|(idx, acc)| (AccountId(idx as u8), acc))
    }

    pub fn ids(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.iter_accounts().map(|(id, _)| id)
    }

    /// All accounts except `current`, in registry order
    pub fn others(
        &self,
        current: AccountId,
    ) -> impl Iterator<Item = AccountId> + '_ {
        self.ids().filter(move |id| *id != current)
    }

    /// Resolve who paid, as seen from `current`.
    /// A legacy "housemate" cannot be traced back to a specific person, so it
    /// is attributed to the first other account.  This is lossy for groups
    /// larger than two, but deterministic.
    pub fn resolve_viewpoint(
        &self,
        payer: &Payer,
        current: AccountId,
    ) -> Viewpoint {
        let paid_by = match payer {
            Payer::LegacyYou => current,
            Payer::Account(id) => *id,
            Payer::LegacyHousemate => {
                let other = self.others(current).next().unwrap_or(current);
                debug!(
                    "legacy housemate attributed to {:?}",
                    self.name(other)
                );
                other
            }
        };
        Viewpoint {
            paid_by,
            is_paid_by_current: paid_by == current,
        }
    }

    /// Parse a label as stored in records.  Returns None for labels that
    /// are neither an account nor one of the legacy labels.
    pub fn parse_payer(&self, label: &str) -> Option<Payer> {
        let label = label.trim();
        if label.eq_ignore_ascii_case(LEGACY_YOU) {
            Some(Payer::LegacyYou)
        } else if label.eq_ignore_ascii_case(LEGACY_HOUSEMATE) {
            Some(Payer::LegacyHousemate)
        } else {
            self.find(label).map(Payer::Account)
        }
    }

    /// The label to store in records
    pub fn payer_label(&self, payer: &Payer) -> String {
        match payer {
            Payer::LegacyYou => LEGACY_YOU.into(),
            Payer::LegacyHousemate => LEGACY_HOUSEMATE.into(),
            Payer::Account(id) => self.name(*id).unwrap_or_default().into(),
        }
    }
}
