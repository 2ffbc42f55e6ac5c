use crate::accounts::{AccountCollection, AccountId};
use crate::expenses::{Expense, SplitWith};
use crate::formatters::Formatter;
use crate::settings::Settings;
use itertools::Itertools;
use rust_decimal::Decimal;

//--------------------------------------------------------------
// Participants
//--------------------------------------------------------------

/// How an expense is shared once its payer has been resolved
struct Shares {
    payer: AccountId,

    // Accounts that owe a share of the expense (the payer may be one of
    // them, in which case it simply owes itself)
    debtors: Vec<AccountId>,

    share: Decimal,
}

impl Shares {
    fn new(
        expense: &Expense,
        registry: &AccountCollection,
        current: AccountId,
    ) -> Self {
        let payer = registry.resolve_viewpoint(&expense.paid_by, current).paid_by;
        let debtors: Vec<AccountId> = match expense.split_with {
            SplitWith::All => registry.ids().collect(),

            // A settlement moves the whole amount from one account to the
            // other, it is not shared.
            SplitWith::With(other) if expense.is_settlement => vec![other],

            SplitWith::With(other) if other == payer => vec![payer],
            SplitWith::With(other) => vec![payer, other],
        };
        let share = match debtors.len() {
            0 => Decimal::ZERO,
            n => expense.amount / Decimal::from(n),
        };
        Shares {
            payer,
            debtors,
            share,
        }
    }

    fn involves(&self, account: AccountId) -> bool {
        self.payer == account || self.debtors.contains(&account)
    }
}

/// The accounts an expense is split across, as seen from `current` (which
/// only matters for legacy records).
pub fn participants(
    expense: &Expense,
    registry: &AccountCollection,
    current: AccountId,
) -> Vec<AccountId> {
    let shares = Shares::new(expense, registry, current);
    let mut result = shares.debtors.clone();
    if !result.contains(&shares.payer) {
        result.push(shares.payer);
    }
    result
}

/// How much each account involved in the expense gains (positive) or loses
/// (negative).  The payer is owed the amount minus its own share, every
/// other participant owes its share.  The values always sum to zero.
pub fn net_positions(
    expense: &Expense,
    registry: &AccountCollection,
    current: AccountId,
) -> Vec<(AccountId, Decimal)> {
    let shares = Shares::new(expense, registry, current);
    let mut result = vec![(shares.payer, expense.amount)];
    for debtor in &shares.debtors {
        match result.iter_mut().find(|(acc, _)| acc == debtor) {
            Some((_, value)) => *value -= shares.share,
            None => result.push((*debtor, -shares.share)),
        }
    }
    result
}

/// The effect of a single expense on the current account: positive when
/// the others owe it money because of this expense, negative when it owes
/// them, zero when not involved.
pub fn impact(
    expense: &Expense,
    registry: &AccountCollection,
    current: AccountId,
) -> Decimal {
    compute_balances(std::slice::from_ref(expense), registry, current)
        .iter()
        .map(|(_, value)| value)
        .sum()
}

//--------------------------------------------------------------
// Balances
//--------------------------------------------------------------

/// What each other account owes the current account.  Positive values mean
/// that account owes the current one, negative values mean the current
/// account owes it.
///
/// Balances are only tracked between the current account and each of the
/// others, never between two other accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct Balances {
    current: AccountId,

    // In registry order
    values: Vec<(AccountId, Decimal)>,
}

/// Aggregated view of the balances
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    // Sum of what the current account owes others
    pub you_owe: Decimal,

    // Sum of what others owe the current account
    pub owed_to_you: Decimal,
}

/// Compute the balances between `current` and every other account.
/// This is a pure function of its inputs.
pub fn compute_balances(
    expenses: &[Expense],
    registry: &AccountCollection,
    current: AccountId,
) -> Balances {
    let mut values: Vec<(AccountId, Decimal)> = registry
        .others(current)
        .map(|acc| (acc, Decimal::ZERO))
        .collect();

    for expense in expenses {
        let shares = Shares::new(expense, registry, current);
        if !shares.involves(current) {
            continue;
        }

        for (other, balance) in values.iter_mut() {
            if !shares.debtors.contains(other) && shares.payer != *other {
                continue;
            }
            if shares.payer == current {
                if shares.debtors.contains(other) {
                    *balance += shares.share;
                }
            } else if shares.payer == *other
                && shares.debtors.contains(&current)
            {
                *balance -= shares.share;
            }
        }
    }

    Balances { current, values }
}

impl Balances {
    pub fn current(&self) -> AccountId {
        self.current
    }

    /// The balance with one other account (zero for the current account
    /// itself, or unknown accounts)
    pub fn get(&self, account: AccountId) -> Decimal {
        self.values
            .iter()
            .find(|(acc, _)| *acc == account)
            .map(|(_, v)| *v)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AccountId, Decimal)> + '_ {
        self.values.iter().copied()
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for (_, v) in &self.values {
            if v.is_sign_negative() {
                totals.you_owe += v.abs();
            } else {
                totals.owed_to_you += *v;
            }
        }
        totals
    }

    /// Whether no debt remains in either direction
    pub fn is_settled(&self, settings: &Settings) -> bool {
        self.values.iter().all(|(_, v)| settings.is_negligible(*v))
    }

    /// The account the current one owes the most to, if any
    pub fn largest_creditor(
        &self,
        settings: &Settings,
    ) -> Option<(AccountId, Decimal)> {
        self.iter()
            .filter(|(_, v)| v.is_sign_negative() && !settings.is_negligible(*v))
            .min_by_key(|(_, v)| *v)
            .map(|(acc, v)| (acc, v.abs()))
    }

    /// The account that owes the most to the current one, if any
    pub fn largest_debtor(
        &self,
        settings: &Settings,
    ) -> Option<(AccountId, Decimal)> {
        // max_by_key keeps the last maximum, iterate backward so that ties
        // go to the first account in registry order
        self.values
            .iter()
            .rev()
            .copied()
            .filter(|(_, v)| v.is_sign_positive() && !settings.is_negligible(*v))
            .max_by_key(|(_, v)| *v)
    }

    /// One sentence per other account
    pub fn describe(
        &self,
        registry: &AccountCollection,
        settings: &Settings,
        format: &Formatter,
    ) -> Vec<String> {
        self.iter()
            .map(|(acc, v)| {
                let name = registry.display_name(acc);
                if settings.is_negligible(v) {
                    format!("You and {name} are settled up")
                } else if v.is_sign_negative() {
                    format!("You owe {name} {}", format.display(v.abs()))
                } else {
                    format!("{name} owes you {}", format.display(v))
                }
            })
            .collect()
    }

    /// A single line describing all balances
    pub fn summary(
        &self,
        registry: &AccountCollection,
        settings: &Settings,
        format: &Formatter,
    ) -> String {
        if self.is_settled(settings) {
            return self.totals().headline(settings, format);
        }
        self.describe(registry, settings, format)
            .into_iter()
            .zip(self.iter())
            .filter(|(_, (_, v))| !settings.is_negligible(*v))
            .map(|(line, _)| line)
            .join(", ")
    }
}

impl Totals {
    pub fn headline(&self, settings: &Settings, format: &Formatter) -> String {
        if !settings.is_negligible(self.you_owe) {
            format!("You owe {}", format.display(self.you_owe))
        } else if !settings.is_negligible(self.owed_to_you) {
            format!("You are owed {}", format.display(self.owed_to_you))
        } else {
            "You are all settled up!".into()
        }
    }
}
