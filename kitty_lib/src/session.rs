use crate::accounts::{AccountCollection, AccountId};
use crate::balances::{compute_balances, impact, Balances, Totals};
use crate::errors::KittyError;
use crate::expenses::Expense;
use crate::formatters::Formatter;
use crate::records::{
    parse_list, ExpenseRecord, SettlementRecord, ShoppingItemRecord,
    SuggestionRecord,
};
use crate::settings::Settings;
use crate::settlements::Settlement;
use crate::shopping::ShoppingItem;
use crate::storage::BlobStore;
use crate::suggestions::{Suggestion, SuggestionStatus};
use crate::times::{Clock, IdGenerator};
use anyhow::Result;
use chrono::{DateTime, Local};
use log::{debug, info, warn};

pub const EXPENSES_KEY: &str = "expenses";
pub const LEGACY_EXPENSES_KEY: &str = "expenseTracker";
pub const CURRENT_ACCOUNT_KEY: &str = "currentAccount";

fn suggestions_key(account: &str) -> String {
    format!("suggestions_{account}")
}
fn shopping_items_key(account: &str) -> String {
    format!("shoppingItems_{account}")
}
fn settlements_key(account: &str) -> String {
    format!("settlements_{account}")
}

/// The answer of the user when asked to confirm a destructive or bulk
/// action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Cancel,
}

/// The collections owned by a single account.  Most recent first.
#[derive(Debug, Default)]
pub(crate) struct AccountBook {
    pub(crate) suggestions: Vec<Suggestion>,
    pub(crate) shopping_items: Vec<ShoppingItem>,
    pub(crate) settlements: Vec<Settlement>,
}

impl AccountBook {
    fn load(
        store: &impl BlobStore,
        registry: &AccountCollection,
        account: &str,
    ) -> Result<Self> {
        let suggestions: Vec<SuggestionRecord> =
            parse_list(store.read(&suggestions_key(account))?.as_deref())?;
        let items: Vec<ShoppingItemRecord> =
            parse_list(store.read(&shopping_items_key(account))?.as_deref())?;
        let settlements: Vec<SettlementRecord> =
            parse_list(store.read(&settlements_key(account))?.as_deref())?;

        let mut book = AccountBook::default();
        for s in suggestions {
            // accepted and rejected suggestions are deleted right away
            if s.status == SuggestionStatus::Pending {
                book.suggestions.push(s.into_suggestion());
            } else {
                warn!("{account}: dropping {:?} suggestion {}", s.status, s.id);
            }
        }
        for i in items {
            // bought items have become expenses
            if i.bought {
                warn!("{account}: dropping bought item {}", i.id);
            } else {
                book.shopping_items.push(i.into_item(registry));
            }
        }
        for s in settlements {
            book.settlements.push(s.into_settlement(registry)?);
        }
        Ok(book)
    }

    fn save(
        &self,
        store: &mut impl BlobStore,
        registry: &AccountCollection,
        account: &str,
    ) -> Result<()> {
        let suggestions: Vec<_> = self
            .suggestions
            .iter()
            .map(SuggestionRecord::from_suggestion)
            .collect();
        let items: Vec<_> = self
            .shopping_items
            .iter()
            .map(|i| ShoppingItemRecord::from_item(i, registry))
            .collect();
        let settlements: Vec<_> = self
            .settlements
            .iter()
            .map(|s| SettlementRecord::from_settlement(s, registry))
            .collect();
        store.write(
            &suggestions_key(account),
            &serde_json::to_string(&suggestions)?,
        )?;
        store.write(
            &shopping_items_key(account),
            &serde_json::to_string(&items)?,
        )?;
        store.write(
            &settlements_key(account),
            &serde_json::to_string(&settlements)?,
        )?;
        Ok(())
    }

    fn max_id(&self) -> Option<i64> {
        self.suggestions
            .iter()
            .map(|s| s.id.0)
            .chain(self.shopping_items.iter().map(|i| i.id.0))
            .chain(self.settlements.iter().map(|s| s.id.0))
            .max()
    }
}

/// The ledger as seen by one account.
/// Expenses are shared by everyone, while suggestions, shopping items and
/// settlements belong to the current account and are swapped when
/// switching accounts.
pub struct Session {
    pub(crate) registry: AccountCollection,
    pub(crate) current: AccountId,
    pub(crate) settings: Settings,
    pub(crate) expenses: Vec<Expense>,
    pub(crate) book: AccountBook,
    clock: Box<dyn Clock>,
    ids: IdGenerator,
}

impl Session {
    /// An empty ledger
    pub fn new(
        registry: AccountCollection,
        current: AccountId,
        settings: Settings,
        clock: Box<dyn Clock>,
    ) -> Result<Self, KittyError> {
        if !registry.contains(current) {
            return Err(KittyError::UnknownAccount(format!("#{}", current.0)));
        }
        Ok(Session {
            registry,
            current,
            settings,
            expenses: Vec::new(),
            book: AccountBook::default(),
            clock,
            ids: IdGenerator::default(),
        })
    }

    /// Load the ledger from the store.  The current account is the one
    /// that was active when it was last saved, or the first account.
    pub fn open(
        store: &impl BlobStore,
        registry: AccountCollection,
        settings: Settings,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        let current = match store.read(CURRENT_ACCOUNT_KEY)? {
            None => AccountId(0),
            Some(name) => registry.find(&name).unwrap_or_else(|| {
                warn!("unknown current account {name:?}");
                AccountId(0)
            }),
        };
        let mut session = Session::new(registry, current, settings, clock)?;

        let json = match store.read(EXPENSES_KEY)? {
            Some(json) => Some(json),
            None => {
                let legacy = store.read(LEGACY_EXPENSES_KEY)?;
                if legacy.is_some() {
                    info!("reading expenses from {LEGACY_EXPENSES_KEY:?}");
                }
                legacy
            }
        };
        let records: Vec<ExpenseRecord> = parse_list(json.as_deref())?;
        session.expenses = records
            .into_iter()
            .map(|r| r.into_expense(&session.registry))
            .collect();
        session.book = AccountBook::load(
            store,
            &session.registry,
            session.current_name(),
        )?;

        if let Some(id) = session.expenses.iter().map(|e| e.id.0).max() {
            session.ids.observe(id);
        }
        if let Some(id) = session.book.max_id() {
            session.ids.observe(id);
        }
        info!(
            "opened ledger as {}: {} expenses, {} suggestions, {} items, {} settlements",
            session.current_name(),
            session.expenses.len(),
            session.book.suggestions.len(),
            session.book.shopping_items.len(),
            session.book.settlements.len(),
        );
        Ok(session)
    }

    /// Persist the shared expenses and the current account's collections
    pub fn save(&self, store: &mut impl BlobStore) -> Result<()> {
        let expenses: Vec<_> = self
            .expenses
            .iter()
            .map(|e| ExpenseRecord::from_expense(e, &self.registry))
            .collect();
        store.write(EXPENSES_KEY, &serde_json::to_string(&expenses)?)?;
        self.book.save(store, &self.registry, self.current_name())?;
        store.write(CURRENT_ACCOUNT_KEY, self.current_name())?;
        Ok(())
    }

    /// Make another account current.  Its own collections are loaded from
    /// the store, after saving those of the previous account.  Expenses are
    /// not reloaded.
    pub fn switch_account(
        &mut self,
        store: &mut impl BlobStore,
        account: AccountId,
    ) -> Result<()> {
        self.check_account(account)?;
        if account == self.current {
            debug!("already using {}", self.current_name());
            return Ok(());
        }
        self.book.save(store, &self.registry, self.current_name())?;

        let name = self.registry.name(account).unwrap_or_default();
        let book = AccountBook::load(store, &self.registry, name)?;
        if let Some(id) = book.max_id() {
            self.ids.observe(id);
        }
        store.write(CURRENT_ACCOUNT_KEY, name)?;
        info!("switched from {} to {name}", self.current_name());
        self.book = book;
        self.current = account;
        Ok(())
    }

    pub fn registry(&self) -> &AccountCollection {
        &self.registry
    }

    pub fn current(&self) -> AccountId {
        self.current
    }

    fn current_name(&self) -> &str {
        self.registry.name(self.current).unwrap_or_default()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Most recent first
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.book.suggestions
    }

    pub fn shopping_items(&self) -> &[ShoppingItem] {
        &self.book.shopping_items
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.book.settlements
    }

    pub fn formatter(&self) -> Formatter {
        Formatter::with_symbol(&self.settings.currency_symbol)
    }

    /// The balances between the current account and all the others
    pub fn balances(&self) -> Balances {
        compute_balances(&self.expenses, &self.registry, self.current)
    }

    pub fn totals(&self) -> Totals {
        self.balances().totals()
    }

    /// One line describing where the current account stands
    pub fn summary(&self) -> String {
        self.balances()
            .summary(&self.registry, &self.settings, &self.formatter())
    }

    /// How a single expense affects the current account
    pub fn impact_line(&self, expense: &Expense) -> String {
        let value = impact(expense, &self.registry, self.current);
        if self.settings.is_negligible(value) {
            "not involved".into()
        } else if value.is_sign_negative() {
            format!("you owe {}", self.formatter().display(value.abs()))
        } else {
            format!("you get {}", self.formatter().display(value))
        }
    }

    pub(crate) fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    /// A new unique id for a record created at `date`
    pub(crate) fn next_id(&mut self, date: DateTime<Local>) -> i64 {
        self.ids.next(date)
    }

    pub(crate) fn check_account(
        &self,
        account: AccountId,
    ) -> Result<(), KittyError> {
        if self.registry.contains(account) {
            Ok(())
        } else {
            Err(KittyError::UnknownAccount(format!("#{}", account.0)))
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use crate::accounts::test::{three_accounts, ALEX, JO, SAM};
    use crate::accounts::{AccountId, Payer};
    use crate::expenses::{ExpenseDetails, SplitWith};
    use crate::session::{Decision, Session, CURRENT_ACCOUNT_KEY};
    use crate::settings::Settings;
    use crate::settlements::{Screenshot, SettlementDetails, SettlementKind};
    use crate::storage::{BlobStore, MemoryStore};
    use crate::times::FixedClock;
    use chrono::{Local, TimeZone};
    use rust_decimal_macros::dec;

    pub fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn clock() -> Box<FixedClock> {
        Box::new(FixedClock::new(
            Local.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        ))
    }

    pub fn new_session(current: AccountId) -> Session {
        init_logs();
        Session::new(three_accounts(), current, Settings::default(), clock())
            .unwrap()
    }

    fn open(store: &MemoryStore) -> Session {
        Session::open(store, three_accounts(), Settings::default(), clock())
            .unwrap()
    }

    fn paid(session: &mut Session, amount: rust_decimal::Decimal, by: AccountId) {
        session
            .add_expense(ExpenseDetails {
                description: "Groceries",
                amount,
                paid_by: by,
                split_with: SplitWith::All,
            })
            .unwrap();
    }

    #[test]
    fn test_new() {
        assert!(Session::new(
            three_accounts(),
            AccountId(3),
            Settings::default(),
            clock()
        )
        .is_err());
    }

    #[test]
    fn test_save_and_open() {
        let mut store = MemoryStore::default();
        let mut session = new_session(SAM);
        paid(&mut session, dec!(60), SAM);
        session.suggest("Milk", Some(dec!(2)), Some("empty")).unwrap();
        session.save(&mut store).unwrap();
        assert_eq!(
            store.read(CURRENT_ACCOUNT_KEY).unwrap().as_deref(),
            Some("sam")
        );

        let mut reopened = open(&store);
        assert_eq!(reopened.current(), SAM);
        assert_eq!(reopened.expenses(), session.expenses());
        assert_eq!(reopened.suggestions(), session.suggestions());
        assert_eq!(reopened.balances(), session.balances());

        // ids keep increasing after reopening, even with the same clock
        let old = reopened.expenses()[0].id;
        paid(&mut reopened, dec!(5), ALEX);
        assert!(reopened.expenses()[0].id > old);
    }

    #[test]
    fn test_open_empty() {
        let session = open(&MemoryStore::default());
        assert_eq!(session.current(), ALEX);
        assert!(session.expenses().is_empty());
        assert_eq!(session.summary(), "You are all settled up!");
    }

    #[test]
    fn test_legacy_key() {
        let mut store = MemoryStore::default();
        store
            .write(
                "expenseTracker",
                r#"[{"id": 1, "description": "Pizza", "amount": 30,
                     "paidBy": "you", "date": "2024-05-29T16:26:40Z"}]"#,
            )
            .unwrap();
        let session = open(&store);
        assert_eq!(session.expenses().len(), 1);
        assert_eq!(session.expenses()[0].paid_by, Payer::LegacyYou);

        // the current key wins once it exists
        store.write("expenses", "[]").unwrap();
        assert!(open(&store).expenses().is_empty());
    }

    #[test]
    fn test_load_normalization() {
        let mut store = MemoryStore::default();
        store
            .write(
                "shoppingItems_alex",
                r#"[{"id": 2, "description": "Soap", "amount": 3,
                     "date": "2024-05-29T16:26:40Z", "assignedTo": "sam",
                     "bought": true},
                    {"id": 3, "description": "Tea",
                     "date": "2024-05-29T16:26:40Z"}]"#,
            )
            .unwrap();
        store
            .write(
                "suggestions_alex",
                r#"[{"id": 4, "description": "Rug",
                     "date": "2024-05-29T16:26:40Z", "status": "rejected"}]"#,
            )
            .unwrap();
        let session = open(&store);
        assert_eq!(session.shopping_items().len(), 1);
        assert_eq!(session.shopping_items()[0].description, "Tea");
        assert!(session.suggestions().is_empty());
    }

    #[test]
    fn test_switch_account() {
        let mut store = MemoryStore::default();
        let mut session = new_session(ALEX);
        paid(&mut session, dec!(90), ALEX);
        session.suggest("Candles", None, None).unwrap();

        session.switch_account(&mut store, SAM).unwrap();
        assert_eq!(session.current(), SAM);
        assert_eq!(session.expenses().len(), 1);
        assert!(session.suggestions().is_empty());
        assert_eq!(session.totals().you_owe, dec!(30));
        assert_eq!(session.summary(), "You owe Alex $30.00");
        assert!(session.switch_account(&mut store, AccountId(7)).is_err());
        assert_eq!(session.current(), SAM);

        session.switch_account(&mut store, ALEX).unwrap();
        assert_eq!(session.suggestions().len(), 1);
        assert_eq!(
            store.read(CURRENT_ACCOUNT_KEY).unwrap().as_deref(),
            Some("alex")
        );
    }

    #[test]
    fn test_buy_legacy_assigned_item() {
        let mut store = MemoryStore::default();
        store
            .write(
                "shoppingItems_alex",
                r#"[{"id": 3, "description": "Paint", "amount": 30,
                     "date": "2024-05-29T16:26:40Z", "assignedTo": "you"}]"#,
            )
            .unwrap();
        let mut session = open(&store);
        assert_eq!(
            session.shopping_items()[0].assigned_to,
            Some(Payer::LegacyYou)
        );
        let id = session.shopping_items()[0].id;
        let expense = session.mark_bought(id).unwrap().unwrap();
        assert_eq!(
            session.get_expense(expense).unwrap().paid_by,
            Payer::Account(ALEX)
        );
        assert_eq!(session.balances().get(SAM), dec!(10));

        // the buyer does not change with the viewer
        session.switch_account(&mut store, SAM).unwrap();
        assert_eq!(session.balances().get(ALEX), dec!(-10));
        session.save(&mut store).unwrap();
        let reopened = open(&store);
        assert_eq!(reopened.current(), SAM);
        assert_eq!(reopened.balances().get(ALEX), dec!(-10));
    }

    #[test]
    fn test_impact_line() {
        let mut session = new_session(ALEX);
        paid(&mut session, dec!(90), SAM);
        session
            .add_expense(ExpenseDetails {
                description: "Movie",
                amount: dec!(20),
                paid_by: SAM,
                split_with: SplitWith::With(JO),
            })
            .unwrap();
        let lines: Vec<_> = session
            .expenses()
            .iter()
            .map(|e| session.impact_line(e))
            .collect();
        assert_eq!(lines, vec!["not involved", "you owe $30.00"]);
    }

    #[test]
    fn test_end_to_end() {
        let mut store = MemoryStore::default();
        let mut session = new_session(ALEX);
        paid(&mut session, dec!(90), ALEX);
        let b = session.balances();
        assert_eq!(b.get(SAM), dec!(30));
        assert_eq!(b.get(JO), dec!(30));
        assert_eq!(session.summary(), "Sam owes you $30.00, Jo owes you $30.00");

        let r = session
            .submit_settlement(SettlementDetails {
                amount: dec!(30),
                payment_method: "Bank transfer",
                screenshot: Some(Screenshot::new(
                    vec![1, 2, 3],
                    "receipt.png",
                    "image/png",
                )),
                counterparty: Some(SAM),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(r.kind, SettlementKind::PaymentReceived);
        let b = session.balances();
        assert_eq!(b.get(SAM), dec!(0));
        assert_eq!(b.get(JO), dec!(30));

        // the shopping list feeds the balances too
        let s = session.suggest("Dish soap", Some(dec!(6)), None).unwrap();
        let item = session.accept_suggestion(s).unwrap();
        session.assign_item(item, Some(JO)).unwrap();
        assert_eq!(session.mark_all_bought(Decision::Confirm).len(), 1);
        assert_eq!(session.balances().get(JO), dec!(28));

        session.save(&mut store).unwrap();
        let reopened = open(&store);
        assert_eq!(reopened.balances(), session.balances());
        assert_eq!(reopened.settlements(), session.settlements());
    }
}
