use crate::errors::KittyError;
use crate::formatters::Formatter;
use crate::settings::Settings;
use crate::settlements::Screenshot;
use anyhow::Result;
use itertools::Itertools;
use log::{debug, warn};
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::future::Future;
use std::str::FromStr;

/// Turns an image into text.  Text recognition is not done by this crate,
/// applications plug in whatever engine they have.
pub trait Recognizer {
    fn recognize(
        &self,
        image: &Screenshot,
    ) -> impl Future<Output = Result<String>>;
}

//--------------------------------------------------------------
// Amount extraction
//--------------------------------------------------------------

// A number, optionally with thousands separators, and at most two decimals
const NUMBER: &str = r"\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?";

/// Finds the monetary amounts mentioned in a piece of text
pub struct AmountExtractor {
    // Tested in order, each has the amount as its first group
    rules: Vec<Regex>,
    max_plausible_amount: Decimal,
}

impl AmountExtractor {
    pub fn new(settings: &Settings) -> Result<Self, KittyError> {
        let rules = [
            // $123.45, € 12, £1,200.00
            format!(r"[$€£¥]\s?({NUMBER})"),
            // Total: 123.45, amount sent 12.00
            format!(r"(?i)\b(?:amount|total|paid|sent)\b[^\d\n]{{0,20}}?({NUMBER})"),
            // any bare decimal number like 123.45
            r"(?:^|[^\d.,])(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})\b".into(),
        ];
        Ok(AmountExtractor {
            rules: rules
                .iter()
                .map(|r| Regex::new(r))
                .collect::<Result<_, _>>()?,
            max_plausible_amount: settings.max_plausible_amount,
        })
    }

    /// All distinct plausible amounts found in the text, sorted
    pub fn extract(&self, text: &str) -> Vec<Decimal> {
        let mut found = BTreeSet::new();
        for rule in &self.rules {
            for cap in rule.captures_iter(text) {
                let Some(m) = cap.get(1) else {
                    continue;
                };
                if is_cut_short(text, m.end()) {
                    debug!("ignored {:?}, followed by more digits", m.as_str());
                    continue;
                }
                match Decimal::from_str(&m.as_str().replace(',', "")) {
                    Ok(v) => {
                        if v > Decimal::ZERO && v < self.max_plausible_amount
                        {
                            found.insert(v.normalize());
                        }
                    }
                    Err(e) => debug!("ignored {:?}: {e}", m.as_str()),
                }
            }
        }
        found.into_iter().collect()
    }
}

/// Whether a match stopped in the middle of a longer number, as with
/// "123.456" read as "123.45"
fn is_cut_short(text: &str, end: usize) -> bool {
    let mut rest = text.get(end..).unwrap_or_default().chars();
    match rest.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.' | ',') => rest.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) | None => false,
    }
}

//--------------------------------------------------------------
// Classification
//--------------------------------------------------------------

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MatchKind {
    // An amount on the receipt is the claimed amount
    Exact,

    // The nearest amount is off by a small difference
    Close,

    // Amounts were found, none near the claimed amount
    Mismatch,

    // No amount could be found on the receipt
    NoneDetected,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Severity {
    Success,
    Warning,
    Error,
}

/// The result of comparing a claimed amount with a receipt
#[derive(Debug, Clone, PartialEq)]
pub struct AmountCheck {
    pub claimed: Decimal,
    pub detected: Vec<Decimal>,

    // The detected amount nearest to the claimed one
    pub closest: Option<Decimal>,

    pub kind: MatchKind,
}

pub fn classify(
    claimed: Decimal,
    detected: Vec<Decimal>,
    settings: &Settings,
) -> AmountCheck {
    let closest = detected
        .iter()
        .copied()
        .min_by_key(|d| (*d - claimed).abs());
    let kind = match closest.map(|c| (c - claimed).abs()) {
        None => MatchKind::NoneDetected,
        Some(diff) if diff <= settings.tolerance => MatchKind::Exact,
        Some(diff) if diff <= settings.close_tolerance => MatchKind::Close,
        Some(_) => MatchKind::Mismatch,
    };
    AmountCheck {
        claimed,
        detected,
        closest,
        kind,
    }
}

/// What is shown next to the submit button.  This is advisory only, a
/// settlement can always be submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationStatus {
    Checked(AmountCheck),
    RecognitionFailed(String),
}

impl VerificationStatus {
    pub fn severity(&self) -> Severity {
        match self {
            VerificationStatus::RecognitionFailed(_) => Severity::Warning,
            VerificationStatus::Checked(check) => match check.kind {
                MatchKind::Exact => Severity::Success,
                MatchKind::Close | MatchKind::NoneDetected => {
                    Severity::Warning
                }
                MatchKind::Mismatch => Severity::Error,
            },
        }
    }

    pub fn message(&self, format: &Formatter) -> String {
        match self {
            VerificationStatus::RecognitionFailed(err) => {
                format!("Could not read the receipt ({err}), please check the amount manually")
            }
            VerificationStatus::Checked(check) => {
                let claimed = format.display(check.claimed);
                match (check.kind, check.closest) {
                    (MatchKind::Exact, _) => {
                        format!("Verified: {claimed} found on the receipt")
                    }
                    (MatchKind::Close, Some(c)) => format!(
                        "Close match: the receipt shows {}, you entered {claimed}",
                        format.display(c),
                    ),
                    (MatchKind::Mismatch, _) => format!(
                        "Amount mismatch: the receipt shows {}, you entered {claimed}",
                        check
                            .detected
                            .iter()
                            .map(|d| format.display(*d))
                            .join(", "),
                    ),
                    (MatchKind::Close, None) | (MatchKind::NoneDetected, _) => {
                        "No amount found on the receipt, please check it manually"
                            .into()
                    }
                }
            }
        }
    }
}

//--------------------------------------------------------------
// Receipt check
//--------------------------------------------------------------

/// Identifies one recognition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    claimed: Decimal,
}

/// Tracks the verification of one settlement form.
///
/// Text recognition is slow, and the user may change the amount or pick
/// another screenshot while it runs.  Every request gets a ticket, and any
/// newer request (or an explicit invalidation) makes older tickets stale.
/// Results for stale tickets are dropped.
pub struct ReceiptCheck {
    extractor: AmountExtractor,
    settings: Settings,
    generation: u64,
    pending: bool,
    status: Option<VerificationStatus>,
}

impl ReceiptCheck {
    pub fn new(settings: &Settings) -> Result<Self, KittyError> {
        Ok(ReceiptCheck {
            extractor: AmountExtractor::new(settings)?,
            settings: settings.clone(),
            generation: 0,
            pending: false,
            status: None,
        })
    }

    /// Start a new recognition for the claimed amount
    pub fn begin(&mut self, claimed: Decimal) -> Ticket {
        self.invalidate();
        self.pending = true;
        Ticket {
            generation: self.generation,
            claimed,
        }
    }

    /// Forget any result, and ignore requests still running.  To be called
    /// when the claimed amount changes or the screenshot is replaced.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = false;
        self.status = None;
    }

    /// Record the result of a recognition.  Returns None if the ticket is
    /// stale, in which case nothing changes.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        recognized: Result<String>,
    ) -> Option<&VerificationStatus> {
        if ticket.generation != self.generation {
            debug!("dropped stale recognition result");
            return None;
        }
        let status = match recognized {
            Ok(text) => VerificationStatus::Checked(self.check_text(
                ticket.claimed,
                &text,
            )),
            Err(e) => {
                warn!("text recognition failed: {e:#}");
                VerificationStatus::RecognitionFailed(e.to_string())
            }
        };
        self.pending = false;
        self.status = Some(status);
        self.status.as_ref()
    }

    /// Run the recognizer and record its result.  The check cannot be
    /// invalidated while this runs, callers that need that should use
    /// `begin` and `complete` around their own call to the recognizer.
    pub async fn verify(
        &mut self,
        recognizer: &impl Recognizer,
        screenshot: &Screenshot,
        claimed: Decimal,
    ) -> Option<&VerificationStatus> {
        let ticket = self.begin(claimed);
        let recognized = recognizer.recognize(screenshot).await;
        self.complete(ticket, recognized)
    }

    /// Compare the claimed amount with the amounts found in text
    pub fn check_text(&self, claimed: Decimal, text: &str) -> AmountCheck {
        classify(claimed, self.extractor.extract(text), &self.settings)
    }

    pub fn status(&self) -> Option<&VerificationStatus> {
        self.status.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
