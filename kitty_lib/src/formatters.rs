use chrono::{DateTime, Days, Local, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

/// How to display negative values
#[derive(Clone, Copy, Default)]
pub enum Negative {
    #[default]
    MinusSign, // -$123.00
    Parenthesis, // ($123.00)
}

/// How to display large numbers
#[derive(Clone, Copy)]
pub enum Separators {
    None,              // no special formatting    1234456.78
    Every3Digit(char), // char every 3 digits      1,234,456.78
}
impl Default for Separators {
    fn default() -> Self {
        Separators::Every3Digit(',')
    }
}

pub struct Formatter {
    pub symbol: String,
    pub negative: Negative,
    pub separators: Separators,
    pub comma: char,
    pub precision: u8,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            symbol: "$".into(),
            negative: Negative::default(),
            separators: Separators::default(),
            comma: '.',
            precision: 2,
        }
    }
}

impl Formatter {
    pub fn with_symbol(symbol: &str) -> Self {
        Formatter {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Display the absolute value of value
    fn push_abs_num(&self, into: &mut String, value: Decimal) {
        let rounded = value.abs().round_dp_with_strategy(
            u32::from(self.precision),
            RoundingStrategy::MidpointAwayFromZero,
        );
        let val: Vec<char> = rounded.to_string().chars().collect();
        let decimal = val.iter().position(|&r| r == '.').unwrap_or(val.len());

        for (idx, p) in val.iter().take(decimal).enumerate() {
            if let Separators::Every3Digit(sep) = self.separators {
                if idx > 0 && (decimal - idx) % 3 == 0 {
                    into.push(sep);
                }
            }
            into.push(*p);
        }

        if self.precision > 0 {
            into.push(self.comma);
            let mut count = 0_u8;
            for p in val.iter().skip(decimal + 1) {
                into.push(*p);
                count += 1;
            }
            for _ in count..self.precision {
                into.push('0');
            }
        }
    }

    pub fn push(&self, into: &mut String, value: Decimal) {
        let negative = value.is_sign_negative()
            && !value
                .round_dp_with_strategy(
                    u32::from(self.precision),
                    RoundingStrategy::MidpointAwayFromZero,
                )
                .is_zero();
        match (negative, self.negative) {
            (false, _) => {
                into.push_str(&self.symbol);
                self.push_abs_num(into, value);
            }
            (true, Negative::MinusSign) => {
                into.push('-');
                into.push_str(&self.symbol);
                self.push_abs_num(into, value);
            }
            (true, Negative::Parenthesis) => {
                into.push('(');
                into.push_str(&self.symbol);
                self.push_abs_num(into, value);
                into.push(')');
            }
        }
    }

    pub fn display(&self, value: Decimal) -> String {
        let mut buffer = String::new();
        self.push(&mut buffer, value);
        buffer
    }
}

/// Show a date relative to today: "Today", "Yesterday", or the short month
/// and day ("Mar 5") for anything older or in the future.
pub fn relative_date(date: &DateTime<Local>, today: NaiveDate) -> String {
    let day = date.date_naive();
    if day == today {
        "Today".into()
    } else if today.checked_sub_days(Days::new(1)) == Some(day) {
        "Yesterday".into()
    } else {
        day.format("%b %-d").to_string()
    }
}
