/// A rough classification of expenses, guessed from their description.
/// Only used for presentation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Category {
    Food,
    Groceries,
    Fuel,
    Housing,
    Utilities,
    Internet,
    Entertainment,
    Transport,
    Other,
}

// Keywords are tested in order, the first category that matches wins.
const KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Food, &["food", "restaurant", "dinner", "lunch"]),
    (Category::Groceries, &["grocery", "market"]),
    (Category::Fuel, &["gas", "fuel"]),
    (Category::Housing, &["rent", "apartment"]),
    (Category::Utilities, &["utility", "electric", "water"]),
    (Category::Internet, &["internet", "wifi"]),
    (Category::Entertainment, &["movie", "entertainment"]),
    (Category::Transport, &["uber", "taxi", "transport"]),
];

impl Category {
    pub fn from_description(description: &str) -> Self {
        let desc = description.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| desc.contains(w)))
            .map(|(cat, _)| *cat)
            .unwrap_or(Category::Other)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Food => "🍽️",
            Category::Groceries => "🛒",
            Category::Fuel => "⛽",
            Category::Housing => "🏠",
            Category::Utilities => "💡",
            Category::Internet => "📶",
            Category::Entertainment => "🎬",
            Category::Transport => "🚗",
            Category::Other => "💳",
        }
    }
}
