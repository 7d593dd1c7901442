//! Page-level UI state and the info panel content.

pub mod overlay;

pub use overlay::{ClickTarget, Effect, Key, Overlays};

/// ABC/XYZ legend shown in the info panel.
pub const LEGEND: [(&str, &str); 6] = [
    ("A", "Top sellers: the first 80% of cumulative revenue"),
    ("B", "Middle tier: the next 15% of revenue"),
    ("C", "Long tail: the last 5% of revenue"),
    ("X", "Stable demand, coefficient of variation up to 15%"),
    ("Y", "Seasonal or trending demand, 15% to 25%"),
    ("Z", "Irregular demand, above 25%"),
];
