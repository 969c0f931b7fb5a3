/// A person registered to receive alerts. The email address is the natural
/// key used at every external boundary; the numeric row id never leaves the
/// store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub name: String,
    pub email: String,
}

/// Result of reducing one item's page to text: the raw markup (cached in the
/// store) and the plain text the match engine searches.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub markup: Option<String>,
    pub text: String,
}

/// Counts from one refresh cycle, for CLI display.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshReport {
    /// Items recorded this cycle.
    pub new_items: usize,
    /// Notifications successfully handed to the notifier.
    pub alerts_sent: usize,
    /// Items skipped (extraction failure or lost insert race).
    pub skipped: usize,
}
