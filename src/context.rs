use serde::{Deserialize, Serialize};
use std::fmt;

/// Page classification used to pick suggested prompts and to tell the
/// assistant what the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Participants,
    Teams,
    Hackathons,
    Registration,
    Dashboard,
}

impl Category {
    /// Classify a page path. First match wins, in the order
    /// participants, teams, hackathons, registration; anything else is the dashboard.
    pub fn classify(path: &str) -> Self {
        if path.contains("participants") {
            Category::Participants
        } else if path.contains("teams") {
            Category::Teams
        } else if path.contains("hackathons") {
            Category::Hackathons
        } else if path.contains("register") {
            Category::Registration
        } else {
            Category::Dashboard
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Participants => "participants",
            Category::Teams => "teams",
            Category::Hackathons => "hackathons",
            Category::Registration => "registration",
            Category::Dashboard => "dashboard",
        }
    }

    pub fn suggested_prompts(&self) -> &'static [&'static str; 5] {
        match self {
            Category::Dashboard => &DASHBOARD_PROMPTS,
            Category::Participants => &PARTICIPANT_PROMPTS,
            Category::Teams => &TEAM_PROMPTS,
            Category::Hackathons => &HACKATHON_PROMPTS,
            Category::Registration => &REGISTRATION_PROMPTS,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DASHBOARD_PROMPTS: [&str; 5] = [
    "What is a hackathon and how do they work?",
    "How do I form effective hackathon teams?",
    "Give me project ideas for my team",
    "What should I bring to a hackathon?",
    "How can I win a hackathon?",
];

const PARTICIPANT_PROMPTS: [&str; 5] = [
    "How do I find the right teammates?",
    "What skills should I look for in team members?",
    "How do I present my skills effectively?",
    "What if I have no experience?",
    "How to network at hackathons?",
];

const TEAM_PROMPTS: [&str; 5] = [
    "How do we decide on a project quickly?",
    "What's the best way to manage our time?",
    "How do we divide the work effectively?",
    "Technical tips for rapid development?",
    "How to prepare a winning demo?",
];

const HACKATHON_PROMPTS: [&str; 5] = [
    "How do I choose the right hackathon?",
    "What should I know before attending?",
    "How do I prepare for my first hackathon?",
    "What are common hackathon pitfalls?",
    "How to stay motivated during long hours?",
];

const REGISTRATION_PROMPTS: [&str; 5] = [
    "What experience level should I select?",
    "How do I describe my skills effectively?",
    "What makes a good team member?",
    "What role should I choose?",
    "How to prepare for team formation?",
];

/// Suggested prompts for a raw category name. Unknown names get the dashboard set.
pub fn prompts_for(category: &str) -> &'static [&'static str; 5] {
    let category = match category {
        "participants" => Category::Participants,
        "teams" => Category::Teams,
        "hackathons" => Category::Hackathons,
        "registration" => Category::Registration,
        _ => Category::Dashboard,
    };
    category.suggested_prompts()
}

/// What the view currently shows: the page path plus whatever element counts
/// it could observe. Counts are best effort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageView {
    pub path: String,
    pub url: Option<String>,
    pub participant_cards: Option<usize>,
    pub team_cards: Option<usize>,
    pub hackathon_cards: Option<usize>,
}

impl PageView {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Record the number of visible cards for whatever this page lists.
    pub fn with_visible_count(mut self, count: usize) -> Self {
        match Category::classify(&self.path) {
            Category::Participants => self.participant_cards = Some(count),
            Category::Teams => self.team_cards = Some(count),
            Category::Hackathons => self.hackathon_cards = Some(count),
            Category::Registration | Category::Dashboard => {}
        }
        self
    }
}

/// Context record sent alongside each chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    pub page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hackathon_count: Option<usize>,
}

impl ChatContext {
    pub fn suggested_prompts(&self) -> &'static [&'static str; 5] {
        self.category.suggested_prompts()
    }
}

/// Classify the page and attach only the count that belongs to its category.
pub fn derive_context(page: &PageView) -> ChatContext {
    let category = Category::classify(&page.path);
    let mut ctx = ChatContext {
        page: page.path.clone(),
        url: page.url.clone(),
        category,
        participant_count: None,
        team_count: None,
        hackathon_count: None,
    };

    match category {
        Category::Participants => ctx.participant_count = page.participant_cards,
        Category::Teams => ctx.team_count = page.team_cards,
        Category::Hackathons => ctx.hackathon_count = page.hackathon_cards,
        Category::Registration | Category::Dashboard => {}
    }

    ctx
}
