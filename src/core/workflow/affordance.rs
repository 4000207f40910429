/// Which workflow a button or modal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffordanceKind {
    Bounty,
    Dare,
    Capsule,
    Question,
    Poll,
    Shop,
    Watch,
}

impl AffordanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffordanceKind::Bounty => "bounty",
            AffordanceKind::Dare => "dare",
            AffordanceKind::Capsule => "capsule",
            AffordanceKind::Question => "question",
            AffordanceKind::Poll => "poll",
            AffordanceKind::Shop => "shop",
            AffordanceKind::Watch => "watch",
        }
    }

    pub fn from_kind(s: &str) -> Option<Self> {
        match s {
            "bounty" => Some(AffordanceKind::Bounty),
            "dare" => Some(AffordanceKind::Dare),
            "capsule" => Some(AffordanceKind::Capsule),
            "question" => Some(AffordanceKind::Question),
            "poll" => Some(AffordanceKind::Poll),
            "shop" => Some(AffordanceKind::Shop),
            "watch" => Some(AffordanceKind::Watch),
            _ => None,
        }
    }
}

/// A clickable action encoded in a component custom id as
/// `kind:action:entity`. The entity part may itself contain `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordance {
    pub kind: AffordanceKind,
    pub action: String,
    pub entity_id: String,
}

impl Affordance {
    pub fn new(kind: AffordanceKind, action: &str, entity_id: impl ToString) -> Self {
        Self {
            kind,
            action: action.to_string(),
            entity_id: entity_id.to_string(),
        }
    }

    pub fn custom_id(&self) -> String {
        format!("{}:{}:{}", self.kind.as_str(), self.action, self.entity_id)
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.splitn(3, ':');
        let kind = AffordanceKind::from_kind(parts.next()?)?;
        let action = parts.next().filter(|a| !a.is_empty())?;
        let entity_id = parts.next().filter(|e| !e.is_empty())?;
        Some(Self::new(kind, action, entity_id))
    }
}

/// Shorthand used by the renderers.
pub fn custom_id(kind: AffordanceKind, action: &str, entity_id: impl ToString) -> String {
    Affordance::new(kind, action, entity_id).custom_id()
}
