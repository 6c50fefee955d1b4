use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Liked,
    Disliked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionRequest {
    Like,
    Dislike,
}

impl ReactionRequest {
    pub fn target(self) -> Reaction {
        match self {
            Self::Like => Reaction::Liked,
            Self::Dislike => Reaction::Disliked,
        }
    }
}

/// Result of applying a request to the reaction currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionTransition {
    pub next: Option<Reaction>,
    pub likes_delta: i64,
    pub dislikes_delta: i64,
}

/// Requesting the held reaction clears it; requesting the other one swaps.
pub fn transition(current: Option<Reaction>, request: ReactionRequest) -> ReactionTransition {
    let desired = request.target();
    let mut likes_delta = 0;
    let mut dislikes_delta = 0;

    let next = if current == Some(desired) {
        match desired {
            Reaction::Liked => likes_delta = -1,
            Reaction::Disliked => dislikes_delta = -1,
        }
        None
    } else {
        match current {
            Some(Reaction::Liked) => likes_delta = -1,
            Some(Reaction::Disliked) => dislikes_delta = -1,
            None => {}
        }
        match desired {
            Reaction::Liked => likes_delta += 1,
            Reaction::Disliked => dislikes_delta += 1,
        }
        Some(desired)
    };

    ReactionTransition {
        next,
        likes_delta,
        dislikes_delta,
    }
}

/// Counters floor at zero so drift never produces a negative count.
pub fn apply_delta(counter: u64, delta: i64) -> u64 {
    if delta >= 0 {
        counter.saturating_add(delta as u64)
    } else {
        counter.saturating_sub(delta.unsigned_abs())
    }
}
