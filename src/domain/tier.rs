//! Membership tiers and the capabilities each one unlocks.
//!
//! Every tier-dependent decision in the crate goes through
//! [`capabilities_for`] or [`can_skip_password`].

use serde::{Deserialize, Serialize};

/// Ordered so that a higher tier compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Normal,
    Vip,
    SVip,
}

impl Tier {
    pub fn is_premium(self) -> bool {
        self >= Tier::Vip
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStyleAllowance {
    None,
    Color,
    Gradient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackQuality {
    #[serde(rename = "720p")]
    Sd,
    #[serde(rename = "1080p")]
    Hd,
    #[serde(rename = "4k")]
    Uhd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub can_download: bool,
    pub can_hd_playback: bool,
    pub can_uhd_playback: bool,
    pub can_change_speed: bool,
    pub ad_free: bool,
    pub can_pin_profile_video: bool,
    pub can_track_history: bool,
    pub can_pin_comments: bool,
    pub can_set_banner: bool,
    pub can_summarize: bool,
    pub can_detailed_summary: bool,
    pub can_tag_scenes: bool,
    pub comment_style: CommentStyleAllowance,
}

impl Capabilities {
    pub fn max_quality(&self) -> PlaybackQuality {
        if self.can_uhd_playback {
            PlaybackQuality::Uhd
        } else if self.can_hd_playback {
            PlaybackQuality::Hd
        } else {
            PlaybackQuality::Sd
        }
    }
}

pub fn capabilities_for(tier: Tier) -> Capabilities {
    let premium = tier.is_premium();
    let top = tier == Tier::SVip;
    Capabilities {
        can_download: premium,
        can_hd_playback: premium,
        can_uhd_playback: top,
        can_change_speed: premium,
        ad_free: premium,
        can_pin_profile_video: premium,
        can_track_history: premium,
        can_pin_comments: top,
        can_set_banner: premium,
        can_summarize: premium,
        can_detailed_summary: top,
        can_tag_scenes: top,
        comment_style: match tier {
            Tier::Normal => CommentStyleAllowance::None,
            Tier::Vip => CommentStyleAllowance::Color,
            Tier::SVip => CommentStyleAllowance::Gradient,
        },
    }
}

/// Capabilities of an anonymous visitor.
pub fn guest_capabilities() -> Capabilities {
    capabilities_for(Tier::Normal)
}

/// Whether a viewer of `viewer` tier plays a `video` tier item without the
/// password challenge. Anonymous viewers only bypass `Normal` content.
pub fn can_skip_password(viewer: Option<Tier>, video: Tier) -> bool {
    match viewer {
        Some(viewer) => viewer >= video,
        None => video == Tier::Normal,
    }
}
