use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::Reaction;
use crate::domain::media::{PlaybackTicket, UploadDraft, PLAYBACK_TICKET_TTL};
use crate::domain::user::{User, UserId};
use crate::domain::video::{Video, VideoId, VideoPatch, VideoStatus};
use crate::infra::blobs::BlobRegistry;

/// The authoritative in-memory state. A video id lives in at most one of the
/// approved and pending collections; both are kept newest first.
#[derive(Debug, Default)]
pub struct Store {
    users: BTreeMap<UserId, User>,
    approved: Vec<Video>,
    pending: Vec<Video>,
    reactions: HashMap<(UserId, VideoId), Reaction>,
    sessions: HashMap<String, UserId>,
    drafts: HashMap<Uuid, UploadDraft>,
    tickets: HashMap<String, PlaybackTicket>,
    blobs: BlobRegistry,
    announcement: String,
    next_id: u64,
}

impl Store {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Ids are shared by users, videos and comments and never reused.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    // ---- users -------------------------------------------------------------

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    // ---- sessions ----------------------------------------------------------

    pub fn create_session(&mut self, token: String, user_id: UserId) {
        self.sessions.insert(token, user_id);
    }

    pub fn session_user(&self, token: &str) -> Option<UserId> {
        self.sessions.get(token).copied()
    }

    pub fn drop_session(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn drop_sessions_for(&mut self, user_id: UserId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, owner| *owner != user_id);
        before - self.sessions.len()
    }

    // ---- videos ------------------------------------------------------------

    pub fn approved(&self) -> &[Video] {
        &self.approved
    }

    pub fn pending(&self) -> &[Video] {
        &self.pending
    }

    pub fn locate(&self, id: VideoId) -> Option<VideoStatus> {
        if self.approved.iter().any(|video| video.id == id) {
            Some(VideoStatus::Approved)
        } else if self.pending.iter().any(|video| video.id == id) {
            Some(VideoStatus::Pending)
        } else {
            None
        }
    }

    pub fn contains_video(&self, id: VideoId) -> bool {
        self.locate(id).is_some()
    }

    pub fn video(&self, id: VideoId) -> Option<&Video> {
        self.approved
            .iter()
            .chain(self.pending.iter())
            .find(|video| video.id == id)
    }

    pub fn video_mut(&mut self, id: VideoId) -> Option<&mut Video> {
        self.approved
            .iter_mut()
            .chain(self.pending.iter_mut())
            .find(|video| video.id == id)
    }

    /// The record holding `handle` as its media or thumbnail.
    pub fn video_owning(&self, handle: &str) -> Option<&Video> {
        self.approved
            .iter()
            .chain(self.pending.iter())
            .find(|video| {
                video.media.url() == handle || video.thumbnail_url.as_deref() == Some(handle)
            })
    }

    /// Insert or replace a record in the collection matching its status,
    /// dropping any copy held by the other collection.
    pub fn upsert_video(&mut self, video: Video) {
        let existing = self.take_video(video.id);
        let target = match video.status {
            VideoStatus::Approved => &mut self.approved,
            VideoStatus::Pending => &mut self.pending,
        };
        match existing {
            Some((status, index)) if status == video.status => target.insert(index, video),
            _ => target.insert(0, video),
        }
    }

    /// Remove a record from whichever collection holds it without touching
    /// its media handles.
    pub fn remove_video(&mut self, id: VideoId) -> Option<Video> {
        if let Some(index) = self.approved.iter().position(|video| video.id == id) {
            return Some(self.approved.remove(index));
        }
        if let Some(index) = self.pending.iter().position(|video| video.id == id) {
            return Some(self.pending.remove(index));
        }
        None
    }

    pub fn move_to_approved(&mut self, id: VideoId) -> Option<&Video> {
        self.move_to(id, VideoStatus::Approved)
    }

    pub fn move_to_pending(&mut self, id: VideoId) -> Option<&Video> {
        self.move_to(id, VideoStatus::Pending)
    }

    fn move_to(&mut self, id: VideoId, status: VideoStatus) -> Option<&Video> {
        let mut video = self.remove_video(id)?;
        video.status = status;
        let target = match status {
            VideoStatus::Approved => &mut self.approved,
            VideoStatus::Pending => &mut self.pending,
        };
        target.insert(0, video);
        target.first()
    }

    /// Merge `patch` into the record wherever it lives. Returns `false` when
    /// the record no longer exists.
    pub fn update_video_fields(&mut self, id: VideoId, patch: &VideoPatch) -> bool {
        match self.video_mut(id) {
            Some(video) => {
                video.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Remove a record, release the blob handles it owns and forget every
    /// reaction, like and pin that pointed at it.
    pub fn delete_video(&mut self, id: VideoId) -> Option<Video> {
        let video = self.remove_video(id)?;
        for handle in video.owned_blobs() {
            self.blobs.release(&handle);
        }
        self.reactions.retain(|(_, video_id), _| *video_id != id);
        for user in self.users.values_mut() {
            user.liked_video_ids.remove(&id);
            if user.pinned_video_id == Some(id) {
                user.pinned_video_id = None;
            }
        }
        Some(video)
    }

    fn take_video(&mut self, id: VideoId) -> Option<(VideoStatus, usize)> {
        if let Some(index) = self.approved.iter().position(|video| video.id == id) {
            self.approved.remove(index);
            return Some((VideoStatus::Approved, index));
        }
        if let Some(index) = self.pending.iter().position(|video| video.id == id) {
            self.pending.remove(index);
            return Some((VideoStatus::Pending, index));
        }
        None
    }

    // ---- reactions ---------------------------------------------------------

    pub fn reaction(&self, user_id: UserId, video_id: VideoId) -> Option<Reaction> {
        self.reactions.get(&(user_id, video_id)).copied()
    }

    pub fn set_reaction(&mut self, user_id: UserId, video_id: VideoId, reaction: Option<Reaction>) {
        match reaction {
            Some(reaction) => {
                self.reactions.insert((user_id, video_id), reaction);
            }
            None => {
                self.reactions.remove(&(user_id, video_id));
            }
        }
    }

    // ---- drafts ------------------------------------------------------------

    pub fn insert_draft(&mut self, draft: UploadDraft) {
        self.drafts.insert(draft.id, draft);
    }

    pub fn draft(&self, id: Uuid) -> Option<&UploadDraft> {
        self.drafts.get(&id)
    }

    pub fn draft_mut(&mut self, id: Uuid) -> Option<&mut UploadDraft> {
        self.drafts.get_mut(&id)
    }

    pub fn take_draft(&mut self, id: Uuid) -> Option<UploadDraft> {
        self.drafts.remove(&id)
    }

    pub fn draft_owning(&self, handle: &str) -> Option<&UploadDraft> {
        self.drafts.values().find(|draft| draft.owns(handle))
    }

    // ---- playback tickets --------------------------------------------------

    /// Register `token` as a ticket for `handle`, dropping expired ones.
    pub fn issue_ticket(&mut self, token: String, handle: String, now: OffsetDateTime) {
        self.tickets.retain(|_, ticket| ticket.expires_at > now);
        self.tickets.insert(
            token,
            PlaybackTicket {
                handle,
                expires_at: now + PLAYBACK_TICKET_TTL,
            },
        );
    }

    pub fn ticket_handle(&self, token: &str, now: OffsetDateTime) -> Option<&str> {
        self.tickets
            .get(token)
            .filter(|ticket| ticket.expires_at > now)
            .map(|ticket| ticket.handle.as_str())
    }

    // ---- blobs -------------------------------------------------------------

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    pub fn blobs_mut(&mut self) -> &mut BlobRegistry {
        &mut self.blobs
    }

    /// Teardown: drop open drafts and release every outstanding handle.
    pub fn release_all(&mut self) -> usize {
        self.drafts.clear();
        self.tickets.clear();
        self.blobs.release_all()
    }

    // ---- site --------------------------------------------------------------

    pub fn announcement(&self) -> &str {
        &self.announcement
    }

    pub fn set_announcement(&mut self, announcement: String) {
        self.announcement = announcement;
    }
}

/// Shared handle to the single store. Every access is a synchronous closure
/// so the lock is never held across an await point.
#[derive(Clone, Default)]
pub struct StoreHandle {
    inner: Arc<Mutex<Store>>,
}

impl StoreHandle {
    pub fn new(store: Store) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        let guard = self.lock();
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Store) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
