use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::app::{ServiceError, ServiceResult};
use crate::domain::tier::Tier;
use crate::domain::user::{CommentStyle, Role, User, UserId};
use crate::infra::store::StoreHandle;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    store: StoreHandle,
}

impl AuthService {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Create the admin account. Called once at startup from configuration.
    pub fn seed_admin(&self, username: &str, password: &str) -> UserId {
        let digest = hash_password(password);
        self.store.write(|store| {
            let id = store.next_id();
            let mut admin = User::new(id, username.to_string(), digest);
            admin.display_name = "Admin".to_string();
            admin.avatar_url = "https://api.dicebear.com/8.x/initials/svg?seed=Admin".to_string();
            admin.role = Role::Admin;
            admin.tier = Tier::SVip;
            admin.is_verified = true;
            store.insert_user(admin);
            id
        })
    }

    pub fn seed_demo_users(&self) {
        let digest = hash_password("password");
        self.store.write(|store| {
            let demo = [
                ("vipuser", "VIP Member", Tier::Vip, CommentStyle::Color {
                    color: "#38bdf8".to_string(),
                }),
                ("svipuser", "Super VIP", Tier::SVip, CommentStyle::Gradient {
                    from: "#ec4899".to_string(),
                    to: "#f9a8d4".to_string(),
                }),
            ];
            for (username, display_name, tier, style) in demo {
                let id = store.next_id();
                let mut user = User::new(id, username.to_string(), digest.clone());
                user.display_name = display_name.to_string();
                user.tier = tier;
                user.is_verified = true;
                user.comment_style = Some(style);
                store.insert_user(user);
            }
        });
        tracing::info!("seeded demo users");
    }

    /// Register a member and sign them in.
    pub fn register(&self, username: &str, password: &str) -> ServiceResult<SignedIn> {
        let username = username.trim();
        let length = username.chars().count();
        if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&length) {
            return Err(ServiceError::validation(format!(
                "username must be between {} and {} characters",
                MIN_USERNAME_LEN, MAX_USERNAME_LEN
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let digest = hash_password(password);
        let token = generate_token();
        self.store.write(|store| {
            // the configured admin is a seeded user, so its name is taken here too
            if store.user_by_username(username).is_some() {
                return Err(ServiceError::Conflict(
                    "username is taken or not allowed".to_string(),
                ));
            }
            let id = store.next_id();
            let user = User::new(id, username.to_string(), digest);
            store.insert_user(user.clone());
            store.create_session(token.clone(), id);
            tracing::info!(user_id = id, "user registered");
            Ok(SignedIn { token, user })
        })
    }

    pub fn login(&self, username: &str, password: &str) -> ServiceResult<SignedIn> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ServiceError::validation("username and password are required"));
        }

        let digest = hash_password(password);
        let token = generate_token();
        self.store.write(|store| {
            let user = store
                .user_by_username(username.trim())
                .ok_or(ServiceError::InvalidCredentials)?;
            if user.is_banned {
                return Err(ServiceError::Banned);
            }
            if !bool::from(user.password_digest.as_bytes().ct_eq(digest.as_bytes())) {
                return Err(ServiceError::InvalidCredentials);
            }

            let user = user.clone();
            store.create_session(token.clone(), user.id);
            tracing::info!(user_id = user.id, "user signed in");
            Ok(SignedIn { token, user })
        })
    }

    pub fn logout(&self, token: &str) -> bool {
        self.store.write(|store| store.drop_session(token))
    }

    /// Resolve a bearer token. Banned accounts never resolve.
    pub fn authenticate(&self, token: &str) -> Option<AuthSession> {
        self.store.read(|store| {
            let user_id = store.session_user(token)?;
            let user = store.user(user_id)?;
            if user.is_banned {
                return None;
            }
            Some(AuthSession {
                user_id,
                role: user.role,
            })
        })
    }

    pub fn current_user(&self, user_id: UserId) -> Option<User> {
        self.store.read(|store| store.user(user_id).cloned())
    }
}

/// Placeholder digest: unsalted SHA-256, hex encoded.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Opaque random token, hex encoded.
pub(crate) fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
