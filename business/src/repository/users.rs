use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::{Deferred, Error, Latency, Result, UserDetails};

/// Asynchronous user table.
///
/// Every operation resolves once, after the store's latency, whether it
/// succeeds or fails. Reads hand out copies; the password is write-only.
pub trait UserStore: Send + Sync {
    /// All users in insertion order.
    fn list(&self) -> Deferred<Vec<UserDetails>>;

    fn get(&self, id: &str) -> Deferred<UserDetails>;

    /// Stores a new user and resolves to its generated id.
    ///
    /// The record must come without an id.
    fn insert(&self, user: UserDetails) -> Deferred<String>;

    /// Replaces nickname, email and description of an existing user.
    fn update(&self, user: UserDetails) -> Deferred<()>;

    fn update_password(&self, id: &str, password: &str) -> Deferred<()>;

    fn delete(&self, id: &str) -> Deferred<()>;
}

#[derive(Debug, Clone)]
struct StoredUser {
    details: UserDetails,
    password: Option<String>,
}

/// In-memory [`UserStore`]. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<Vec<StoredUser>>>,
    latency: Latency,
    io: Option<Handle>,
}

impl MemoryUserStore {
    pub fn new(latency: Latency) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Store pre-populated with the three demo users.
    pub fn seeded(latency: Latency) -> Self {
        Self::new(latency).with_users(demo_users())
    }

    /// Adds records as-is, keeping their ids.
    pub fn with_users(self, users: impl IntoIterator<Item = UserDetails>) -> Self {
        self.table().extend(users.into_iter().map(|details| StoredUser {
            details,
            password: None,
        }));
        self
    }

    /// Runs every operation on `io` instead of the awaiting runtime.
    pub fn with_io(mut self, io: Handle) -> Self {
        self.io = Some(io);
        self
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Test hook: the stored password of `id`.
    pub fn password_of(&self, id: &str) -> Option<String> {
        self.table()
            .iter()
            .find(|user| user.details.id == id)
            .and_then(|user| user.password.clone())
    }

    fn table(&self) -> MutexGuard<'_, Vec<StoredUser>> {
        lock(&self.users)
    }

    fn run<T, F>(&self, op: &'static str, f: F) -> Deferred<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Vec<StoredUser>) -> Result<T> + Send + 'static,
    {
        let users = Arc::clone(&self.users);
        let work = self.latency.defer(async move {
            let result = f(&mut *lock(&users));
            if let Err(e) = &result {
                debug!("UserStore::{op} failed: {e}");
            }
            result
        });

        match &self.io {
            Some(io) => work.subscribe_on(io),
            None => work,
        }
    }
}

impl UserStore for MemoryUserStore {
    fn list(&self) -> Deferred<Vec<UserDetails>> {
        self.run("list", |users| {
            Ok(users.iter().map(|user| user.details.clone()).collect())
        })
    }

    fn get(&self, id: &str) -> Deferred<UserDetails> {
        let id = id.to_owned();
        self.run("get", move |users| {
            find(users, &id).map(|user| user.details.clone())
        })
    }

    fn insert(&self, mut user: UserDetails) -> Deferred<String> {
        self.run("insert", move |users| {
            if !user.id.is_empty() {
                return Err(Error::invalid_argument(format!(
                    "User {} already has an id",
                    user.id
                )));
            }

            user.id = Uuid::new_v4().to_string();
            let id = user.id.clone();
            users.push(StoredUser {
                details: user,
                password: None,
            });
            info!("Inserted user {id}");
            Ok(id)
        })
    }

    fn update(&self, user: UserDetails) -> Deferred<()> {
        self.run("update", move |users| {
            if user.id.is_empty() {
                return Err(Error::invalid_argument("Cannot update a user without id"));
            }

            let stored = find(users, &user.id)?;
            debug!("Updating user {}", user.id);
            stored.details = user;
            Ok(())
        })
    }

    fn update_password(&self, id: &str, password: &str) -> Deferred<()> {
        let id = id.to_owned();
        let password = password.to_owned();
        self.run("update_password", move |users| {
            find(users, &id)?.password = Some(password);
            debug!("Password of user {id} replaced");
            Ok(())
        })
    }

    fn delete(&self, id: &str) -> Deferred<()> {
        let id = id.to_owned();
        self.run("delete", move |users| {
            let position = users
                .iter()
                .position(|user| user.details.id == id)
                .ok_or_else(|| Error::not_found(format!("User {id}")))?;
            users.remove(position);
            info!("Deleted user {id}");
            Ok(())
        })
    }
}

fn lock(users: &Mutex<Vec<StoredUser>>) -> MutexGuard<'_, Vec<StoredUser>> {
    users.lock().unwrap_or_else(PoisonError::into_inner)
}

fn find<'a>(users: &'a mut [StoredUser], id: &str) -> Result<&'a mut StoredUser> {
    users
        .iter_mut()
        .find(|user| user.details.id == id)
        .ok_or_else(|| Error::not_found(format!("User {id}")))
}

pub const DEMO_USER_IDS: [&str; 3] = [
    "a312b3ee-84c2-11eb-8dcd-0242ac130003",
    "3b04aacf-4320-48bb-8171-af512aae0894",
    "52408bc4-4cdf-49ef-ac54-364bfde3fbf0",
];

pub fn demo_users() -> Vec<UserDetails> {
    DEMO_USER_IDS
        .iter()
        .zip(1..)
        .map(|(id, n)| {
            UserDetails::new(
                *id,
                format!("Nickname{n}"),
                format!("nickname{n}@test.com"),
                format!("Test description {n}"),
            )
        })
        .collect()
}
