//! User repository: a spreadsheet-backed user table with an in-memory cache.
//!
//! Reads are served from the cache only. Writes update the cache immediately and are queued for a
//! single background worker that applies them to the sheet in order. A periodic reload pulls edits
//! made directly in the sheet, but never while queued writes are still in flight.

pub mod google;
pub mod sheet;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

pub use google::GoogleSheet;
pub use sheet::{CellUpdate, MemorySheet, SheetError, UserSheet};

use sheet::{cell_updates_for, user_from_row, user_to_row, FIRST_DATA_ROW};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDTO {
    pub id: i64,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserDTO {
    pub fn new(id: i64, nickname: Option<String>) -> Self {
        Self {
            id,
            nickname,
            phone: None,
            first_name: None,
            last_name: None,
        }
    }

    /// Registration is complete once a phone number is on file.
    pub fn is_registered(&self) -> bool {
        self.phone.is_some()
    }

    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        match (&self.nickname, full.is_empty()) {
            (Some(nick), true) => format!("@{nick}"),
            (Some(nick), false) => format!("{full} (@{nick})"),
            (None, false) => full,
            (None, true) => format!("user {}", self.id),
        }
    }
}

enum SheetOp {
    Append(UserDTO),
    Update(UserDTO),
    Remove(i64),
    Reload,
    Barrier(oneshot::Sender<()>),
}

type UserCache = Arc<RwLock<HashMap<i64, UserDTO>>>;

#[derive(Clone)]
pub struct UserRepository {
    cache: UserCache,
    /// Writes queued but not yet applied to the sheet.
    pending: Arc<AtomicUsize>,
    ops: mpsc::UnboundedSender<SheetOp>,
}

impl UserRepository {
    /// Reads the whole sheet into the cache and starts the write worker.
    pub async fn load(sheet: Arc<dyn UserSheet>) -> Result<Self, SheetError> {
        let rows = sheet.read_rows().await?;
        let (users, row_ids) = parse_rows(&rows);
        tracing::info!("SHEETS: loaded {} users", users.len());

        let cache: UserCache = Arc::new(RwLock::new(users));
        let pending = Arc::new(AtomicUsize::new(0));
        let (ops, receiver) = mpsc::unbounded_channel();

        let worker = SheetWorker {
            sheet,
            rows: row_ids,
            cache: Arc::clone(&cache),
            pending: Arc::clone(&pending),
        };
        tokio::spawn(worker.run(receiver));

        Ok(Self {
            cache,
            pending,
            ops,
        })
    }

    pub async fn get_user(&self, id: i64) -> Option<UserDTO> {
        self.cache.read().await.get(&id).cloned()
    }

    /// All cached users, ordered by id.
    pub async fn get_users(&self) -> Vec<UserDTO> {
        let mut users: Vec<UserDTO> = self.cache.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        users
    }

    /// Returns `false` if a user with this id already exists.
    pub async fn add_user(&self, user: UserDTO) -> bool {
        let mut cache = self.cache.write().await;
        if cache.contains_key(&user.id) {
            return false;
        }
        cache.insert(user.id, user.clone());
        self.enqueue_write(SheetOp::Append(user));
        true
    }

    /// Returns `false` if the user does not exist.
    pub async fn update_user(&self, user: UserDTO) -> bool {
        let mut cache = self.cache.write().await;
        match cache.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                self.enqueue_write(SheetOp::Update(user));
                true
            }
            None => false,
        }
    }

    /// Returns `false` if the user does not exist.
    pub async fn remove_user(&self, id: i64) -> bool {
        let mut cache = self.cache.write().await;
        if cache.remove(&id).is_none() {
            return false;
        }
        self.enqueue_write(SheetOp::Remove(id));
        true
    }

    /// Cached user, or a fresh unregistered one added on first contact.
    pub async fn get_or_create(&self, id: i64, nickname: Option<String>) -> UserDTO {
        if let Some(user) = self.get_user(id).await {
            return user;
        }
        let user = UserDTO::new(id, nickname);
        // A concurrent first contact may have won the race; either way the row exists now.
        self.add_user(user.clone()).await;
        self.get_user(id).await.unwrap_or(user)
    }

    /// Queues a full reload from the sheet.
    pub fn refresh(&self) {
        if self.ops.send(SheetOp::Reload).is_err() {
            tracing::error!("SHEETS: write worker stopped, reload dropped");
        }
    }

    /// Waits until every write queued before this call has been applied.
    pub async fn sync(&self) {
        let (done, wait) = oneshot::channel();
        if self.ops.send(SheetOp::Barrier(done)).is_err() {
            tracing::error!("SHEETS: write worker stopped, nothing to sync");
            return;
        }
        let _ = wait.await;
    }

    pub fn pending_writes(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn spawn_periodic_refresh(&self, every: Duration) -> JoinHandle<()> {
        let repo = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately and the cache is already fresh.
            interval.tick().await;
            loop {
                interval.tick().await;
                tracing::debug!("SHEETS: periodic reload");
                repo.refresh();
            }
        })
    }

    // Called with the cache write lock held, so a reload never sees the cache ahead of `pending`.
    fn enqueue_write(&self, op: SheetOp) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.ops.send(op).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::error!("SHEETS: write worker stopped, change kept in cache only");
        }
    }
}

fn parse_rows(rows: &[Vec<String>]) -> (HashMap<i64, UserDTO>, Vec<Option<i64>>) {
    let mut users = HashMap::new();
    let mut row_ids = Vec::with_capacity(rows.len());
    for row in rows {
        let user = user_from_row(row);
        row_ids.push(user.as_ref().map(|u| u.id));
        if let Some(user) = user {
            users.insert(user.id, user);
        }
    }
    (users, row_ids)
}

struct SheetWorker {
    sheet: Arc<dyn UserSheet>,
    /// User id per data row, top to bottom; `None` for rows that are not users.
    rows: Vec<Option<i64>>,
    cache: UserCache,
    pending: Arc<AtomicUsize>,
}

impl SheetWorker {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<SheetOp>) {
        while let Some(op) = receiver.recv().await {
            match op {
                SheetOp::Append(user) => {
                    self.append(user).await;
                    self.pending.fetch_sub(1, Ordering::SeqCst);
                }
                SheetOp::Update(user) => {
                    self.update(user).await;
                    self.pending.fetch_sub(1, Ordering::SeqCst);
                }
                SheetOp::Remove(id) => {
                    self.remove(id).await;
                    self.pending.fetch_sub(1, Ordering::SeqCst);
                }
                SheetOp::Reload => self.reload().await,
                SheetOp::Barrier(done) => {
                    let _ = done.send(());
                }
            }
        }
        tracing::info!("SHEETS: write worker stopped");
    }

    fn row_number(&self, id: i64) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| *row == Some(id))
            .map(|index| index + FIRST_DATA_ROW)
    }

    async fn append(&mut self, user: UserDTO) {
        let id = user.id;
        match self.sheet.append_row(user_to_row(&user)).await {
            Ok(()) => {
                self.rows.push(Some(id));
                tracing::debug!("SHEETS: appended user {}", id);
            }
            Err(e) => tracing::error!("SHEETS: append of user {} failed: {}", id, e),
        }
    }

    async fn update(&mut self, user: UserDTO) {
        let Some(row_number) = self.row_number(user.id) else {
            tracing::warn!("SHEETS: user {} has no row, appending instead", user.id);
            return self.append(user).await;
        };
        if let Err(e) = self
            .sheet
            .update_cells(cell_updates_for(&user, row_number))
            .await
        {
            tracing::error!("SHEETS: update of user {} failed: {}", user.id, e);
        }
    }

    async fn remove(&mut self, id: i64) {
        let Some(row_number) = self.row_number(id) else {
            tracing::warn!("SHEETS: user {} has no row to delete", id);
            return;
        };
        match self.sheet.delete_row(row_number).await {
            Ok(()) => {
                self.rows.remove(row_number - FIRST_DATA_ROW);
            }
            Err(e) => tracing::error!("SHEETS: delete of user {} failed: {}", id, e),
        }
    }

    async fn reload(&mut self) {
        let rows = match self.sheet.read_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("SHEETS: reload failed: {}", e);
                return;
            }
        };
        let (users, row_ids) = parse_rows(&rows);
        // Every earlier write has reached the sheet, so the row map is accurate either way.
        self.rows = row_ids;

        let mut cache = self.cache.write().await;
        if self.pending.load(Ordering::SeqCst) > 0 {
            tracing::debug!("SHEETS: writes pending, cache kept");
            return;
        }
        tracing::debug!("SHEETS: reloaded {} users", users.len());
        *cache = users;
    }
}
