//! Local-first storage for a scoreboard: players, categories and sessions with
//! nested games and point updates, kept in durable tables, mirrored in memory,
//! and observable through path-addressed subscriptions.

mod backup;
mod config;
mod error;
mod model;
mod ops;
mod path;
mod seed;
mod state;
mod stats;
mod storage;
mod subscription;
mod table;
mod timestamp;

pub use backup::{CategoryDoc, FullBackup, GameDoc, PlayerDoc, PointUpdateDoc, SessionDoc};
pub use config::{StoreConfig, DATABASE_ENV, DEFAULT_DATABASE_PATH, SEED_ENV};
pub use error::{EntityKind, Error, Result};
pub use model::{
    Category, CategoryPatch, Game, NewCategory, NewGame, NewPlayer, NewRecord, Player, PlayerPatch,
    PointUpdate, RecordPatch, Scores, Session, SessionGame, SessionPatch, SessionPlayer,
};
pub use ops::Store;
pub use path::Path;
pub use state::{CacheState, Snapshot};
pub use stats::{Standing, TimelinePoint, TIMELINE_START};
#[cfg(feature = "sqlite")]
pub use storage::SqliteStorage;
pub use storage::{MemoryStorage, Record, Storage, Table};
pub use subscription::{
    Callback, Direction, FieldValue, OrderBy, Sortable, SubscribeOptions, Subscription,
    SubscriptionId, SubscriptionRegistry,
};
pub use table::{TableRecord, TableStore};
pub use timestamp::Timestamp;
