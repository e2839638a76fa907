//! Tambola core - ticket marking and shared game lobbies
//!
//! The mark editor toggles overlays on a ticket image and keeps them in
//! device-local storage. The lobby coordinator creates or joins a shared game
//! record and follows its roster through a document store subscription. The
//! two are independent and meet only in [`Session`].

pub mod config;
pub mod document;
pub mod error;
pub mod lobby;
pub mod marks;
pub mod session;
pub mod storage;
pub mod types;

pub use config::{StoreBackend, StoreConfig, TambolaConfig};
pub use document::{Document, DocumentStore, StoreHandle, Subscription};
pub use error::{Result, TambolaError};
pub use lobby::{GameCode, LobbyCoordinator, LobbyPhase, LobbyView, PlayerName};
pub use marks::{MarkEditor, Surface, SvgSurface, TicketImage, Toggle, MARK_RADIUS};
pub use session::Session;
pub use types::{Game, Mark};
