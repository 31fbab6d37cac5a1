//! Job engine: the job store (C3), result store (C4), watchlist store
//! (C5), stocks catalogue, and job controller (C8) that bind them to the
//! worker pool (C7) and the orchestrator (C6).

pub mod catalogue;
pub mod controller;
pub mod error;
pub mod results;
pub mod store;
pub mod watchlist;

pub use catalogue::{CataloguePage, StockCatalogueStore};
pub use controller::{ControllerError, JobController};
pub use error::{JobStoreError, ResultStoreError, WatchlistStoreError};
pub use results::{HistoryPage, ResultStore};
pub use store::JobStore;
pub use watchlist::WatchlistStore;
