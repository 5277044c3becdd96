//! Business logic layer
//!
//! Catalog, collection state, the filter engine and the [`Session`] that
//! ties them together for one application run.

pub mod card;
pub mod catalog;
pub mod collection;
pub mod filter;
pub mod links;
pub mod progress;
pub mod session;

pub use card::{CardRecord, CardType, FlagName, Series};
#[cfg(feature = "http")]
pub use catalog::HttpJsonSource;
pub use catalog::{Catalog, CatalogSource, DocumentSource, JsonFileSource, JsonStrSource};
pub use collection::{Collection, CollectionSnapshot, CollectionState};
pub use filter::{apply, FilterCriteria, FilteredView, OwnershipFilter, Page, Pager, PrefectureGroup, SortMode};
pub use links::CardLinks;
pub use progress::{prefecture_progress, PrefectureProgress, Progress};
pub use session::Session;
