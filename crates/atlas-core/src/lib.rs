//! # atlas-core
//!
//! Reads world state out of a running Diablo II: Resurrected process.
//!
//! This crate provides:
//! - Windows process memory reading behind the [`ReadMemory`] trait
//! - Versioned structure layouts and layout-driven record decoding
//! - A bounded walk of the room graph and the unit hash tables
//! - Collision grids and points of interest per area
//! - A publisher that hands out immutable, fully composed snapshots

pub mod area;
pub mod config;
pub mod decode;
pub mod error;
pub mod export;
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod fixture;
pub mod filter;
pub mod geometry;
pub mod layout;
pub mod memory;
pub mod shutdown;
pub mod snapshot;
pub mod unit;
pub mod world;

pub use area::{AreaComposer, AreaData, CollisionGrid, PoiKind, PoiRules, PointOfInterest};
pub use config::Config;
pub use error::{Error, Result};
pub use export::{ApiResponse, CodeNames, NameResolver, ResponseBuilder};
pub use filter::{FilterKey, ItemFilter, LootFilters};
pub use geometry::{Point, Rect};
pub use layout::{LayoutRegistry, LayoutSet, StructLayout};
pub use memory::{
    Address, ContextSource, MemoryReader, ProcessContext, ProcessInfo, ProcessSelector,
    ProcessSource, ReadMemory,
};
pub use shutdown::ShutdownSignal;
pub use snapshot::{Coverage, GameDataSnapshot, PublisherConfig, SnapshotPublisher};
pub use unit::{EntityReader, UnitCollection, UnitKind, UnitRecord};
pub use world::{AreaId, RoomWalker, WalkLimits, WorldArena};
