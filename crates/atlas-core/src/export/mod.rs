//! Outward-facing views of a snapshot.

mod names;
mod response;

pub use names::{CodeNames, NameResolver};
pub use response::{
    ApiResponse, ItemEntry, MonsterEntry, ObjectEntry, PoiEntry, ResponseBuilder,
};
