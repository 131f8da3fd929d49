//! `tms-spatial` — site grid, obstacle state, and routing.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                    |
//! |------------|-------------------------------------------------------------|
//! | [`grid`]   | `Grid` — bounds, obstacles, adjacency, obstacle version     |
//! | [`router`] | `Router` trait, `Route`, `AStarRouter`                      |
//! | [`cache`]  | `CachingRouter` — route cache keyed on the obstacle version |
//! | [`error`]  | `SpatialError`, `SpatialResult<T>`                          |
//!
//! # Reading obstacle state
//!
//! Routers take `&Grid` on every call and never keep their own copy of the
//! obstacle layout.  A caller that holds the grid behind a lock keeps the
//! read guard for the whole `route` call, so one search always sees one
//! consistent layout.

pub mod cache;
pub mod error;
pub mod grid;
pub mod router;


pub use cache::CachingRouter;
pub use error::{SpatialError, SpatialResult};
pub use grid::Grid;
pub use router::{AStarRouter, Route, Router};
