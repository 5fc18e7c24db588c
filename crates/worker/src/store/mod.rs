// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local mirror of remote entity state.

mod entity_store;
mod live;
mod reservation_index;

pub use entity_store::{Change, EntityStore};
pub use live::Live;
pub use reservation_index::ReservationIndex;
