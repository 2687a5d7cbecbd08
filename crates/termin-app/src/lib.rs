// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod controller;
pub mod edit;
pub mod gateway;
pub mod ids;
pub mod model;
pub mod pager;
pub mod query;
pub mod render;
pub mod state;
pub mod validation;

pub use controller::*;
pub use edit::*;
pub use gateway::*;
pub use ids::*;
pub use model::*;
pub use pager::*;
pub use query::*;
pub use render::*;
pub use state::*;
pub use validation::*;
