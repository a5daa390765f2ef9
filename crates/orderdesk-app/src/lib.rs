// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod bulk;
pub mod clock;
pub mod dispatch;
pub mod feedback;
pub mod ids;
pub mod model;
pub mod page;
pub mod resolver;
pub mod sections;
pub mod session;
pub mod timers;
pub mod transport;
pub mod watcher;

pub use bulk::*;
pub use clock::*;
pub use dispatch::*;
pub use feedback::*;
pub use ids::*;
pub use model::*;
pub use page::*;
pub use resolver::*;
pub use sections::*;
pub use session::*;
pub use timers::*;
pub use transport::*;
pub use watcher::*;
