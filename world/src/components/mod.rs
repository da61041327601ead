mod ai_agent;
mod combat;
mod health;
mod network;
mod stats;
mod tag;
mod transform;

pub use ai_agent::AiAgent;
pub use combat::Combat;
pub use health::Health;
pub use network::NetworkBinding;
pub use stats::Stats;
pub use tag::{Tag, TagCategory};
pub use transform::Transform;
