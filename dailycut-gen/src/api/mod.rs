//! HTTP API for dailycut-gen

pub mod albums;
pub mod events;
pub mod generate;
pub mod health;
pub mod songs;

pub use albums::album_routes;
pub use events::event_stream;
pub use generate::generate_routes;
pub use health::health_routes;
pub use songs::song_routes;
