pub mod handlers;
pub mod params;
pub mod pipeline;
pub mod response;
pub mod routes;

pub use pipeline::LagService;
