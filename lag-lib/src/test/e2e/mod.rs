mod client;
mod runtime;

mod test_routes;
mod test_shutdown;
