pub const fn project_name() -> &'static str {
    "lag"
}

/// Value of the `Server` header of all responses.
pub const fn server_identifier() -> &'static str {
    concat!("lag/", env!("CARGO_PKG_VERSION"))
}
