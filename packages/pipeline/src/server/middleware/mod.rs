mod bearer_auth;

pub use bearer_auth::bearer_auth_middleware;
