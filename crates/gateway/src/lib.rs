//! HTTP gateway for the catalyst login service: request handlers, the task
//! registry for asynchronous attempts, and server startup.

pub mod routes;
pub mod server;
pub mod service;
pub mod state;
pub mod task_store;

pub use {
    server::{build_app, start_gateway},
    service::{LiveLoginService, LoginService, NoopLoginService},
    state::AppState,
    task_store::TaskStore,
};
