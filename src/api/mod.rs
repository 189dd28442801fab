// HTTP routes and handlers

pub mod admin;
pub mod admin_forms;
pub mod attendance;
pub mod auth;
pub mod classes;
pub mod equipment;
pub mod feedback;
pub mod flash;
pub mod health;
pub mod membership;
pub mod notifications;
pub mod progress;
pub mod routes;
pub mod trainers;
pub mod training;
