pub mod auth;
pub mod completion;
pub mod config;
pub mod db;
pub mod error_convert;
pub mod health;
pub mod mailer;
pub mod openapi;
pub mod rate_limit;
pub mod recurrence;
pub mod repo;
pub mod rest;
pub mod telemetry;
