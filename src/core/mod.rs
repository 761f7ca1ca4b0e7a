pub mod auth;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod gate;
pub mod keyring;
pub mod message;
pub mod session;
