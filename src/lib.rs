//! Password accounts with cookie sessions, plus the capture/classify loop and
//! emotion history behind the webcam dashboard.

pub mod app;
pub mod auth;
pub mod config;
pub mod detection;
pub mod emotion;
pub mod error;
pub mod state;
