pub mod activity;
pub mod admin;
pub mod announcements;
pub mod auth;
pub mod chat;
pub mod community;
pub mod error;
pub mod mail;
pub mod middleware;
pub mod oauth;
pub mod payments;
pub mod profile;
pub mod state;
pub mod uploads;
