pub mod activity;
pub mod components;
pub mod panel;
pub mod reminders;
pub mod repository;
pub mod view_model;

pub use panel::DashboardPage;
