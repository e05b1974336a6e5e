pub mod dashboard;
pub mod login;
pub mod setup;
pub mod unauthorized;

pub use dashboard::DashboardPage;
pub use login::LoginPage;
pub use setup::SetupPage;
pub use unauthorized::UnauthorizedPage;
