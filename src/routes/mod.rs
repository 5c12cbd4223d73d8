mod audits;
mod auth;
mod companies;
mod demo_requests;
mod health_check;
mod stores;
mod uploads;

pub use audits::*;
pub use auth::*;
pub use companies::*;
pub use demo_requests::*;
pub use health_check::*;
pub use stores::*;
