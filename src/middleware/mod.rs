pub mod auth_gate;
pub mod role_gate;

pub use auth_gate::AuthGate;
pub use role_gate::RoleGate;
