pub mod auth;
pub mod missions;
pub mod notifications;
pub mod payments;
pub mod pi_client;
pub mod price;
pub mod wallet;
