pub mod requests;
pub mod tax;
pub mod users;
