pub mod acl;
pub mod auth;
pub mod client_ip;
