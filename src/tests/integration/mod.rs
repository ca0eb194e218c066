//! End-to-end flows through the actix test service

mod hmac_admin;
mod login_flow;
mod password_reset;
mod signup_flow;
