pub mod health;
pub mod invocation;
pub mod message;
pub mod notification;
pub mod outcome;
pub mod sendgrid;
