pub mod sendgrid;
pub mod service_bus;
