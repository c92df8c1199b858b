pub mod code;
pub mod health;
pub mod media;
pub mod notifications;
pub mod supervisors;
pub mod tasks;
