// Messaging - Lock-free command and notification channels

pub mod channels;
pub mod command;
pub mod notification;
