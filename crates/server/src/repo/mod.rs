pub mod goal;
pub mod goal_notification;
pub mod user;
