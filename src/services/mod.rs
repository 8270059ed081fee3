pub mod activity_service;
pub mod alert_service;
pub mod mailer;
pub mod registration_service;
pub mod scheduling_service;
