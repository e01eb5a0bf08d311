pub mod extractor;
pub mod i18n;
pub mod jwt;
pub mod mailer;
pub mod pagination;
pub mod password;
pub mod realtime;
pub mod state;
pub mod tokens;
pub mod uploads;
pub mod validation;

pub mod test_utils;
