pub mod cron;
pub mod sentry;
pub mod services;
pub mod sqs;

pub use self::cron::CronFairing;
pub use self::sentry::SentryFairing;
pub use self::services::ServicesFairing;
pub use self::sqs::SqsFairing;
