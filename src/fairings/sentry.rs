use crate::config::Config;
use rocket::fairing::{self, Fairing, Info, Kind};
use rocket::{Build, Rocket};
use sentry::ClientInitGuard;
use std::sync::Mutex;

pub struct SentryFairing {
  guard: Mutex<Option<ClientInitGuard>>,
}

impl SentryFairing {
  pub fn fairing() -> impl Fairing {
    Self {
      guard: Mutex::new(None),
    }
  }

  fn init(&self, dsn: &str, profile: &str) {
    let guard = sentry::init((
      dsn,
      sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: Some(profile.to_owned().into()),
        ..Default::default()
      },
    ));

    *self.guard.lock().unwrap_or_else(|e| e.into_inner()) = Some(guard);
  }
}

#[rocket::async_trait]
impl Fairing for SentryFairing {
  fn info(&self) -> Info {
    Info {
      name: "sentry",
      kind: Kind::Ignite,
    }
  }

  async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
    let dsn = rocket
      .state::<Config>()
      .and_then(|config| config.sentry_dsn.clone())
      .filter(|dsn| !dsn.is_empty());

    match dsn {
      Some(dsn) => {
        self.init(&dsn, &rocket.figment().profile().to_string());
        tracing::info!("sentry enabled");
      }
      None => tracing::info!("no sentry dsn configured"),
    }

    Ok(rocket)
  }
}
