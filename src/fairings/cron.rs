use crate::config::Config;
use crate::services::Services;
use clokwerk::{Scheduler, TimeUnits};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{tokio, Orbit, Rocket};
use std::time::Duration;

/// Schedules the counter reconciliation sweep when an interval is configured.
#[derive(Clone)]
pub struct CronFairing;

impl CronFairing {
  pub fn fairing() -> impl Fairing {
    Self
  }

  fn init(&self, rocket: &Rocket<Orbit>) {
    let interval = match rocket
      .state::<Config>()
      .and_then(|config| config.reconcile_interval_minutes)
    {
      Some(interval) if interval > 0 => interval,
      _ => {
        tracing::info!("counter reconciliation disabled");
        return;
      }
    };

    let reconciler = match rocket.state::<Services>() {
      Some(services) => services.reconciler.clone(),
      None => return,
    };

    let shutdown = rocket.shutdown();

    tokio::spawn(async move {
      tokio::pin!(shutdown);
      let mut scheduler = Scheduler::new();

      scheduler.every(interval.minutes()).run(move || {
        let reconciler = reconciler.clone();

        tokio::spawn(async move {
          if let Err(error) = reconciler.sweep().await {
            tracing::error!(%error, "counter sweep failed");
            sentry::capture_error(&error);
          }
        });
      });

      loop {
        scheduler.run_pending();

        tokio::select! {
          _ = &mut shutdown => break,
          _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
      }
    });
  }
}

#[rocket::async_trait]
impl Fairing for CronFairing {
  fn info(&self) -> Info {
    Info {
      name: "cron",
      kind: Kind::Liftoff,
    }
  }

  async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
    self.init(rocket);
  }
}
