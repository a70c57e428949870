use crate::config::Config;
use crate::db::DbConn;
use crate::services::{Backends, Services};
use rocket::fairing::{self, Fairing, Info, Kind};
use rocket::{Build, Rocket};
use std::sync::Arc;

/// Builds the `Services` bundle once the config and pool fairings have run.
pub struct ServicesFairing;

impl ServicesFairing {
  pub fn fairing() -> impl Fairing {
    Self
  }

  async fn init(rocket: &Rocket<Build>) -> anyhow::Result<Services> {
    let config = rocket
      .state::<Config>()
      .ok_or_else(|| anyhow::anyhow!("config is not managed"))?
      .clone();

    let db_conn = DbConn::get_one(rocket)
      .await
      .ok_or_else(|| anyhow::anyhow!("failed to get db connection"))?;

    let profile = rocket.figment().profile().to_string();
    let backends = Backends::aws(&config, &profile, Arc::new(db_conn))?;

    Ok(Services::new(&config, backends))
  }
}

#[rocket::async_trait]
impl Fairing for ServicesFairing {
  fn info(&self) -> Info {
    Info {
      name: "services",
      kind: Kind::Ignite,
    }
  }

  async fn on_ignite(&self, rocket: Rocket<Build>) -> fairing::Result {
    match Self::init(&rocket).await {
      Ok(services) => Ok(rocket.manage(services)),
      Err(error) => {
        tracing::error!(%error, "failed to build services");
        Err(rocket)
      }
    }
  }
}
